//! Optimistic metadata store
//!
//! Metadata edits are low-contention, so no lock is held across the
//! caller's read-then-decide window. The only atomic step is a single
//! conditional update gated on the stored revision matching the caller's
//! `expected_revision`. A loser always gets a `Conflict` carrying the
//! revision it lost to, never a silent overwrite; the inverse of the
//! stage coordinator's last-committer-wins.

use chrono::Utc;
use registrar_core::{
    record, EntityId, Error, IsolationLevel, MetadataRecord, ResourceId, Result, StorageEngine,
    Transaction, VersionRecord,
};
use std::sync::Arc;

/// Compare-and-swap metadata updates against a storage engine
#[derive(Clone)]
pub struct MetadataStore {
    engine: Arc<dyn StorageEngine>,
}

impl MetadataStore {
    /// Create a metadata store backed by `engine`
    pub fn new(engine: Arc<dyn StorageEngine>) -> Self {
        Self { engine }
    }

    /// Lazily create the metadata record for a version, at revision 0
    ///
    /// # Errors
    /// - `Error::NotFound` if the version does not exist
    /// - `Error::Conflict` if metadata was already created; carries the
    ///   current revision so the caller can continue with `update`
    pub fn init(&self, entity_id: EntityId, version_number: u64, payload: Vec<u8>) -> Result<u64> {
        let mut txn = self.engine.begin(IsolationLevel::ReadCommitted)?;
        let version_id = ResourceId::Version(entity_id, version_number);
        if record::read::<VersionRecord>(txn.as_mut(), &version_id)?.is_none() {
            return Err(Error::NotFound {
                resource: version_id,
            });
        }

        let metadata_id = ResourceId::Metadata(entity_id, version_number);
        if let Some(existing) = record::read::<MetadataRecord>(txn.as_mut(), &metadata_id)? {
            return Err(Error::Conflict {
                current_revision: existing.revision,
            });
        }
        record::insert(
            txn.as_mut(),
            metadata_id,
            &MetadataRecord::initial(entity_id, version_number, payload),
        )?;
        txn.commit()?;

        tracing::debug!(entity_id = %entity_id, version = version_number, "metadata created");
        Ok(0)
    }

    /// Conditionally replace the payload, expecting a specific revision
    ///
    /// Accepted only if the stored revision still equals
    /// `expected_revision` at commit time; the new revision is exactly one
    /// higher. Of two racers presenting the same expectation, exactly one
    /// succeeds and the other gets `Conflict` with the revision that beat
    /// it. Re-read, recompute, resubmit is the caller's job.
    ///
    /// # Errors
    /// - `Error::NotFound` if the record was never created; retrying
    ///   cannot resurrect it, so it is not reported as a conflict
    /// - `Error::Conflict { current_revision }` if the revision moved
    pub fn update(
        &self,
        entity_id: EntityId,
        version_number: u64,
        expected_revision: u64,
        payload: Vec<u8>,
    ) -> Result<u64> {
        let mut txn = self.engine.begin(IsolationLevel::ReadCommitted)?;
        let metadata_id = ResourceId::Metadata(entity_id, version_number);

        let next_revision = expected_revision + 1;
        let next = MetadataRecord {
            entity_id,
            version_number,
            payload,
            revision: next_revision,
            updated_at: Utc::now(),
        };
        let bytes = record::encode(&next)?;

        let affected = txn.conditional_update(
            &metadata_id,
            &|current| {
                record::decode::<MetadataRecord>(current)
                    .map(|m| m.revision == expected_revision)
                    .unwrap_or(false)
            },
            bytes,
        )?;

        if affected == 1 {
            txn.commit()?;
            tracing::debug!(
                entity_id = %entity_id,
                version = version_number,
                revision = next_revision,
                "metadata updated"
            );
            return Ok(next_revision);
        }

        // Zero rows matched. The conditional update left us holding the
        // row lock, so this read is the revision the caller lost to.
        match record::read::<MetadataRecord>(txn.as_mut(), &metadata_id)? {
            None => Err(Error::NotFound {
                resource: metadata_id,
            }),
            Some(current) => Err(Error::Conflict {
                current_revision: current.revision,
            }),
        }
    }

    /// Read the current metadata record
    ///
    /// # Errors
    /// `Error::NotFound` if no metadata has been created for the version.
    pub fn read(&self, entity_id: EntityId, version_number: u64) -> Result<MetadataRecord> {
        let mut txn = self.engine.begin(IsolationLevel::ReadCommitted)?;
        let metadata = record::read_required(
            txn.as_mut(),
            &ResourceId::Metadata(entity_id, version_number),
        )?;
        txn.commit()?;
        Ok(metadata)
    }
}
