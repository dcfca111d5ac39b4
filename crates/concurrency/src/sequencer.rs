//! Version sequencer
//!
//! Hands out unique, strictly increasing, gap-free version numbers per
//! entity. The counter read and the version insert happen inside one
//! transaction under the entity's exclusive counter lock, so an aborted
//! transaction never consumes a number and two committers can never share
//! one. Entities lock independently; sequencing one entity never blocks
//! another.

use crate::ordering;
use registrar_core::{
    record, EntityId, EntityRecord, IsolationLevel, ResourceId, Result, StorageEngine, Transaction,
    VersionRecord,
};
use std::sync::Arc;

/// Allocates version numbers against a storage engine
#[derive(Clone)]
pub struct VersionSequencer {
    engine: Arc<dyn StorageEngine>,
}

impl VersionSequencer {
    /// Create a sequencer backed by `engine`
    pub fn new(engine: Arc<dyn StorageEngine>) -> Self {
        Self { engine }
    }

    /// Allocate the next version number for an entity
    ///
    /// Creates the version row in `Registered` and advances the entity's
    /// watermark in the same transaction.
    ///
    /// # Errors
    /// - `Error::NotFound` if the entity was never registered
    /// - `Error::LockTimeout` / `Error::DeadlockDetected` (transient) under
    ///   contention; callers wrap this in the retry controller
    pub fn next_version(&self, entity_id: EntityId) -> Result<u64> {
        let mut txn = self.engine.begin(IsolationLevel::RepeatableRead)?;
        let counter_id = ResourceId::Entity(entity_id);
        ordering::lock_all(txn.as_mut(), vec![counter_id])?;

        let mut entity: EntityRecord = record::read_required(txn.as_mut(), &counter_id)?;
        let number = entity.next_version_counter + 1;

        // The engine's uniqueness constraint on the version row backstops
        // this allocation; with the counter lock held it never fires.
        record::insert(
            txn.as_mut(),
            ResourceId::Version(entity_id, number),
            &VersionRecord::new(entity_id, number),
        )?;

        entity.next_version_counter = number;
        record::write(txn.as_mut(), counter_id, &entity)?;
        txn.commit()?;

        tracing::debug!(entity_id = %entity_id, version = number, "allocated version");
        Ok(number)
    }
}
