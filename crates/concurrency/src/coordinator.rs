//! Stage transition coordinator
//!
//! Enforces "at most one holder" for the singleton stages. All stage
//! writes happen inside one transaction; transitions touching a singleton
//! stage additionally hold that stage's slot lock, acquired in canonical
//! order, so racing promotions serialize on the slot and each correctly
//! archives the holder it observes. When two promotions race for the same
//! slot, whichever commits last is the final holder and neither caller
//! sees an error; that is the documented policy, not a conflict.
//!
//! Locking invariant: a version row's `stage` field is only ever written
//! by a transaction that holds that version row's lock, or that holds the
//! slot lock naming the version as holder. Slots sort before version rows
//! in the canonical order, so the two kinds of writer always meet on the
//! slot lock first.

use crate::ordering;
use registrar_core::{
    record, EntityId, Error, IsolationLevel, ResourceId, Result, Stage, StageSlotRecord,
    StorageEngine, Transaction, VersionRecord,
};
use std::sync::Arc;

/// Coordinates stage transitions against a storage engine
#[derive(Clone)]
pub struct StageCoordinator {
    engine: Arc<dyn StorageEngine>,
}

impl StageCoordinator {
    /// Create a coordinator backed by `engine`
    pub fn new(engine: Arc<dyn StorageEngine>) -> Self {
        Self { engine }
    }

    /// Promote a version to the next stage
    ///
    /// The only promotions are `Registered → Staging` and
    /// `Staging → Production`. Promoting into a singleton stage archives
    /// the displaced holder, if any, in the same transaction. Promoting a
    /// version already in `target` is an idempotent no-op that writes
    /// nothing.
    ///
    /// # Errors
    /// - `Error::NotFound` if the version row does not exist
    /// - `Error::InvalidTransition` for any edge the stage machine lacks
    /// - `Error::LockTimeout` / `Error::DeadlockDetected` (transient)
    pub fn promote(&self, entity_id: EntityId, version_number: u64, target: Stage) -> Result<()> {
        let mut txn = self.engine.begin(IsolationLevel::RepeatableRead)?;
        let version_id = ResourceId::Version(entity_id, version_number);

        let mut resources = vec![version_id];
        if target.is_singleton() {
            resources.push(ResourceId::StageSlot(entity_id, target));
        }
        ordering::lock_all(txn.as_mut(), resources)?;

        let mut version: VersionRecord = record::read_required(txn.as_mut(), &version_id)?;
        if version.stage == target {
            // Already there; commit the empty transaction so no other
            // row's revision or timestamp moves.
            txn.commit()?;
            return Ok(());
        }
        if !version.stage.can_promote_to(target) {
            return Err(Error::InvalidTransition {
                from: version.stage,
                to: target,
            });
        }
        let from = version.stage;

        if target.is_singleton() {
            let slot_id = ResourceId::StageSlot(entity_id, target);
            let slot: StageSlotRecord = record::read(txn.as_mut(), &slot_id)?.unwrap_or_default();
            if let Some(holder) = slot.holder {
                if holder != version_number {
                    self.archive_displaced(txn.as_mut(), entity_id, holder)?;
                }
            }
            record::write(
                txn.as_mut(),
                slot_id,
                &StageSlotRecord::held_by(version_number),
            )?;
        }

        version.stage = target;
        record::write(txn.as_mut(), version_id, &version)?;
        txn.commit()?;

        tracing::debug!(
            entity_id = %entity_id,
            version = version_number,
            from = %from,
            to = %target,
            "promoted version"
        );
        Ok(())
    }

    /// Archive a version, vacating its singleton slot if it holds one
    ///
    /// This is the demote primitive: `Production → Archived` and
    /// `Staging → Archived` are the only legal edges, and installing a
    /// replacement holder is a separate `promote` call.
    /// Archiving an already archived version is an idempotent no-op.
    ///
    /// # Errors
    /// - `Error::NotFound` if the version row does not exist
    /// - `Error::InvalidTransition` for a version still in `Registered`
    /// - `Error::LockTimeout` / `Error::DeadlockDetected` (transient)
    pub fn archive(&self, entity_id: EntityId, version_number: u64) -> Result<()> {
        let mut txn = self.engine.begin(IsolationLevel::RepeatableRead)?;
        let version_id = ResourceId::Version(entity_id, version_number);

        // The version's current stage is unknown until read, so lock the
        // production slot up front; vacating it may be required, and
        // taking it after the version row would break the canonical order.
        ordering::lock_all(
            txn.as_mut(),
            vec![
                version_id,
                ResourceId::StageSlot(entity_id, Stage::Production),
            ],
        )?;

        let mut version: VersionRecord = record::read_required(txn.as_mut(), &version_id)?;
        if version.stage == Stage::Archived {
            txn.commit()?;
            return Ok(());
        }
        if !version.stage.can_archive() {
            return Err(Error::InvalidTransition {
                from: version.stage,
                to: Stage::Archived,
            });
        }
        let from = version.stage;

        if from.is_singleton() {
            let slot_id = ResourceId::StageSlot(entity_id, from);
            let slot: StageSlotRecord = record::read(txn.as_mut(), &slot_id)?.unwrap_or_default();
            if slot.holder == Some(version_number) {
                record::write(txn.as_mut(), slot_id, &StageSlotRecord::empty())?;
            }
        }

        version.stage = Stage::Archived;
        record::write(txn.as_mut(), version_id, &version)?;
        txn.commit()?;

        tracing::debug!(
            entity_id = %entity_id,
            version = version_number,
            from = %from,
            "archived version"
        );
        Ok(())
    }

    /// Archive the version a slot points at, within the caller's transaction
    ///
    /// The caller holds the slot lock, which serializes every writer of the
    /// displaced holder's row; no separate version lock is needed.
    fn archive_displaced(
        &self,
        txn: &mut dyn Transaction,
        entity_id: EntityId,
        holder: u64,
    ) -> Result<()> {
        let holder_id = ResourceId::Version(entity_id, holder);
        let mut displaced: VersionRecord = record::read(txn, &holder_id)?.ok_or_else(|| {
            Error::Storage(format!("stage slot references missing version {holder_id}"))
        })?;
        displaced.stage = Stage::Archived;
        record::write(txn, holder_id, &displaced)?;
        tracing::debug!(
            entity_id = %entity_id,
            version = holder,
            "archived displaced holder"
        );
        Ok(())
    }
}
