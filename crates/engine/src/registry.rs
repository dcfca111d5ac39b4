//! The Registry facade
//!
//! One object owning the storage engine handle and the three coordinators.
//! Pessimistic operations (sequencing, stage transitions) and the
//! lock-taking part of the metadata path go through the retry controller;
//! terminal errors and conflicts pass through untouched.

use crate::config::RegistryConfig;
use rand::rngs::StdRng;
use rand::SeedableRng;
use registrar_concurrency::{with_retry, MetadataStore, StageCoordinator, VersionSequencer};
use registrar_core::{
    record, EntityId, EntityRecord, Error, IsolationLevel, MetadataRecord, ResourceId, Result,
    Stage, StageSlotRecord, StorageEngine, Transaction, VersionRecord,
};
use registrar_storage::MemoryEngine;
use std::sync::Arc;

/// Concurrency-control core of the model registry
///
/// Safe to share and call from any number of threads; all coordination
/// happens through the storage engine's transactions, so several
/// registries (or processes) over one engine behave like one.
pub struct Registry {
    engine: Arc<dyn StorageEngine>,
    sequencer: VersionSequencer,
    coordinator: StageCoordinator,
    metadata: MetadataStore,
    config: RegistryConfig,
}

impl Registry {
    /// Create a registry over an engine with default configuration
    pub fn new(engine: Arc<dyn StorageEngine>) -> Self {
        Self::with_config(engine, RegistryConfig::default())
    }

    /// Create a registry over an engine with explicit configuration
    pub fn with_config(engine: Arc<dyn StorageEngine>, config: RegistryConfig) -> Self {
        Self {
            sequencer: VersionSequencer::new(Arc::clone(&engine)),
            coordinator: StageCoordinator::new(Arc::clone(&engine)),
            metadata: MetadataStore::new(Arc::clone(&engine)),
            engine,
            config,
        }
    }

    /// Create a registry over a fresh in-memory engine
    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemoryEngine::new()))
    }

    fn run_with_retry<T>(&self, op: impl FnMut() -> Result<T>) -> Result<T> {
        match self.config.rng_seed {
            Some(seed) => with_retry(&self.config.retry, &mut StdRng::seed_from_u64(seed), op),
            None => with_retry(&self.config.retry, &mut rand::thread_rng(), op),
        }
    }

    // === Registration ===

    /// Register a new entity with a generated id
    pub fn register_entity(&self) -> Result<EntityId> {
        self.register_entity_with_id(EntityId::new())
    }

    /// Register a new entity under a caller-chosen id
    ///
    /// Creates the version-counter row and an empty slot row for each
    /// singleton stage, so later promotions always have a row to lock.
    ///
    /// # Errors
    /// `Error::Validation` if the entity already exists.
    pub fn register_entity_with_id(&self, entity_id: EntityId) -> Result<EntityId> {
        let mut txn = self.engine.begin(IsolationLevel::RepeatableRead)?;
        let counter_id = ResourceId::Entity(entity_id);
        if record::read::<EntityRecord>(txn.as_mut(), &counter_id)?.is_some() {
            return Err(Error::Validation(format!(
                "entity {entity_id} is already registered"
            )));
        }
        record::insert(txn.as_mut(), counter_id, &EntityRecord::new(entity_id))?;
        record::insert(
            txn.as_mut(),
            ResourceId::StageSlot(entity_id, Stage::Production),
            &StageSlotRecord::empty(),
        )?;
        txn.commit()?;

        tracing::debug!(entity_id = %entity_id, "entity registered");
        Ok(entity_id)
    }

    // === Write operations ===

    /// Allocate the next version number for an entity
    pub fn next_version(&self, entity_id: EntityId) -> Result<u64> {
        self.run_with_retry(|| self.sequencer.next_version(entity_id))
    }

    /// Promote a version into a singleton stage
    ///
    /// Archives the displaced holder, if any, in the same transaction.
    pub fn promote(&self, entity_id: EntityId, version_number: u64, target: Stage) -> Result<()> {
        self.run_with_retry(|| self.coordinator.promote(entity_id, version_number, target))
    }

    /// Archive a version, vacating its singleton slot if it holds one
    ///
    /// This is the demote primitive; installing a replacement holder is a
    /// separate `promote` call.
    pub fn archive(&self, entity_id: EntityId, version_number: u64) -> Result<()> {
        self.run_with_retry(|| self.coordinator.archive(entity_id, version_number))
    }

    /// Create the metadata record for a version at revision 0
    pub fn init_metadata(
        &self,
        entity_id: EntityId,
        version_number: u64,
        payload: Vec<u8>,
    ) -> Result<u64> {
        self.metadata.init(entity_id, version_number, payload)
    }

    /// Conditionally replace a version's metadata payload
    ///
    /// Returns the new revision on success; `Error::Conflict` (with the
    /// current revision) means someone else wrote first: re-read and
    /// resubmit. Conflicts are never retried automatically.
    pub fn update_metadata(
        &self,
        entity_id: EntityId,
        version_number: u64,
        expected_revision: u64,
        payload: Vec<u8>,
    ) -> Result<u64> {
        self.run_with_retry(|| {
            self.metadata
                .update(entity_id, version_number, expected_revision, payload.clone())
        })
    }

    // === Read operations ===

    /// Read a version row
    pub fn get_version(&self, entity_id: EntityId, version_number: u64) -> Result<VersionRecord> {
        let mut txn = self.engine.begin(IsolationLevel::ReadCommitted)?;
        let version = record::read_required(
            txn.as_mut(),
            &ResourceId::Version(entity_id, version_number),
        )?;
        txn.commit()?;
        Ok(version)
    }

    /// Version currently holding a singleton stage, if any
    ///
    /// # Errors
    /// - `Error::Validation` if `stage` is not a singleton stage
    /// - `Error::NotFound` if the entity was never registered
    pub fn stage_holder(&self, entity_id: EntityId, stage: Stage) -> Result<Option<u64>> {
        if !stage.is_singleton() {
            return Err(Error::Validation(format!(
                "stage {stage} has no holder slot"
            )));
        }
        let mut txn = self.engine.begin(IsolationLevel::ReadCommitted)?;
        let slot: StageSlotRecord =
            record::read_required(txn.as_mut(), &ResourceId::StageSlot(entity_id, stage))?;
        txn.commit()?;
        Ok(slot.holder)
    }

    /// Read a version's metadata record
    pub fn read_metadata(
        &self,
        entity_id: EntityId,
        version_number: u64,
    ) -> Result<MetadataRecord> {
        self.metadata.read(entity_id, version_number)
    }
}
