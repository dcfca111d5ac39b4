//! Registrar - concurrency-control core for a versioned model registry
//!
//! Registrar keeps shared, versioned registry state correct when multiple
//! callers mutate it at the same time:
//! - unique, monotonically increasing version numbers per entity
//! - at most one holder of a singleton stage (e.g., one production
//!   version per model), with racing promotions serialized on a slot lock
//! - optimistic compare-and-swap metadata edits that never lose a write
//!   silently
//!
//! # Quick Start
//!
//! ```
//! use registrar::{Registry, Stage};
//!
//! let registry = Registry::in_memory();
//! let model = registry.register_entity().unwrap();
//!
//! let v1 = registry.next_version(model).unwrap();
//! registry.promote(model, v1, Stage::Staging).unwrap();
//! registry.promote(model, v1, Stage::Production).unwrap();
//!
//! assert_eq!(registry.stage_holder(model, Stage::Production).unwrap(), Some(v1));
//! ```
//!
//! # Architecture
//!
//! The [`Registry`] facade wires the concurrency components (version
//! sequencer, stage coordinator, optimistic metadata store) to a storage
//! engine behind the [`StorageEngine`] trait. Any backend that provides
//! transactions, exclusive row locks, and an atomic conditional update
//! can sit below; `MemoryEngine` is the bundled reference.

// Re-export the public API
pub use registrar_concurrency::{lock_all, order_resources, with_retry, RetryPolicy};
pub use registrar_core::{
    EntityId, EntityRecord, Error, IsolationLevel, MetadataRecord, ResourceId, Result, Stage,
    StageSlotRecord, StorageEngine, Transaction, VersionRecord,
};
pub use registrar_engine::{Registry, RegistryConfig};
pub use registrar_storage::{EngineConfig, MemoryEngine};
