//! Core types and traits for Registrar
//!
//! This crate defines the foundational types used throughout the system:
//! - EntityId: Unique identifier for versioned entities
//! - Stage: Lifecycle stage of a version (registered/staging/production/archived)
//! - ResourceId: Lockable row identifier with the global lock ordering
//! - Records: serialized row payloads (entity counter, version, stage slot, metadata)
//! - Error: Error type hierarchy with transient classification
//! - Traits: storage engine boundary (StorageEngine, Transaction)

#![warn(missing_docs)]
#![warn(clippy::all)]

// Module declarations
pub mod error;
pub mod record;
pub mod traits;
pub mod types;

// Re-export commonly used types and traits
pub use error::{Error, Result};
pub use record::{EntityRecord, MetadataRecord, StageSlotRecord, VersionRecord};
pub use traits::{IsolationLevel, StorageEngine, Transaction};
pub use types::{EntityId, ResourceId, Stage};
