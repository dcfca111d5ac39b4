//! Record types stored by the registry
//!
//! The storage engine traffics in opaque bytes; this module defines the
//! typed rows layered on top and the bincode codec between them. Each
//! record kind lives at the `ResourceId` of the same name.
//!
//! Ownership of mutation:
//! - `EntityRecord.next_version_counter` is written only by the version
//!   sequencer;
//! - `VersionRecord.stage` and `StageSlotRecord` are written only by the
//!   stage coordinator;
//! - `MetadataRecord` is written only through the optimistic metadata
//!   store's conditional update.

use crate::error::{Error, Result};
use crate::traits::Transaction;
use crate::types::{EntityId, ResourceId, Stage};
use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Deserialize, Serialize};

/// Per-entity version counter row
///
/// `next_version_counter` is the watermark: the highest version number ever
/// handed out for this entity. It only moves forward, and only inside a
/// transaction that holds the exclusive lock on `ResourceId::Entity`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRecord {
    /// The entity this counter belongs to
    pub entity_id: EntityId,
    /// Highest version number allocated so far (0 = none yet)
    pub next_version_counter: u64,
}

impl EntityRecord {
    /// Fresh counter row for a newly registered entity
    pub fn new(entity_id: EntityId) -> Self {
        Self {
            entity_id,
            next_version_counter: 0,
        }
    }
}

/// An immutable numbered artifact of an entity
///
/// Everything except `stage` is frozen at creation time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionRecord {
    /// Owning entity
    pub entity_id: EntityId,
    /// Unique per entity, strictly increasing, never reused
    pub version_number: u64,
    /// Current lifecycle stage
    pub stage: Stage,
    /// When the sequencer created this version
    pub created_at: DateTime<Utc>,
}

impl VersionRecord {
    /// A freshly sequenced version in `Registered`
    pub fn new(entity_id: EntityId, version_number: u64) -> Self {
        Self {
            entity_id,
            version_number,
            stage: Stage::Registered,
            created_at: Utc::now(),
        }
    }
}

/// Holder slot for a singleton stage
///
/// One row per `(entity, singleton stage)` pair. The row exists from entity
/// registration onward so that promote always has a row to lock, even when
/// no holder is installed yet.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageSlotRecord {
    /// Version currently holding the stage, if any
    pub holder: Option<u64>,
}

impl StageSlotRecord {
    /// An empty slot
    pub fn empty() -> Self {
        Self { holder: None }
    }

    /// A slot held by `version_number`
    pub fn held_by(version_number: u64) -> Self {
        Self {
            holder: Some(version_number),
        }
    }
}

/// Mutable metadata attached to a version
///
/// Created lazily on first write with `revision = 0`; every accepted
/// conditional update increments `revision` by exactly 1.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MetadataRecord {
    /// Owning entity
    pub entity_id: EntityId,
    /// Version this metadata belongs to
    pub version_number: u64,
    /// Opaque caller-owned payload
    pub payload: Vec<u8>,
    /// Monotonic write counter, compared at commit time
    pub revision: u64,
    /// Timestamp of the last accepted write
    pub updated_at: DateTime<Utc>,
}

impl MetadataRecord {
    /// Initial metadata record at revision 0
    pub fn initial(entity_id: EntityId, version_number: u64, payload: Vec<u8>) -> Self {
        Self {
            entity_id,
            version_number,
            payload,
            revision: 0,
            updated_at: Utc::now(),
        }
    }
}

/// Encode a record for storage
pub fn encode<T: Serialize>(record: &T) -> Result<Vec<u8>> {
    Ok(bincode::serialize(record)?)
}

/// Decode a record from storage bytes
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    Ok(bincode::deserialize(bytes)?)
}

/// Read and decode a record within a transaction
pub fn read<T: DeserializeOwned>(
    txn: &mut dyn Transaction,
    resource: &ResourceId,
) -> Result<Option<T>> {
    match txn.get(resource)? {
        Some(bytes) => Ok(Some(decode(&bytes)?)),
        None => Ok(None),
    }
}

/// Read a record that must exist
pub fn read_required<T: DeserializeOwned>(
    txn: &mut dyn Transaction,
    resource: &ResourceId,
) -> Result<T> {
    read(txn, resource)?.ok_or(Error::NotFound {
        resource: *resource,
    })
}

/// Encode and buffer a write within a transaction
pub fn write<T: Serialize>(
    txn: &mut dyn Transaction,
    resource: ResourceId,
    record: &T,
) -> Result<()> {
    let bytes = encode(record)?;
    txn.put(resource, bytes)
}

/// Encode and buffer an insert; fails if the row already exists
pub fn insert<T: Serialize>(
    txn: &mut dyn Transaction,
    resource: ResourceId,
    record: &T,
) -> Result<()> {
    let bytes = encode(record)?;
    txn.insert(resource, bytes)
}
