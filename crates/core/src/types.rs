//! Core types for the registry concurrency core
//!
//! This module defines the foundational types:
//! - EntityId: Unique identifier for versioned entities
//! - Stage: Lifecycle stage of a version
//! - ResourceId: Lockable row identifier, ordered by the global lock order

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a versioned entity (e.g., a registered model)
///
/// An EntityId is a wrapper around a UUID v4. EntityIds are comparable so
/// that lock acquisition can follow a single global order across entities.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EntityId(Uuid);

impl EntityId {
    /// Create a new random EntityId using UUID v4
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an EntityId from raw bytes
    pub fn from_bytes(bytes: [u8; 16]) -> Self {
        Self(Uuid::from_bytes(bytes))
    }

    /// Parse an EntityId from a string representation
    ///
    /// Accepts standard UUID format (with or without hyphens).
    ///
    /// # Errors
    /// Returns None if the string is not a valid UUID.
    pub fn from_string(s: &str) -> Option<Self> {
        Uuid::parse_str(s).ok().map(Self)
    }

    /// Get the raw bytes of this EntityId
    pub fn as_bytes(&self) -> &[u8; 16] {
        self.0.as_bytes()
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// Byte-wise ordering so lock acquisition has a total order over entities.
impl Ord for EntityId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.0.as_bytes().cmp(other.0.as_bytes())
    }
}

impl PartialOrd for EntityId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Lifecycle stage of a version
///
/// The stage machine moves strictly forward:
///
/// ```text
/// Registered → Staging → Production → Archived
///                  └──────────────────────┘
/// ```
///
/// `Staging → Archived` and `Production → Archived` are the archive edges;
/// no transition ever moves a version backward. Demotion is modeled as
/// archiving the current holder and promoting a different version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
#[repr(u8)]
pub enum Stage {
    /// Freshly sequenced, not yet deployed anywhere
    Registered = 0,
    /// Candidate under evaluation; an entity may have several
    Staging = 1,
    /// Serving traffic; at most one holder per entity
    Production = 2,
    /// Terminal parking state, unbounded
    Archived = 3,
}

impl Stage {
    /// Human-readable name for diagnostics
    pub const fn as_str(self) -> &'static str {
        match self {
            Stage::Registered => "registered",
            Stage::Staging => "staging",
            Stage::Production => "production",
            Stage::Archived => "archived",
        }
    }

    /// Whether this stage admits at most one holder per entity
    ///
    /// Singleton stages are backed by a lockable stage-slot row; the other
    /// stages are unbounded and have no slot. Several versions of one
    /// entity may sit in `Staging` at once; only `Production` is exclusive.
    pub const fn is_singleton(self) -> bool {
        matches!(self, Stage::Production)
    }

    /// Whether a version in this stage may be promoted to `target`
    ///
    /// The only promotions are `Registered → Staging` and
    /// `Staging → Production`. Everything else is an invalid transition.
    pub const fn can_promote_to(self, target: Stage) -> bool {
        matches!(
            (self, target),
            (Stage::Registered, Stage::Staging) | (Stage::Staging, Stage::Production)
        )
    }

    /// Whether a version in this stage may be archived
    pub const fn can_archive(self) -> bool {
        matches!(self, Stage::Staging | Stage::Production)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Identifies a lockable row in the storage engine
///
/// Every row this core reads or writes under a pessimistic lock is named by
/// a ResourceId. The same identifier doubles as the record address, so a
/// transaction that locks a resource and then reads it is always talking
/// about the same row.
///
/// # Ordering
///
/// ResourceIds are totally ordered: byte-wise by `entity_id` first, then by
/// a fixed per-kind rank, then by the kind's suffix (stage or version
/// number). Acquiring locks in ascending ResourceId order is the system's
/// sole deadlock-avoidance mechanism, so this `Ord` impl is load-bearing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceId {
    /// The entity's version-counter row (watermark for sequencing)
    Entity(EntityId),
    /// The holder slot for a singleton stage of an entity
    StageSlot(EntityId, Stage),
    /// An individual version row
    Version(EntityId, u64),
    /// The mutable metadata row attached to a version
    Metadata(EntityId, u64),
}

impl ResourceId {
    /// The entity this resource belongs to
    pub fn entity_id(&self) -> EntityId {
        match self {
            ResourceId::Entity(e) => *e,
            ResourceId::StageSlot(e, _) => *e,
            ResourceId::Version(e, _) => *e,
            ResourceId::Metadata(e, _) => *e,
        }
    }

    // Rank within one entity's rows. Counter before slots before versions
    // before metadata; the exact order is arbitrary but must be fixed.
    fn kind_rank(&self) -> u8 {
        match self {
            ResourceId::Entity(_) => 0,
            ResourceId::StageSlot(..) => 1,
            ResourceId::Version(..) => 2,
            ResourceId::Metadata(..) => 3,
        }
    }

    fn suffix(&self) -> u64 {
        match self {
            ResourceId::Entity(_) => 0,
            ResourceId::StageSlot(_, stage) => *stage as u64,
            ResourceId::Version(_, n) => *n,
            ResourceId::Metadata(_, n) => *n,
        }
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceId::Entity(e) => write!(f, "entity:{}", e),
            ResourceId::StageSlot(e, stage) => write!(f, "slot:{}:{}", e, stage),
            ResourceId::Version(e, n) => write!(f, "version:{}:{}", e, n),
            ResourceId::Metadata(e, n) => write!(f, "metadata:{}:{}", e, n),
        }
    }
}

// The global lock order: entity bytes → kind rank → suffix.
impl Ord for ResourceId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.entity_id()
            .cmp(&other.entity_id())
            .then(self.kind_rank().cmp(&other.kind_rank()))
            .then(self.suffix().cmp(&other.suffix()))
    }
}

impl PartialOrd for ResourceId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
