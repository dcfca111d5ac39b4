//! Error types for the registry concurrency core
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait
//! implementations.
//!
//! The taxonomy splits three ways for callers:
//! - transient contention (`LockTimeout`, `DeadlockDetected`) is absorbed by
//!   the retry controller and only surfaces as `RetryExhausted`;
//! - `Conflict` is a normal outcome of an optimistic write and is never
//!   retried automatically; the caller must re-read and recompute;
//! - everything else is terminal on first occurrence.

use crate::types::{ResourceId, Stage};
use thiserror::Error;

/// Result type alias for registry operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the registry concurrency core
#[derive(Debug, Error)]
pub enum Error {
    /// Entity, version, or metadata row does not exist
    #[error("not found: {resource}")]
    NotFound {
        /// The row that was looked up
        resource: ResourceId,
    },

    /// Requested stage transition is not an edge of the stage machine
    #[error("invalid transition: {from} -> {to}")]
    InvalidTransition {
        /// Stage the version is currently in
        from: Stage,
        /// Stage the caller asked for
        to: Stage,
    },

    /// Optimistic write lost the race: the stored revision has moved
    ///
    /// Carries the revision observed after the failed write so the caller
    /// can re-fetch and retry without an extra round trip.
    #[error("conflict: record is at revision {current_revision}")]
    Conflict {
        /// Revision stored at the time the write was rejected
        current_revision: u64,
    },

    /// Lock-wait timeout reported by the storage engine (transient)
    #[error("lock wait timeout on {resource}")]
    LockTimeout {
        /// The resource the transaction was waiting for
        resource: ResourceId,
    },

    /// Deadlock detected by the storage engine (transient)
    #[error("deadlock detected while waiting on {resource}")]
    DeadlockDetected {
        /// The resource whose wait closed the cycle
        resource: ResourceId,
    },

    /// All retry attempts were consumed by transient failures
    #[error("retries exhausted after {attempts} attempt(s)")]
    RetryExhausted {
        /// Number of attempts made
        attempts: u32,
        /// Last transient error observed
        #[source]
        source: Box<Error>,
    },

    /// Request was malformed or violates a registration rule
    #[error("validation error: {0}")]
    Validation(String),

    /// Record encode/decode failure
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Storage engine fault; surfaced unchanged, never retried
    #[error("storage error: {0}")]
    Storage(String),
}

impl Error {
    /// Whether the retry controller may retry this error
    ///
    /// Only contention reported by the storage engine qualifies. `Conflict`
    /// never qualifies: resubmitting the same payload would turn a
    /// detected conflict into a silent lost update.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Error::LockTimeout { .. } | Error::DeadlockDetected { .. }
        )
    }
}

impl From<bincode::Error> for Error {
    fn from(e: bincode::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
