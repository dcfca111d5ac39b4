//! Reference in-memory storage engine for Registrar
//!
//! Implements the `StorageEngine`/`Transaction` boundary from
//! `registrar-core` for tests and embedded use:
//! - committed rows in a concurrent map
//! - exclusive row locks with a bounded wait, wait-for-graph deadlock
//!   detection, and release on commit/rollback/drop
//! - per-transaction write buffers applied atomically under a commit latch
//!
//! There is no durability, query surface, or replication here; this
//! engine exists so the concurrency core has a live backend to run
//! against.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod locks;
pub mod memory;

pub use memory::{EngineConfig, MemoryEngine};
