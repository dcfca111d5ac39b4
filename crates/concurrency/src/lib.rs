//! Concurrency layer for the registry core
//!
//! This crate implements the coordination logic that keeps shared,
//! versioned registry state correct under contention:
//! - ordering: canonical lock acquisition order (deadlock avoidance)
//! - retry: bounded retries with exponential backoff and jitter
//! - sequencer: unique, gap-free version numbers per entity
//! - coordinator: single-holder stage transitions (promote/archive)
//! - metadata: optimistic compare-and-swap metadata updates
//!
//! The pessimistic components (sequencer, coordinator) prevent conflicts
//! with exclusive row locks; the metadata store detects them with a
//! revision check at commit time. The two differ in what they tolerate:
//! a lost stage transition is absorbed by last-committer-wins, a lost
//! metadata write never is.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod coordinator;
pub mod metadata;
pub mod ordering;
pub mod retry;
pub mod sequencer;

pub use coordinator::StageCoordinator;
pub use metadata::MetadataStore;
pub use ordering::{lock_all, order_resources};
pub use retry::{with_retry, RetryPolicy};
pub use sequencer::VersionSequencer;
