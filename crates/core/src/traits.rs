//! Storage engine boundary
//!
//! The concurrency core never talks to storage directly; it goes through
//! these traits. An engine must provide atomic transactions, exclusive
//! row locking with a bounded wait, and an atomic conditional update.
//!
//! ## Isolation requirements
//!
//! The pessimistic operations (version sequencing, stage transitions)
//! follow a lock → read → write → commit discipline and require that the
//! rows they lock cannot change underneath them: engines must honor
//! `RepeatableRead` by making `lock_for_update` an exclusive lock held to
//! transaction end. The optimistic metadata path only needs
//! `ReadCommitted` plus an atomic `conditional_update`. An engine that
//! cannot provide exclusive row locks is not a valid backend and must be
//! rejected when wired up.
//!
//! ## Lock release
//!
//! A transaction releases every lock it holds on commit and on rollback.
//! Implementations must also release on drop, so that an early `?` return
//! or a panic in the middle of an operation can never leak a lock.

use crate::error::Result;
use crate::types::ResourceId;

/// Isolation level requested at transaction begin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IsolationLevel {
    /// Reads see the latest committed state; sufficient only for the
    /// conditional-update path
    ReadCommitted,
    /// Locked rows are stable for the life of the transaction; required
    /// by every pessimistic operation
    RepeatableRead,
}

/// A transactional storage engine
///
/// Implementations must be safe to share across threads; the core is
/// invoked concurrently from an arbitrary number of callers and performs
/// all coordination through the engine's transactions.
pub trait StorageEngine: Send + Sync {
    /// Begin a new transaction at the given isolation level
    fn begin(&self, isolation: IsolationLevel) -> Result<Box<dyn Transaction + '_>>;
}

/// A single transaction against the storage engine
///
/// Writes are buffered until `commit`; nothing a transaction does is
/// visible to other transactions before that point. `commit` and
/// `rollback` consume the transaction, and dropping an unfinished
/// transaction is equivalent to rollback.
pub trait Transaction: Send {
    /// Acquire an exclusive lock on a resource, blocking until granted
    ///
    /// # Errors
    /// - `Error::LockTimeout` if the engine's lock-wait timeout elapses
    /// - `Error::DeadlockDetected` if waiting would close a cycle
    ///
    /// Both are transient; callers reach this through the retry
    /// controller. Re-locking a resource this transaction already holds
    /// is a no-op.
    fn lock_for_update(&mut self, resource: &ResourceId) -> Result<()>;

    /// Read a row, observing this transaction's own buffered writes first
    fn get(&mut self, resource: &ResourceId) -> Result<Option<Vec<u8>>>;

    /// Buffer a write (create or overwrite)
    fn put(&mut self, resource: ResourceId, bytes: Vec<u8>) -> Result<()>;

    /// Buffer an insert that must create the row
    ///
    /// Fails immediately if the row exists, and again at commit if a
    /// concurrent transaction created it in the meantime. This is the
    /// engine-enforced uniqueness backstop for version numbers.
    fn insert(&mut self, resource: ResourceId, bytes: Vec<u8>) -> Result<()>;

    /// Atomic compare-and-swap on a single row
    ///
    /// Takes the row's exclusive lock for the remainder of the
    /// transaction, evaluates `predicate` against the current committed
    /// state, and buffers `bytes` if it holds. Returns the number of rows
    /// affected (0 or 1). A return of 0 means the predicate did not hold
    /// or the row does not exist; the row is left untouched either way.
    fn conditional_update(
        &mut self,
        resource: &ResourceId,
        predicate: &dyn Fn(&[u8]) -> bool,
        bytes: Vec<u8>,
    ) -> Result<usize>;

    /// Apply all buffered writes atomically and release all locks
    fn commit(self: Box<Self>) -> Result<()>;

    /// Discard all buffered writes and release all locks
    fn rollback(self: Box<Self>) -> Result<()>;
}
