//! In-memory storage engine
//!
//! Committed rows live in a `DashMap`; each transaction buffers its writes
//! and applies them under a commit latch, so a plain read never observes
//! half of another transaction's commit. Exclusive locks come from the
//! [`LockManager`](crate::locks::LockManager) and are released on commit,
//! rollback, and drop.

use crate::locks::LockManager;
use dashmap::DashMap;
use registrar_core::{Error, IsolationLevel, ResourceId, Result, StorageEngine, Transaction};
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Tunables for the in-memory engine
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// How long a transaction waits for a contended lock before the
    /// engine reports `LockTimeout`
    pub lock_wait_timeout: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            lock_wait_timeout: Duration::from_secs(5),
        }
    }
}

impl EngineConfig {
    /// Set the lock-wait timeout
    pub fn with_lock_wait_timeout(mut self, timeout: Duration) -> Self {
        self.lock_wait_timeout = timeout;
        self
    }
}

/// Shared-memory storage engine
///
/// Cheap to clone behind an `Arc`; every transaction created from it
/// coordinates through the same row map and lock manager.
pub struct MemoryEngine {
    rows: DashMap<ResourceId, Vec<u8>>,
    locks: LockManager,
    commit_latch: Mutex<()>,
    next_txn_id: AtomicU64,
    config: EngineConfig,
}

impl MemoryEngine {
    /// Create an engine with default configuration
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    /// Create an engine with explicit configuration
    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            rows: DashMap::new(),
            locks: LockManager::new(),
            commit_latch: Mutex::new(()),
            next_txn_id: AtomicU64::new(0),
            config,
        }
    }

    /// Number of committed rows (diagnostics)
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of currently held locks (diagnostics)
    pub fn locked_count(&self) -> usize {
        self.locks.locked_count()
    }
}

impl Default for MemoryEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl StorageEngine for MemoryEngine {
    fn begin(&self, isolation: IsolationLevel) -> Result<Box<dyn Transaction + '_>> {
        let txn_id = self.next_txn_id.fetch_add(1, Ordering::SeqCst) + 1;
        tracing::trace!(txn_id, ?isolation, "transaction started");
        Ok(Box::new(MemoryTransaction {
            engine: self,
            txn_id,
            writes: HashMap::new(),
            inserts: HashSet::new(),
            finished: false,
        }))
    }
}

/// A transaction against a [`MemoryEngine`]
struct MemoryTransaction<'e> {
    engine: &'e MemoryEngine,
    txn_id: u64,
    /// Buffered writes, invisible to other transactions until commit
    writes: HashMap<ResourceId, Vec<u8>>,
    /// Subset of `writes` that must create the row; re-checked at commit
    inserts: HashSet<ResourceId>,
    finished: bool,
}

impl MemoryTransaction<'_> {
    fn committed(&self, resource: &ResourceId) -> Option<Vec<u8>> {
        // Briefly synchronize with commit so a batch is seen whole or not
        // at all.
        let _latch = self.engine.commit_latch.lock();
        self.engine.rows.get(resource).map(|row| row.value().clone())
    }

    fn release(&mut self) {
        if !self.finished {
            self.engine.locks.release_all(self.txn_id);
            self.finished = true;
        }
    }
}

impl Transaction for MemoryTransaction<'_> {
    fn lock_for_update(&mut self, resource: &ResourceId) -> Result<()> {
        self.engine
            .locks
            .acquire(self.txn_id, *resource, self.engine.config.lock_wait_timeout)
    }

    fn get(&mut self, resource: &ResourceId) -> Result<Option<Vec<u8>>> {
        if let Some(bytes) = self.writes.get(resource) {
            return Ok(Some(bytes.clone()));
        }
        Ok(self.committed(resource))
    }

    fn put(&mut self, resource: ResourceId, bytes: Vec<u8>) -> Result<()> {
        self.writes.insert(resource, bytes);
        Ok(())
    }

    fn insert(&mut self, resource: ResourceId, bytes: Vec<u8>) -> Result<()> {
        if self.writes.contains_key(&resource) || self.committed(&resource).is_some() {
            return Err(Error::Storage(format!(
                "unique constraint violation: {resource} already exists"
            )));
        }
        self.inserts.insert(resource);
        self.writes.insert(resource, bytes);
        Ok(())
    }

    fn conditional_update(
        &mut self,
        resource: &ResourceId,
        predicate: &dyn Fn(&[u8]) -> bool,
        bytes: Vec<u8>,
    ) -> Result<usize> {
        // The row lock is held to transaction end, so the predicate's view
        // stays valid through commit.
        self.lock_for_update(resource)?;

        let current = match self.writes.get(resource) {
            Some(bytes) => Some(bytes.clone()),
            None => self.committed(resource),
        };
        match current {
            Some(current) if predicate(&current) => {
                self.writes.insert(*resource, bytes);
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    fn commit(mut self: Box<Self>) -> Result<()> {
        {
            let _latch = self.engine.commit_latch.lock();

            // Uniqueness backstop: a concurrent transaction may have created
            // an inserted row after our call-time check.
            let conflict = self
                .inserts
                .iter()
                .find(|resource| self.engine.rows.contains_key(*resource))
                .copied();
            if let Some(resource) = conflict {
                drop(_latch);
                self.release();
                return Err(Error::Storage(format!(
                    "unique constraint violation: {resource} already exists"
                )));
            }

            for (resource, bytes) in self.writes.drain() {
                self.engine.rows.insert(resource, bytes);
            }
        }
        tracing::trace!(txn_id = self.txn_id, "transaction committed");
        self.release();
        Ok(())
    }

    fn rollback(mut self: Box<Self>) -> Result<()> {
        self.writes.clear();
        tracing::trace!(txn_id = self.txn_id, "transaction rolled back");
        self.release();
        Ok(())
    }
}

impl Drop for MemoryTransaction<'_> {
    fn drop(&mut self) {
        // Equivalent to rollback: buffered writes die with the struct and
        // locks must never outlive the transaction, even on panic.
        self.release();
    }
}
