//! Exclusive row-lock manager
//!
//! Grants at most one transaction per resource. Waiters block on a condvar
//! with a deadline; a waiter whose wait would close a cycle in the
//! wait-for graph is refused with `DeadlockDetected` instead of being
//! parked. Lock ordering in the callers makes such cycles impossible in
//! practice, so the detector is a backstop, not a scheduler.

use parking_lot::{Condvar, Mutex};
use registrar_core::{Error, ResourceId, Result};
use std::collections::{HashMap, HashSet};
use std::time::{Duration, Instant};

/// Transaction identifier used by the lock manager
pub type TxnId = u64;

#[derive(Default)]
struct LockTable {
    /// Current exclusive holder per resource
    holders: HashMap<ResourceId, TxnId>,
    /// Reverse index: every resource a transaction holds
    held: HashMap<TxnId, HashSet<ResourceId>>,
    /// Each transaction waits for at most one resource at a time
    waiting: HashMap<TxnId, ResourceId>,
}

impl LockTable {
    fn is_available(&self, txn: TxnId, resource: &ResourceId) -> bool {
        match self.holders.get(resource) {
            None => true,
            Some(holder) => *holder == txn,
        }
    }

    fn grant(&mut self, txn: TxnId, resource: ResourceId) {
        self.holders.insert(resource, txn);
        self.held.entry(txn).or_default().insert(resource);
    }

    /// Would parking `me` behind `resource` close a wait-for cycle?
    ///
    /// Each transaction waits for at most one resource, so the wait-for
    /// graph is a set of chains; following holder → waited-resource →
    /// holder either terminates or loops back to `me`.
    fn would_deadlock(&self, me: TxnId, resource: &ResourceId) -> bool {
        let mut current = match self.holders.get(resource) {
            Some(holder) => *holder,
            None => return false,
        };
        for _ in 0..=self.waiting.len() {
            if current == me {
                return true;
            }
            match self
                .waiting
                .get(&current)
                .and_then(|r| self.holders.get(r))
            {
                Some(holder) => current = *holder,
                None => return false,
            }
        }
        false
    }
}

/// Exclusive lock manager with bounded waits
pub struct LockManager {
    table: Mutex<LockTable>,
    released: Condvar,
}

impl LockManager {
    /// Create an empty lock manager
    pub fn new() -> Self {
        Self {
            table: Mutex::new(LockTable::default()),
            released: Condvar::new(),
        }
    }

    /// Acquire an exclusive lock, blocking up to `timeout`
    ///
    /// Re-acquiring a resource the transaction already holds is a no-op.
    ///
    /// # Errors
    /// - `Error::DeadlockDetected` if waiting would close a wait-for cycle
    /// - `Error::LockTimeout` if the deadline elapses first
    pub fn acquire(&self, txn: TxnId, resource: ResourceId, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        let mut table = self.table.lock();
        loop {
            if table.is_available(txn, &resource) {
                table.grant(txn, resource);
                return Ok(());
            }
            if table.would_deadlock(txn, &resource) {
                tracing::debug!(txn, resource = %resource, "refusing lock wait: deadlock");
                return Err(Error::DeadlockDetected { resource });
            }

            table.waiting.insert(txn, resource);
            let timed_out = self.released.wait_until(&mut table, deadline).timed_out();
            table.waiting.remove(&txn);

            if timed_out {
                // The holder may have released at the same instant; take the
                // lock if so, otherwise report the timeout.
                if table.is_available(txn, &resource) {
                    table.grant(txn, resource);
                    return Ok(());
                }
                tracing::debug!(txn, resource = %resource, "lock wait timed out");
                return Err(Error::LockTimeout { resource });
            }
        }
    }

    /// Release every lock held by a transaction and wake all waiters
    pub fn release_all(&self, txn: TxnId) {
        let mut table = self.table.lock();
        if let Some(resources) = table.held.remove(&txn) {
            for resource in resources {
                table.holders.remove(&resource);
            }
            drop(table);
            self.released.notify_all();
        }
    }

    /// Number of resources currently locked (diagnostics)
    pub fn locked_count(&self) -> usize {
        self.table.lock().holders.len()
    }
}

impl Default for LockManager {
    fn default() -> Self {
        Self::new()
    }
}
