//! Canonical lock acquisition order
//!
//! Every transaction that takes more than one lock must acquire them in
//! ascending [`ResourceId`] order. With all writers agreeing on one total
//! order, a circular wait cannot form; this is the system's only
//! deadlock-avoidance mechanism. If the storage engine still reports a
//! deadlock (locks taken implicitly by unrelated operations), that is
//! classified transient and retried, never treated as a logic bug here.
//!
//! The ordering itself lives on `ResourceId`'s `Ord` impl: byte-wise
//! entity id first, then kind rank (counter, stage slots, version rows,
//! metadata), then suffix. Slots sorting before version rows is what lets
//! the stage coordinator write a displaced holder's row while holding only
//! the slot lock.

use registrar_core::{ResourceId, Result, Transaction};

/// Sort resources into the canonical acquisition order, dropping duplicates
///
/// Pure and deterministic: any permutation of the same set maps to the
/// same sequence.
pub fn order_resources(mut resources: Vec<ResourceId>) -> Vec<ResourceId> {
    resources.sort();
    resources.dedup();
    resources
}

/// Acquire exclusive locks on all resources in canonical order
///
/// The one sanctioned way to take multiple locks in a single transaction;
/// call sites must not call `lock_for_update` in hand-picked order.
pub fn lock_all(txn: &mut dyn Transaction, resources: Vec<ResourceId>) -> Result<()> {
    for resource in order_resources(resources) {
        txn.lock_for_update(&resource)?;
    }
    Ok(())
}
