//! Version sequencer integration tests
//!
//! - uniqueness and gap-freedom under contention
//! - isolation between entities (no cross-entity blocking)
//! - aborted attempts never consume a number

use crate::common;
use registrar::{Error, IsolationLevel, ResourceId, Stage, StorageEngine, Transaction};
use std::sync::{Arc, Barrier, Mutex};
use std::thread;

#[test]
fn concurrent_allocations_are_unique_and_gap_free() {
    let registry = Arc::new(common::registry());
    let entity_id = registry.register_entity().unwrap();

    const THREADS: usize = 8;
    const PER_THREAD: usize = 25;

    let barrier = Arc::new(Barrier::new(THREADS));
    let allocated = Arc::new(Mutex::new(Vec::new()));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            let allocated = Arc::clone(&allocated);
            thread::spawn(move || {
                barrier.wait();
                for _ in 0..PER_THREAD {
                    let number = registry.next_version(entity_id).unwrap();
                    allocated.lock().unwrap().push(number);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    let mut numbers = allocated.lock().unwrap().clone();
    numbers.sort_unstable();
    let expected: Vec<u64> = (1..=(THREADS * PER_THREAD) as u64).collect();
    assert_eq!(numbers, expected, "numbers must be {{1..N}} with no gaps or duplicates");
}

#[test]
fn sequencing_one_entity_never_blocks_another() {
    let (registry, engine) = common::fast_registry();
    let blocked = registry.register_entity().unwrap();
    let free = registry.register_entity().unwrap();

    // Park an exclusive lock on `blocked`'s counter row. The engine's
    // lock-wait timeout is far shorter than this transaction's lifetime,
    // so anything queueing behind it would fail loudly.
    let mut holder = engine.begin(IsolationLevel::RepeatableRead).unwrap();
    holder.lock_for_update(&ResourceId::Entity(blocked)).unwrap();

    for expected in 1..=20 {
        assert_eq!(registry.next_version(free).unwrap(), expected);
    }

    holder.rollback().unwrap();
}

#[test]
fn blocked_sequencing_surfaces_retry_exhausted() {
    let (registry, engine) = common::fast_registry();
    let entity_id = registry.register_entity().unwrap();

    let mut holder = engine.begin(IsolationLevel::RepeatableRead).unwrap();
    holder.lock_for_update(&ResourceId::Entity(entity_id)).unwrap();

    let err = registry.next_version(entity_id).unwrap_err();
    match err {
        Error::RetryExhausted { attempts, source } => {
            assert_eq!(attempts, 5);
            assert!(matches!(*source, Error::LockTimeout { .. }));
        }
        other => panic!("expected RetryExhausted, got {other:?}"),
    }
    holder.rollback().unwrap();
}

#[test]
fn failed_attempts_consume_no_numbers() {
    let (registry, engine) = common::fast_registry();
    let entity_id = registry.register_entity().unwrap();
    assert_eq!(registry.next_version(entity_id).unwrap(), 1);

    // Starve one allocation into failure...
    let mut holder = engine.begin(IsolationLevel::RepeatableRead).unwrap();
    holder.lock_for_update(&ResourceId::Entity(entity_id)).unwrap();
    registry.next_version(entity_id).unwrap_err();
    holder.rollback().unwrap();

    // ...and the watermark must not have moved.
    assert_eq!(registry.next_version(entity_id).unwrap(), 2);
}

#[test]
fn sequencing_an_unknown_entity_is_not_found() {
    let registry = common::registry();
    let err = registry.next_version(registrar::EntityId::new()).unwrap_err();
    assert!(matches!(err, Error::NotFound { .. }));
}

#[test]
fn fresh_versions_are_registered() {
    let registry = common::registry();
    let (entity_id, versions) = common::entity_with_versions(&registry, 3);
    for version in versions {
        assert_eq!(
            registry.get_version(entity_id, version).unwrap().stage,
            Stage::Registered
        );
    }
}
