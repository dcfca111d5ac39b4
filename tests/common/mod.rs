//! Shared test utilities for the integration suites.
//!
//! Import via `mod common;` from a suite's main.rs.

#![allow(dead_code)]

use registrar::{
    EngineConfig, EntityId, MemoryEngine, Registry, RegistryConfig, RetryPolicy, Stage,
    StorageEngine,
};
use std::sync::{Arc, Once};
use std::time::Duration;

static INIT_TRACING: Once = Once::new();

/// Install a subscriber so `RUST_LOG`-style debugging works in tests.
pub fn init_tracing() {
    INIT_TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt().with_test_writer().try_init();
    });
}

/// Registry over a fresh in-memory engine with default configuration.
pub fn registry() -> Registry {
    init_tracing();
    Registry::in_memory()
}

/// Registry with short lock waits, fast seeded retries, and a handle to
/// the engine underneath for direct transactions.
pub fn fast_registry() -> (Registry, Arc<MemoryEngine>) {
    init_tracing();
    let engine = Arc::new(MemoryEngine::with_config(
        EngineConfig::default().with_lock_wait_timeout(Duration::from_millis(100)),
    ));
    let registry = Registry::with_config(
        Arc::clone(&engine) as Arc<dyn StorageEngine>,
        RegistryConfig::new()
            .with_retry(
                RetryPolicy::new()
                    .with_max_attempts(5)
                    .with_base_delay(Duration::from_millis(2))
                    .with_max_delay(Duration::from_millis(10)),
            )
            .with_rng_seed(42),
    );
    (registry, engine)
}

/// Register an entity and allocate `count` versions, all left `Registered`.
pub fn entity_with_versions(registry: &Registry, count: u64) -> (EntityId, Vec<u64>) {
    let entity_id = registry.register_entity().unwrap();
    let versions = (0..count)
        .map(|_| registry.next_version(entity_id).unwrap())
        .collect();
    (entity_id, versions)
}

/// Register an entity and move `count` fresh versions into `Staging`.
pub fn entity_with_staged_versions(registry: &Registry, count: u64) -> (EntityId, Vec<u64>) {
    let (entity_id, versions) = entity_with_versions(registry, count);
    for version in &versions {
        registry.promote(entity_id, *version, Stage::Staging).unwrap();
    }
    (entity_id, versions)
}
