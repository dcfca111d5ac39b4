//! Racing promotions
//!
//! Two or more concurrent promotions into the same singleton stage must
//! serialize on the slot lock: every caller succeeds, the last committer
//! holds the stage, and every displaced holder ends up archived.

use crate::common;
use registrar::{Registry, Stage};
use std::collections::HashSet;
use std::sync::{Arc, Barrier};
use std::thread;

fn assert_single_production_holder(registry: &Registry, entity_id: registrar::EntityId, versions: &[u64]) {
    let holder = registry
        .stage_holder(entity_id, Stage::Production)
        .unwrap()
        .expect("some version must hold production");

    let mut production = 0;
    for version in versions {
        match registry.get_version(entity_id, *version).unwrap().stage {
            Stage::Production => {
                production += 1;
                assert_eq!(*version, holder, "slot must point at the production version");
            }
            Stage::Archived => {}
            other => panic!("version {version} ended in unexpected stage {other}"),
        }
    }
    assert_eq!(production, 1, "exactly one version may hold production");
}

#[test]
fn two_way_race_resolves_without_errors() {
    // Repeat to explore interleavings; every outcome must satisfy the
    // single-holder invariant and neither caller may see an error.
    for _ in 0..10 {
        let registry = Arc::new(common::registry());
        let (entity_id, versions) = common::entity_with_staged_versions(&registry, 2);
        let (v2, v3) = (versions[0], versions[1]);

        let barrier = Arc::new(Barrier::new(2));
        let handles: Vec<_> = [v2, v3]
            .into_iter()
            .map(|version| {
                let registry = Arc::clone(&registry);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    registry.promote(entity_id, version, Stage::Production)
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        let stages: HashSet<_> = [v2, v3]
            .iter()
            .map(|v| registry.get_version(entity_id, *v).unwrap().stage)
            .collect();
        assert_eq!(
            stages,
            HashSet::from([Stage::Production, Stage::Archived]),
            "one of the racers holds production, the other was archived"
        );
        assert_single_production_holder(&registry, entity_id, &[v2, v3]);
    }
}

#[test]
fn n_way_race_settles_to_one_holder() {
    let registry = Arc::new(common::registry());
    const RACERS: u64 = 6;
    let (entity_id, versions) = common::entity_with_staged_versions(&registry, RACERS);

    let barrier = Arc::new(Barrier::new(RACERS as usize));
    let handles: Vec<_> = versions
        .iter()
        .map(|version| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            let version = *version;
            thread::spawn(move || {
                barrier.wait();
                registry.promote(entity_id, version, Stage::Production)
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    assert_single_production_holder(&registry, entity_id, &versions);
}

#[test]
fn races_on_different_entities_are_independent() {
    let registry = Arc::new(common::registry());
    let (entity_a, versions_a) = common::entity_with_staged_versions(&registry, 2);
    let (entity_b, versions_b) = common::entity_with_staged_versions(&registry, 2);

    let barrier = Arc::new(Barrier::new(4));
    let mut handles = Vec::new();
    for (entity_id, versions) in [(entity_a, versions_a.clone()), (entity_b, versions_b.clone())] {
        for version in versions {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            handles.push(thread::spawn(move || {
                barrier.wait();
                registry.promote(entity_id, version, Stage::Production)
            }));
        }
    }
    for handle in handles {
        handle.join().unwrap().unwrap();
    }

    assert_single_production_holder(&registry, entity_a, &versions_a);
    assert_single_production_holder(&registry, entity_b, &versions_b);
}
