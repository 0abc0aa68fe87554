//! Version Monotonicity Tests
//!
//! Across successive successful commits a record's version moves by exactly
//! one each time, and no two successful commits ever start from the same
//! version.

use crate::*;
use occamdb::{LockMode, Value, Version};
use proptest::prelude::*;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::thread;

#[test]
fn test_every_commit_moves_version_by_one() {
    let db = open_db();
    let row = db.create("row", Value::Int(0));

    for expected in 1..=10u64 {
        let mut uow = db.begin();
        let current = uow.read(row.id, LockMode::Optimistic).unwrap();
        let next = current.as_int().unwrap() + 1;
        uow.stage(row.id, Value::Int(next)).unwrap();
        let applied = uow.commit().unwrap();
        assert_eq!(applied.version_of(row.id), Some(Version::new(expected)));
    }
    assert_eq!(db.get(row.id).unwrap().value, Value::Int(10));
}

#[test]
fn test_multi_field_change_bumps_once() {
    let db = open_db();
    let item = db.create(
        Item::TABLE,
        Item::new("Some Item")
            .with_price(Money::from_units(11))
            .to_value(),
    );

    db.transaction(|uow| {
        let mut changed = catalog::load::<Item, _>(uow, item.id, LockMode::None)?;
        changed.name = "New Name".into();
        changed.buy_now_price = Some(Money::from_units(99));
        catalog::save(uow, item.id, &changed)
    })
    .unwrap();

    assert_eq!(db.get(item.id).unwrap().version, Version::new(1));
}

#[test]
fn test_no_two_winners_share_a_pre_commit_version() {
    const THREADS: usize = 4;
    const ROUNDS: usize = 50;

    let db = Arc::new(open_db());
    let row = db.create("row", Value::Int(0));
    let observed = Arc::new(Mutex::new(Vec::new()));

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let db = Arc::clone(&db);
            let observed = Arc::clone(&observed);
            thread::spawn(move || {
                for _ in 0..ROUNDS {
                    let mut uow = db.begin();
                    let record = uow.read_record(row.id, LockMode::None).unwrap();
                    let next = record.value.as_int().unwrap() + 1;
                    uow.stage(row.id, Value::Int(next)).unwrap();
                    if uow.commit().is_ok() {
                        observed.lock().unwrap().push(record.version.as_u64());
                    }
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let observed = observed.lock().unwrap();
    let distinct: HashSet<_> = observed.iter().copied().collect();
    assert_eq!(distinct.len(), observed.len(), "two winners saw the same version");

    let stored = db.get(row.id).unwrap();
    assert_eq!(stored.version.as_u64(), observed.len() as u64);
    // No lost updates: the counter equals the number of successful commits
    assert_eq!(stored.value, Value::Int(observed.len() as i64));
}

proptest! {
    /// Interleaving two units-of-work in any order: the record's version
    /// equals the number of successful commits.
    #[test]
    fn prop_version_counts_successful_commits(
        schedule in proptest::collection::vec((any::<bool>(), any::<bool>()), 1..30)
    ) {
        let db = open_db();
        let row = db.create("row", Value::Int(0));
        let mut successes = 0u64;

        for (force, interfere) in schedule {
            let mode = if force { LockMode::OptimisticForceIncrement } else { LockMode::Optimistic };
            let mut uow = db.begin();
            uow.read(row.id, mode).unwrap();

            if interfere {
                let mut other = db.begin();
                other.read(row.id, LockMode::None).unwrap();
                other.stage(row.id, Value::Int(-1)).unwrap();
                other.commit().unwrap();
                successes += 1;
            }

            uow.stage(row.id, Value::Int(successes as i64)).unwrap();
            match uow.commit() {
                Ok(_) => {
                    prop_assert!(!interfere);
                    successes += 1;
                }
                Err(e) => {
                    prop_assert!(interfere);
                    prop_assert!(e.is_conflict());
                }
            }
            prop_assert_eq!(db.get(row.id).unwrap().version, Version::new(successes));
        }
    }
}
