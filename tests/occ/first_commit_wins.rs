//! First-Commit-Wins Tests
//!
//! Two units-of-work read the same record at the same version and both stage
//! a change. Whichever commits first wins; the other fails and leaves the
//! winner's value in place.

use crate::*;
use occamdb::{Error, LockMode, Value, Version};
use std::sync::{Arc, Barrier};
use std::thread;

// =============================================================================
// SEQUENTIAL INTERLEAVING
// =============================================================================

#[test]
fn test_second_committer_loses() {
    let db = open_db();
    let item = db.create(Item::TABLE, Item::new("Some Item").to_value());

    let mut u1 = db.begin();
    let mut u2 = db.begin();

    let mut mine = catalog::load::<Item, _>(&mut u1, item.id, LockMode::None).unwrap();
    assert_eq!(u1.ticket(item.id).unwrap().version, Version::INITIAL);
    mine.name = "New Name".into();
    catalog::save(&mut u1, item.id, &mine).unwrap();

    let mut theirs = catalog::load::<Item, _>(&mut u2, item.id, LockMode::None).unwrap();
    assert_eq!(u2.ticket(item.id).unwrap().version, Version::INITIAL);
    theirs.name = "Other Name".into();
    catalog::save(&mut u2, item.id, &theirs).unwrap();

    u2.commit().unwrap();

    let err = u1.commit().unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(err.conflicting_record(), Some(item.id));

    assert_eq!(committed_item(&db, item.id).name, "Other Name");
    assert_eq!(db.get(item.id).unwrap().version, Version::new(1));
}

#[test]
fn test_commit_order_not_start_order_decides() {
    let db = open_db();
    let item = db.create("item", Value::Int(0));

    // u1 starts first but commits last
    let mut u1 = db.begin();
    u1.read(item.id, LockMode::None).unwrap();
    u1.stage(item.id, Value::Int(1)).unwrap();

    let mut u2 = db.begin();
    u2.read(item.id, LockMode::None).unwrap();
    u2.stage(item.id, Value::Int(2)).unwrap();
    u2.commit().unwrap();

    assert!(u1.commit().is_err());
    assert_eq!(db.get(item.id).unwrap().value, Value::Int(2));
}

#[test]
fn test_concurrent_second_unit_on_another_thread() {
    let db = Arc::new(open_db());
    let item = db.create(Item::TABLE, Item::new("Some Item").to_value());

    let mut u1 = db.begin();
    catalog::rename_item(&mut u1, item.id, "New Name").unwrap();

    let handle = {
        let db = Arc::clone(&db);
        thread::spawn(move || {
            db.transaction(|u2| catalog::rename_item(u2, item.id, "Other Name"))
        })
    };
    handle.join().unwrap().unwrap();

    let err: Error = u1.commit().unwrap_err().into();
    assert_eq!(
        err,
        Error::ConcurrencyConflict {
            record_id: item.id
        }
    );
    assert_eq!(committed_item(&db, item.id).name, "Other Name");
}

// =============================================================================
// RACING THREADS
// =============================================================================

#[test]
fn test_exactly_one_racer_wins() {
    const RACERS: usize = 8;

    let db = Arc::new(open_db());
    let item = db.create("item", Value::Int(0));

    // Every racer reads version 0 before anyone commits
    let read_barrier = Arc::new(Barrier::new(RACERS));
    let handles: Vec<_> = (0..RACERS)
        .map(|i| {
            let db = Arc::clone(&db);
            let read_barrier = Arc::clone(&read_barrier);
            thread::spawn(move || {
                let mut uow = db.begin();
                uow.read(item.id, LockMode::None).unwrap();
                uow.stage(item.id, Value::Int(i as i64 + 1)).unwrap();
                read_barrier.wait();
                uow.commit().map(|_| i)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners: Vec<usize> = results.iter().filter_map(|r| r.as_ref().ok().copied()).collect();

    assert_eq!(winners.len(), 1);
    for loser in results.iter().filter_map(|r| r.as_ref().err()) {
        assert!(loser.is_conflict(), "unexpected error: {:?}", loser);
    }

    let stored = db.get(item.id).unwrap();
    assert_eq!(stored.version, Version::new(1));
    assert_eq!(stored.value, Value::Int(winners[0] as i64 + 1));
    assert_eq!(db.metrics().conflicts, (RACERS - 1) as u64);
}
