//! Idempotent No-Op Tests
//!
//! A unit-of-work that reads under `None` and stages nothing always commits,
//! whatever happened to the records it read.

use crate::*;
use occamdb::{LockMode, Value};
use std::sync::Arc;
use std::thread;

#[test]
fn test_unchecked_reader_survives_concurrent_churn() {
    let db = Arc::new(open_db());
    let ids = seed_categories_and_items(&db);

    let mut reader = db.begin();
    let before = catalog::total_price(&mut reader, &ids.categories, LockMode::None).unwrap();
    assert_eq!(before, Money::from_units(108));

    let writers: Vec<_> = ids
        .items
        .iter()
        .flatten()
        .copied()
        .map(|item| {
            let db = Arc::clone(&db);
            thread::spawn(move || db.transaction(|uow| catalog::rename_item(uow, item, "Churned")))
        })
        .collect();
    for w in writers {
        w.join().unwrap().unwrap();
    }
    db.delete(ids.items[2][2]);

    let applied = reader.commit().unwrap();
    assert_eq!(applied.commit_seq, 0);
    assert!(reader.is_committed());
}

#[test]
fn test_empty_unit_of_work_commits() {
    let db = open_db();
    let store_commits = db.store().commit_count();

    let mut uow = db.begin();
    assert!(uow.is_read_only());
    uow.commit().unwrap();

    assert_eq!(db.store().commit_count(), store_commits);
    assert_eq!(db.metrics().units_committed, 1);
}

#[test]
fn test_noop_commit_leaves_versions_alone() {
    let db = open_db();
    let row = db.create("row", Value::Int(7));

    for _ in 0..3 {
        let mut uow = db.begin();
        uow.read(row.id, LockMode::None).unwrap();
        uow.commit().unwrap();
    }

    assert_eq!(db.get(row.id).unwrap().version.as_u64(), 0);
}
