//! Read-Only Validation Tests
//!
//! A unit-of-work that only reads under `Optimistic` still fails to commit if
//! any record it read changed underneath it.

use crate::*;
use occamdb::{LockMode, Value, Version};
use std::sync::Arc;
use std::thread;

// =============================================================================
// AGGREGATION ACROSS CATEGORIES
// =============================================================================

#[test]
fn test_price_sum_invalidated_by_concurrent_move() {
    let db = Arc::new(open_db());
    let ids = seed_categories_and_items(&db);
    let first = ids.categories[0];
    let last = *ids.categories.last().unwrap();

    let mut uow = db.begin();
    let mut total = Money::ZERO;
    for category in &ids.categories {
        total = total + catalog::category_price(&mut uow, *category, LockMode::Optimistic).unwrap();

        // After the first category is summed, another unit-of-work moves its
        // first item into the last category
        if *category == first {
            let db = Arc::clone(&db);
            thread::spawn(move || {
                db.transaction(|mover| {
                    let items = catalog::items_in_category(mover, first, LockMode::None)?;
                    catalog::move_item(mover, items[0].0, last)
                })
            })
            .join()
            .unwrap()
            .unwrap();
        }
    }

    // The moved item was counted twice
    assert_eq!(total.to_string(), "119.00");

    let err = uow.commit().unwrap_err();
    assert!(err.is_conflict());
    assert_eq!(err.conflicting_record(), Some(ids.items[0][0]));
    assert!(uow.is_rolled_back());
}

#[test]
fn test_price_sum_commits_without_interference() {
    let db = open_db();
    let ids = seed_categories_and_items(&db);

    let mut uow = db.begin();
    let total = catalog::total_price(&mut uow, &ids.categories, LockMode::Optimistic).unwrap();
    assert_eq!(total.to_string(), "108.00");
    uow.commit().unwrap();

    // Checked reads are verified, not bumped
    for item in ids.items.iter().flatten() {
        assert_eq!(db.get(*item).unwrap().version, Version::INITIAL);
    }
}

// =============================================================================
// GENERIC READ SETS
// =============================================================================

#[test]
fn test_read_only_unit_fails_on_first_changed_record() {
    let db = open_db();
    let records: Vec<_> = (0..5).map(|i| db.create("row", Value::Int(i)).id).collect();

    let mut reader = db.begin();
    for id in &records {
        reader.read(*id, LockMode::Optimistic).unwrap();
    }
    assert!(reader.is_read_only());

    db.transaction(|writer| {
        writer.read(records[0], LockMode::None)?;
        writer.stage(records[0], Value::Int(100))?;
        Ok(())
    })
    .unwrap();

    let err = reader.commit().unwrap_err();
    assert_eq!(err.conflicting_record(), Some(records[0]));
}

#[test]
fn test_read_only_unit_detects_delete() {
    let db = open_db();
    let row = db.create("row", Value::Int(1));

    let mut reader = db.begin();
    reader.read(row.id, LockMode::Optimistic).unwrap();
    db.delete(row.id);

    assert_eq!(reader.commit().unwrap_err().conflicting_record(), Some(row.id));
}

#[test]
fn test_unchecked_reads_are_not_validated() {
    let db = open_db();
    let row = db.create("row", Value::Int(1));

    let mut reader = db.begin();
    reader.read(row.id, LockMode::None).unwrap();

    db.transaction(|writer| {
        writer.read(row.id, LockMode::None)?;
        writer.stage(row.id, Value::Int(2))?;
        Ok(())
    })
    .unwrap();

    reader.commit().unwrap();
}

#[test]
fn test_escalated_read_is_validated_against_first_version() {
    let db = open_db();
    let row = db.create("row", Value::Int(1));

    let mut reader = db.begin();
    reader.read(row.id, LockMode::None).unwrap();

    db.transaction(|writer| {
        writer.read(row.id, LockMode::None)?;
        writer.stage(row.id, Value::Int(2))?;
        Ok(())
    })
    .unwrap();

    // Locking after the fact still checks the version seen on first read
    reader.lock(row.id, LockMode::Optimistic).unwrap();
    assert!(reader.commit().unwrap_err().is_conflict());
}
