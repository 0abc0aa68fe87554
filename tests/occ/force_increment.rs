//! Forced Increment Tests
//!
//! Inserting a bid never writes the item it refers to. Reading the item under
//! `OptimisticForceIncrement` bumps its version anyway, so two bidders that
//! saw the same item version cannot both commit.

use crate::*;
use occamdb::{Error, LockMode, Version};
use std::sync::{Arc, Barrier};
use std::thread;

#[test]
fn test_concurrent_bid_invalidates_highest_bid_read() {
    let db = Arc::new(open_db());
    let item = seed_item_and_bids(&db);

    let mut u1 = db.begin();
    catalog::load::<Item, _>(&mut u1, item, LockMode::OptimisticForceIncrement).unwrap();
    let highest = catalog::highest_bid(&mut u1, item).unwrap();
    assert_eq!(highest.as_ref().map(|b| b.amount), Some(Money::from_units(13)));

    // A concurrent bidder wins the race
    {
        let db = Arc::clone(&db);
        thread::spawn(move || {
            db.transaction(|u2| catalog::place_bid(u2, item, "44.44".parse()?))
        })
        .join()
        .unwrap()
        .unwrap();
    }
    assert_eq!(db.get(item).unwrap().version, Version::new(1));

    // Our bid beats what we saw, but what we saw is stale
    let bid = Bid::new("45.45".parse().unwrap(), item, highest.as_ref()).unwrap();
    catalog::insert(&mut u1, &bid).unwrap();

    let err: Error = u1.commit().unwrap_err().into();
    assert_eq!(err, Error::ConcurrencyConflict { record_id: item });
    assert_eq!(bid_count(&db, item), 4);
    assert_eq!(db.get(item).unwrap().version, Version::new(1));
}

#[test]
fn test_without_force_increment_both_bids_land() {
    let db = open_db();
    let item = seed_item_and_bids(&db);

    let mut u1 = db.begin();
    catalog::load::<Item, _>(&mut u1, item, LockMode::Optimistic).unwrap();
    let highest = catalog::highest_bid(&mut u1, item).unwrap();

    let mut u2 = db.begin();
    catalog::load::<Item, _>(&mut u2, item, LockMode::Optimistic).unwrap();
    let highest2 = catalog::highest_bid(&mut u2, item).unwrap();
    let bid2 = Bid::new("44.44".parse().unwrap(), item, highest2.as_ref()).unwrap();
    catalog::insert(&mut u2, &bid2).unwrap();
    u2.commit().unwrap();

    // The item never changed, so nothing stops the second insert
    let bid1 = Bid::new("14.00".parse().unwrap(), item, highest.as_ref()).unwrap();
    catalog::insert(&mut u1, &bid1).unwrap();
    u1.commit().unwrap();

    assert_eq!(bid_count(&db, item), 5);
    assert_eq!(db.get(item).unwrap().version, Version::INITIAL);
}

#[test]
fn test_force_increment_bumps_even_without_writes() {
    let db = open_db();
    let item = db.create(Item::TABLE, Item::new("Some Item").to_value());

    let mut uow = db.begin();
    uow.read(item.id, LockMode::OptimisticForceIncrement).unwrap();
    let applied = uow.commit().unwrap();

    assert_eq!(applied.version_of(item.id), Some(Version::new(1)));
    assert_eq!(committed_item(&db, item.id).name, "Some Item");
}

#[test]
fn test_mode_escalation_is_strongest_wins() {
    let db = open_db();
    let item = db.create(Item::TABLE, Item::new("Some Item").to_value());

    let mut uow = db.begin();
    uow.read(item.id, LockMode::Optimistic).unwrap();
    uow.read(item.id, LockMode::OptimisticForceIncrement).unwrap();
    uow.read(item.id, LockMode::None).unwrap();
    assert_eq!(
        uow.ticket(item.id).unwrap().mode,
        LockMode::OptimisticForceIncrement
    );
    uow.commit().unwrap();
    assert_eq!(db.get(item.id).unwrap().version, Version::new(1));
}

#[test]
fn test_racing_bidders_one_wins() {
    const BIDDERS: usize = 6;

    let db = Arc::new(open_db());
    let item = seed_item_and_bids(&db);
    let barrier = Arc::new(Barrier::new(BIDDERS));

    let handles: Vec<_> = (0..BIDDERS)
        .map(|i| {
            let db = Arc::clone(&db);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let mut uow = db.begin();
                let amount = Money::from_units(20 + i as i64);
                catalog::place_bid(&mut uow, item, amount)?;
                barrier.wait();
                uow.commit()?;
                Ok::<_, Error>(amount)
            })
        })
        .collect();

    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    let winners = results.iter().filter(|r| r.is_ok()).count();

    assert_eq!(winners, 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| e.is_conflict()));
    assert_eq!(bid_count(&db, item), 4);
    assert_eq!(db.get(item).unwrap().version, Version::new(1));
}
