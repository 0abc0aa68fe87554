//! Contention Tests
//!
//! Many threads hammering a few records through `transaction_with_retry`.
//! Conflicts are expected; lost updates are not.

use crate::*;
use occamdb::{LockMode, RetryPolicy, Value};
use rand::Rng;
use std::sync::Arc;
use std::thread;

#[test]
fn test_counters_have_no_lost_updates() {
    const THREADS: usize = 8;
    const INCREMENTS: usize = 100;
    const COUNTERS: usize = 3;

    let db = Arc::new(
        Occam::builder()
            .retry_policy(RetryPolicy::default().with_max_attempts(u32::MAX))
            .open()
            .unwrap(),
    );
    let counters: Arc<Vec<RecordId>> = Arc::new(
        (0..COUNTERS)
            .map(|_| db.create("counter", Value::Int(0)).id)
            .collect(),
    );

    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let db = Arc::clone(&db);
            let counters = Arc::clone(&counters);
            thread::spawn(move || {
                let mut rng = rand::thread_rng();
                for _ in 0..INCREMENTS {
                    let target = counters[rng.gen_range(0..COUNTERS)];
                    db.transaction_with_retry(|uow| {
                        let current = uow.read(target, LockMode::None)?;
                        let next = current.as_int().unwrap_or(0) + 1;
                        uow.stage(target, Value::Int(next))?;
                        Ok(())
                    })
                    .unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    let total: i64 = counters
        .iter()
        .map(|id| db.get(*id).unwrap().value.as_int().unwrap())
        .sum();
    assert_eq!(total, (THREADS * INCREMENTS) as i64);

    let metrics = db.metrics();
    assert_eq!(metrics.units_committed, (THREADS * INCREMENTS) as u64);
    assert_eq!(metrics.units_rolled_back, metrics.conflicts);
}

#[test]
fn test_bidding_war_keeps_bids_increasing() {
    const BIDDERS: usize = 6;
    const ROUNDS: usize = 20;

    let db = Arc::new(
        Occam::builder()
            .retry_policy(RetryPolicy::default().with_max_attempts(u32::MAX))
            .open()
            .unwrap(),
    );
    let item = seed_item_and_bids(&db);

    let handles: Vec<_> = (0..BIDDERS)
        .map(|_| {
            let db = Arc::clone(&db);
            thread::spawn(move || {
                for _ in 0..ROUNDS {
                    db.transaction_with_retry(|uow| {
                        catalog::outbid(uow, item, Money::from_cents(1))
                    })
                    .unwrap();
                }
            })
        })
        .collect();
    for h in handles {
        h.join().unwrap();
    }

    // Force-incrementing the item serializes bidders: every committed bid
    // beat the one before it by exactly one cent
    let mut amounts: Vec<i64> = db
        .store()
        .scan_table(Bid::TABLE)
        .into_iter()
        .map(|r| Bid::from_value(&r.value).unwrap().amount.cents())
        .collect();
    let count = amounts.len();
    amounts.sort_unstable();
    amounts.dedup();
    assert_eq!(amounts.len(), count);
    assert_eq!(count, 3 + BIDDERS * ROUNDS);
    assert_eq!(
        amounts.last().copied(),
        Some(1300 + (BIDDERS * ROUNDS) as i64)
    );
    assert_eq!(
        db.get(item).unwrap().version.as_u64(),
        (BIDDERS * ROUNDS) as u64
    );
}
