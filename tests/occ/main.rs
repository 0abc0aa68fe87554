//! OCC Protocol Test Suite
//!
//! End-to-end checks of the optimistic concurrency protocol through the
//! public `occamdb` API, one module per protocol property.
//!
//! ## Running Tests
//!
//! ```bash
//! # Run the whole suite
//! cargo test --test occ
//!
//! # Run one property
//! cargo test --test occ first_commit_wins::
//! ```

use occamdb::catalog::{self, Bid, Category, Entity, Item, Money};
use occamdb::{Occam, RecordId};

// Test modules
pub mod contention;
pub mod first_commit_wins;
pub mod force_increment;
pub mod idempotent_noop;
pub mod read_only_validation;
pub mod version_monotonicity;

// =============================================================================
// SHARED TEST UTILITIES
// =============================================================================

/// Open a database with default settings
pub fn open_db() -> Occam {
    Occam::open().expect("failed to open database")
}

/// Identifiers of the seeded category/item graph
pub struct CatalogIds {
    /// Categories in creation order
    pub categories: Vec<RecordId>,
    /// Items per category, in creation order
    pub items: Vec<Vec<RecordId>>,
}

/// Three categories, each holding three items priced 11, 12 and 13
pub fn seed_categories_and_items(db: &Occam) -> CatalogIds {
    let mut ids = CatalogIds {
        categories: Vec::new(),
        items: Vec::new(),
    };
    for i in 1..=3 {
        let category = db.create(
            Category::TABLE,
            Category::new(format!("Category: {}", i)).to_value(),
        );
        let mut items = Vec::new();
        for j in 1..=3 {
            let item = Item::new(format!("Item {}", j))
                .with_price(Money::from_units(10 + j))
                .in_category(category.id);
            items.push(db.create(Item::TABLE, item.to_value()).id);
        }
        ids.categories.push(category.id);
        ids.items.push(items);
    }
    ids
}

/// One item with opening bids of 11, 12 and 13
pub fn seed_item_and_bids(db: &Occam) -> RecordId {
    let item = db.create(Item::TABLE, Item::new("Some Item").to_value());
    for units in 11..=13 {
        let bid = Bid::opening(Money::from_units(units), item.id);
        db.create(Bid::TABLE, bid.to_value());
    }
    item.id
}

/// Decode the committed state of an item
pub fn committed_item(db: &Occam, id: RecordId) -> Item {
    Item::from_value(&db.get(id).expect("item exists").value).expect("item decodes")
}

/// Number of committed bids on an item
pub fn bid_count(db: &Occam, item: RecordId) -> usize {
    db.store()
        .scan_table(Bid::TABLE)
        .into_iter()
        .filter_map(|r| Bid::from_value(&r.value).ok())
        .filter(|b| b.item == item)
        .count()
}
