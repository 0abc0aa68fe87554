//! Auction catalog: items, categories and bids.
//!
//! A small entity graph that exercises every lock mode:
//! - renaming or moving an item is a plain versioned write
//! - summing prices across categories under [`LockMode::Optimistic`] fails to
//!   commit if any summed item moved concurrently, even though nothing was
//!   written
//! - [`place_bid`] reads the item under
//!   [`LockMode::OptimisticForceIncrement`], so two bidders racing on the same
//!   item conflict on the item even though each only inserts a bid
//!
//! Every operation runs inside a caller-owned unit-of-work and never commits.

mod bid;
mod category;
mod item;
mod money;

pub use bid::Bid;
pub use category::Category;
pub use item::Item;
pub use money::Money;

use crate::error::{Error, Result};
use occam_concurrency::{LockMode, UnitOfWork};
use occam_core::{RecordId, Value, VersionedStorage};

/// A domain type stored as one record.
pub trait Entity: Sized {
    /// Table records of this type live in
    const TABLE: &'static str;

    /// Encode as a record payload
    fn to_value(&self) -> Value;

    /// Decode a record payload
    fn from_value(value: &Value) -> Result<Self>;
}

// ============================================================================
// Payload decoding
// ============================================================================

fn wrong_type(field: &str, expected: &'static str, actual: &Value) -> Error {
    occam_core::Error::WrongType {
        field: field.to_string(),
        expected,
        actual: actual.type_name(),
    }
    .into()
}

fn required<'a>(value: &'a Value, field: &str) -> Result<&'a Value> {
    value
        .get(field)
        .ok_or_else(|| Error::InvalidInput(format!("missing field '{}'", field)))
}

pub(crate) fn string_field(value: &Value, field: &str) -> Result<String> {
    let v = required(value, field)?;
    v.as_str()
        .map(str::to_string)
        .ok_or_else(|| wrong_type(field, "String", v))
}

pub(crate) fn int_field(value: &Value, field: &str) -> Result<i64> {
    let v = required(value, field)?;
    v.as_int().ok_or_else(|| wrong_type(field, "Int", v))
}

pub(crate) fn optional_int_field(value: &Value, field: &str) -> Result<Option<i64>> {
    match value.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(v) => v.as_int().map(Some).ok_or_else(|| wrong_type(field, "Int", v)),
    }
}

// ============================================================================
// Generic entity access
// ============================================================================

/// Read and decode an entity under `mode`.
///
/// # Errors
/// [`Error::NotFound`] if the record is missing, [`Error::InvalidInput`] if it
/// belongs to another table or does not decode.
pub fn load<E, S>(uow: &mut UnitOfWork<S>, id: RecordId, mode: LockMode) -> Result<E>
where
    E: Entity,
    S: VersionedStorage,
{
    let record = uow.read_record(id, mode)?;
    if !record.is_in(E::TABLE) {
        return Err(Error::InvalidInput(format!(
            "record {} is a {}, not a {}",
            id, record.table, E::TABLE
        )));
    }
    E::from_value(&record.value)
}

/// Stage a new entity; it is created at version 0 on commit.
pub fn insert<E, S>(uow: &mut UnitOfWork<S>, entity: &E) -> Result<RecordId>
where
    E: Entity,
    S: VersionedStorage,
{
    Ok(uow.insert(E::TABLE, entity.to_value())?)
}

/// Stage the new state of an entity already read in `uow`.
pub fn save<E, S>(uow: &mut UnitOfWork<S>, id: RecordId, entity: &E) -> Result<()>
where
    E: Entity,
    S: VersionedStorage,
{
    Ok(uow.stage(id, entity.to_value())?)
}

// ============================================================================
// Queries
// ============================================================================

/// Every item in `category`, read under `mode`, in id order.
pub fn items_in_category<S>(
    uow: &mut UnitOfWork<S>,
    category: RecordId,
    mode: LockMode,
) -> Result<Vec<(RecordId, Item)>>
where
    S: VersionedStorage,
{
    let category_ref = category.as_u64() as i64;
    let records = uow.query(
        |r| {
            r.is_in(Item::TABLE)
                && r.value.get("category").and_then(Value::as_int) == Some(category_ref)
        },
        mode,
    )?;
    records
        .into_iter()
        .map(|r| Ok((r.id, Item::from_value(&r.value)?)))
        .collect()
}

/// The highest bid on `item`, if any.
///
/// Bids are read under [`LockMode::None`]: a concurrent bid does not by itself
/// invalidate this read. Protection against concurrent bids comes from
/// force-incrementing the item (see [`place_bid`]).
pub fn highest_bid<S>(uow: &mut UnitOfWork<S>, item: RecordId) -> Result<Option<Bid>>
where
    S: VersionedStorage,
{
    let item_ref = item.as_u64() as i64;
    let records = uow.query(
        |r| r.is_in(Bid::TABLE) && r.value.get("item").and_then(Value::as_int) == Some(item_ref),
        LockMode::None,
    )?;

    let mut highest: Option<Bid> = None;
    for record in records {
        let bid = Bid::from_value(&record.value)?;
        if highest.as_ref().map_or(true, |h| bid.amount > h.amount) {
            highest = Some(bid);
        }
    }
    Ok(highest)
}

/// Sum the buy-now prices of every item in `categories`.
///
/// Items without a price count as zero.
pub fn total_price<S>(
    uow: &mut UnitOfWork<S>,
    categories: &[RecordId],
    mode: LockMode,
) -> Result<Money>
where
    S: VersionedStorage,
{
    let mut total = Money::ZERO;
    for category in categories {
        total = total + category_price(uow, *category, mode)?;
    }
    Ok(total)
}

/// Sum the buy-now prices of the items in one category.
pub fn category_price<S>(
    uow: &mut UnitOfWork<S>,
    category: RecordId,
    mode: LockMode,
) -> Result<Money>
where
    S: VersionedStorage,
{
    Ok(items_in_category(uow, category, mode)?
        .into_iter()
        .filter_map(|(_, item)| item.buy_now_price)
        .sum())
}

// ============================================================================
// Commands
// ============================================================================

/// Bid `amount` on `item`.
///
/// The item is read under [`LockMode::OptimisticForceIncrement`] so that its
/// version moves when this unit-of-work commits. Any other bidder that read
/// the same item version loses at commit.
///
/// # Errors
/// [`Error::InvariantViolation`] if `amount` does not beat the highest bid.
pub fn place_bid<S>(uow: &mut UnitOfWork<S>, item: RecordId, amount: Money) -> Result<RecordId>
where
    S: VersionedStorage,
{
    load::<Item, S>(uow, item, LockMode::OptimisticForceIncrement)?;
    let highest = highest_bid(uow, item)?;
    stage_bid(uow, item, amount, highest.as_ref())
}

/// Bid `increment` above the highest bid on `item` and return the amount.
///
/// Like [`place_bid`], but the amount is derived from the same highest-bid
/// read that validates it, so a bid committed by someone else in between can
/// only surface as a conflict at commit, never as a too-low amount.
pub fn outbid<S>(
    uow: &mut UnitOfWork<S>,
    item: RecordId,
    increment: Money,
) -> Result<(RecordId, Money)>
where
    S: VersionedStorage,
{
    load::<Item, S>(uow, item, LockMode::OptimisticForceIncrement)?;
    let highest = highest_bid(uow, item)?;
    let amount = highest.as_ref().map_or(Money::ZERO, |b| b.amount) + increment;
    let id = stage_bid(uow, item, amount, highest.as_ref())?;
    Ok((id, amount))
}

fn stage_bid<S>(
    uow: &mut UnitOfWork<S>,
    item: RecordId,
    amount: Money,
    highest: Option<&Bid>,
) -> Result<RecordId>
where
    S: VersionedStorage,
{
    let bid = Bid::new(amount, item, highest)?;
    let id = insert(uow, &bid)?;
    tracing::debug!(uow_id = uow.id(), record_id = %item, amount = %amount, "bid staged");
    Ok(id)
}

/// Move `item` into `category`.
pub fn move_item<S>(uow: &mut UnitOfWork<S>, item: RecordId, category: RecordId) -> Result<()>
where
    S: VersionedStorage,
{
    load::<Category, S>(uow, category, LockMode::None)?;
    let moved = load::<Item, S>(uow, item, LockMode::None)?.in_category(category);
    save(uow, item, &moved)
}

/// Rename `item`.
pub fn rename_item<S>(uow: &mut UnitOfWork<S>, item: RecordId, name: &str) -> Result<()>
where
    S: VersionedStorage,
{
    let mut renamed = load::<Item, S>(uow, item, LockMode::None)?;
    renamed.name = name.to_string();
    save(uow, item, &renamed)
}
