//! Auction items.

use super::{optional_int_field, string_field, Entity, Money};
use crate::error::Result;
use occam_core::{RecordId, Value};

/// An item for sale.
///
/// Belongs to at most one category, referenced by id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// Display name
    pub name: String,
    /// Fixed price, if the item can be bought outright
    pub buy_now_price: Option<Money>,
    /// Owning category
    pub category: Option<RecordId>,
}

impl Item {
    /// Create an uncategorized item without a price
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            buy_now_price: None,
            category: None,
        }
    }

    /// Set the buy-now price
    pub fn with_price(mut self, price: Money) -> Self {
        self.buy_now_price = Some(price);
        self
    }

    /// Place the item in a category
    pub fn in_category(mut self, category: RecordId) -> Self {
        self.category = Some(category);
        self
    }
}

impl Entity for Item {
    const TABLE: &'static str = "item";

    fn to_value(&self) -> Value {
        Value::object([
            ("name", Value::from(self.name.as_str())),
            (
                "buy_now_price",
                Value::from(self.buy_now_price.map(|m| m.cents())),
            ),
            (
                "category",
                Value::from(self.category.map(|id| id.as_u64() as i64)),
            ),
        ])
    }

    fn from_value(value: &Value) -> Result<Self> {
        Ok(Self {
            name: string_field(value, "name")?,
            buy_now_price: optional_int_field(value, "buy_now_price")?.map(Money::from_cents),
            category: optional_int_field(value, "category")?.map(|id| RecordId::new(id as u64)),
        })
    }
}
