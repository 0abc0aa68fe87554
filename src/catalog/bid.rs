//! Bids placed on items.

use super::{int_field, Entity, Money};
use crate::error::{Error, Result};
use occam_core::{RecordId, Value};

/// A bid on one item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bid {
    /// Offered amount
    pub amount: Money,
    /// Item bid on
    pub item: RecordId,
}

impl Bid {
    /// Create a bid that must beat `last_bid`.
    ///
    /// # Errors
    /// [`Error::InvariantViolation`] if `amount` does not exceed the last
    /// bid's amount.
    pub fn new(amount: Money, item: RecordId, last_bid: Option<&Bid>) -> Result<Self> {
        if let Some(last) = last_bid {
            if amount <= last.amount {
                return Err(Error::InvariantViolation(format!(
                    "bid amount {} too low, last bid was {}",
                    amount, last.amount
                )));
            }
        }
        Ok(Self::opening(amount, item))
    }

    /// Create a bid without checking earlier bids
    pub fn opening(amount: Money, item: RecordId) -> Self {
        Self { amount, item }
    }
}

impl Entity for Bid {
    const TABLE: &'static str = "bid";

    fn to_value(&self) -> Value {
        Value::object([
            ("amount", Value::Int(self.amount.cents())),
            ("item", Value::Int(self.item.as_u64() as i64)),
        ])
    }

    fn from_value(value: &Value) -> Result<Self> {
        Ok(Self {
            amount: Money::from_cents(int_field(value, "amount")?),
            item: RecordId::new(int_field(value, "item")? as u64),
        })
    }
}
