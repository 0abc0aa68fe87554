//! Item categories.

use super::{string_field, Entity};
use crate::error::Result;
use occam_core::Value;

/// A named grouping of items.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Category {
    /// Display name
    pub name: String,
}

impl Category {
    /// Create a category
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }
}

impl Entity for Category {
    const TABLE: &'static str = "category";

    fn to_value(&self) -> Value {
        Value::object([("name", Value::from(self.name.as_str()))])
    }

    fn from_value(value: &Value) -> Result<Self> {
        Ok(Self {
            name: string_field(value, "name")?,
        })
    }
}
