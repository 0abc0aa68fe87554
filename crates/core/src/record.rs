//! Stored records

use crate::types::{RecordId, Table, Version};
use crate::value::Value;
use chrono::Utc;
use serde::{Deserialize, Serialize};

/// A committed record as held by the store
///
/// Readers always receive records by value. Mutating a returned record has no
/// effect on the store; changes go through a unit-of-work's staged writes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Store-assigned identifier
    pub id: RecordId,
    /// Record family
    pub table: Table,
    /// Current optimistic version
    pub version: Version,
    /// Payload
    pub value: Value,
    /// Unix timestamp (seconds) of the last applied change
    pub updated_at: i64,
}

impl Record {
    /// Create a record at [`Version::INITIAL`]
    pub fn new(id: RecordId, table: Table, value: Value) -> Self {
        Self {
            id,
            table,
            version: Version::INITIAL,
            value,
            updated_at: Utc::now().timestamp(),
        }
    }

    /// Replace the payload and move to the next version
    pub fn apply_update(&mut self, value: Value) {
        self.value = value;
        self.bump();
    }

    /// Move to the next version without touching the payload
    pub fn bump(&mut self) {
        self.version = self.version.next();
        self.updated_at = Utc::now().timestamp();
    }

    /// Check whether this record belongs to `table`
    pub fn is_in(&self, table: &str) -> bool {
        self.table == table
    }
}
