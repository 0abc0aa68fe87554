//! Identity and versioning types
//!
//! This module defines the fundamental types used throughout the system:
//! - [`RecordId`]: Store-assigned identifier of a record
//! - [`Version`]: Per-record optimistic version counter
//! - [`Table`]: Name of the record family a record belongs to

use serde::{Deserialize, Serialize};

/// Identifier of a stored record
///
/// RecordIds are handed out by the store, start at 1 and are never reused
/// while the store lives, even after the record they named is deleted.
///
/// # Examples
///
/// ```
/// use occam_core::types::RecordId;
///
/// let id = RecordId::new(7);
/// assert_eq!(id.as_u64(), 7);
/// assert_eq!(id.to_string(), "#7");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RecordId(u64);

impl RecordId {
    /// Wrap a raw id
    pub const fn new(raw: u64) -> Self {
        RecordId(raw)
    }

    /// Get the raw id
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for RecordId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

impl From<u64> for RecordId {
    fn from(raw: u64) -> Self {
        RecordId(raw)
    }
}

/// Optimistic version of a record
///
/// A freshly created record is at [`Version::INITIAL`]. Every successful
/// commit that touches the record (payload change or forced increment) moves
/// it to [`Version::next`], exactly once per commit.
///
/// # Examples
///
/// ```
/// use occam_core::types::Version;
///
/// let v = Version::INITIAL;
/// assert_eq!(v.next(), Version::new(1));
/// assert!(v < v.next());
/// ```
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct Version(u64);

impl Version {
    /// Version of a record that has never been modified since creation
    pub const INITIAL: Version = Version(0);

    /// Wrap a raw version counter
    pub const fn new(raw: u64) -> Self {
        Version(raw)
    }

    /// The version a record moves to after one more successful commit
    #[inline]
    pub const fn next(&self) -> Self {
        Version(self.0 + 1)
    }

    /// Get the raw counter
    pub const fn as_u64(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for Version {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "v{}", self.0)
    }
}

/// Name of a record family (`item`, `category`, `bid`, ...)
///
/// Tables carry no schema; they only let queries narrow the records they
/// look at.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Table(String);

impl Table {
    /// Create a table name
    pub fn new(name: impl Into<String>) -> Self {
        Table(name.into())
    }

    /// Get the table name
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Table {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Table {
    fn from(name: &str) -> Self {
        Table(name.to_string())
    }
}

impl From<String> for Table {
    fn from(name: String) -> Self {
        Table(name)
    }
}

impl PartialEq<str> for Table {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for Table {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
