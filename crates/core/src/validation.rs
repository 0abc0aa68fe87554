//! Commit-time conflict detection
//!
//! [`detect_conflict`] compares a committer's [`ExpectedVersions`] against the
//! live version of each record and reports the first mismatch in id order.
//!
//! The detector is pure. It is only meaningful when the store evaluates it and
//! applies the batch inside the same critical section, otherwise a concurrent
//! batch could slip in between the check and the apply.

use crate::types::{RecordId, Version};
use crate::write::{Expectation, ExpectedVersions};

/// Why an expectation failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictType {
    /// The record exists but at a different version than observed
    VersionChanged,
    /// The record was observed but no longer exists
    Deleted,
    /// The record was expected to be new but already exists
    AlreadyExists,
}

/// A failed expectation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Conflict {
    /// The record whose live state did not match
    pub record_id: RecordId,
    /// What the committer expected
    pub expected: Expectation,
    /// What the store holds (`None` when the record does not exist)
    pub actual: Option<Version>,
    /// Classification of the mismatch
    pub kind: ConflictType,
}

impl std::fmt::Display for Conflict {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.actual {
            Some(actual) => write!(
                f,
                "record {} expected {}, found {}",
                self.record_id, self.expected, actual
            ),
            None => write!(
                f,
                "record {} expected {}, found nothing",
                self.record_id, self.expected
            ),
        }
    }
}

/// Result of running the detector
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationResult {
    /// Every expectation holds
    Valid,
    /// The first expectation (in id order) that does not hold
    Conflict(Conflict),
}

impl ValidationResult {
    /// Check whether every expectation holds
    pub fn is_valid(&self) -> bool {
        matches!(self, ValidationResult::Valid)
    }

    /// Get the conflict, if any
    pub fn conflict(&self) -> Option<&Conflict> {
        match self {
            ValidationResult::Valid => None,
            ValidationResult::Conflict(c) => Some(c),
        }
    }
}

/// Check one expectation against the live version of its record
pub fn check_expectation(
    record_id: RecordId,
    expected: Expectation,
    actual: Option<Version>,
) -> Option<Conflict> {
    let kind = match (expected, actual) {
        (Expectation::Version(e), Some(a)) if e == a => return None,
        (Expectation::Absent, None) => return None,
        (Expectation::Version(_), Some(_)) => ConflictType::VersionChanged,
        (Expectation::Version(_), None) => ConflictType::Deleted,
        (Expectation::Absent, Some(_)) => ConflictType::AlreadyExists,
    };
    Some(Conflict {
        record_id,
        expected,
        actual,
        kind,
    })
}

/// Find the first expectation that the live state violates
///
/// `live_version_of` returns the current committed version of a record, or
/// `None` if it does not exist.
pub fn detect_conflict<F>(expected: &ExpectedVersions, live_version_of: F) -> ValidationResult
where
    F: Fn(RecordId) -> Option<Version>,
{
    for (id, expectation) in expected.iter() {
        if let Some(conflict) = check_expectation(id, expectation, live_version_of(id)) {
            return ValidationResult::Conflict(conflict);
        }
    }
    ValidationResult::Valid
}
