//! Error types for the OCC core
//!
//! Conflicts come in two flavours that callers must not confuse with store
//! failures:
//! - [`Error::VersionConflict`]: a store rejected a batch in `try_apply`
//! - [`Error::ConcurrencyConflict`]: a unit-of-work failed to commit
//!
//! [`Error::Unavailable`] is a fatal store failure and is never retryable in
//! the OCC sense.

use crate::types::RecordId;
use crate::validation::Conflict;
use thiserror::Error;

/// Result type for core operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by stores and units-of-work
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The requested record does not exist
    #[error("record not found: {0}")]
    NotFound(RecordId),

    /// A store refused a batch because an expectation failed
    #[error("version conflict: {0}")]
    VersionConflict(Conflict),

    /// A unit-of-work could not commit because a record changed underneath it
    #[error("concurrency conflict on {}: {0}", .0.record_id)]
    ConcurrencyConflict(Conflict),

    /// A write was staged for a record this unit-of-work never read
    #[error("record {0} was not read in this unit of work")]
    NotRead(RecordId),

    /// The unit-of-work is not in a state that allows the operation
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// A payload field does not have the expected shape
    #[error("wrong type for field '{field}': expected {expected}, got {actual}")]
    WrongType {
        /// Field name
        field: String,
        /// Expected type name
        expected: &'static str,
        /// Actual type name
        actual: &'static str,
    },

    /// A domain invariant rejected a change before it was staged
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// The store cannot serve the request
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl Error {
    /// Check if this error is a version or concurrency conflict
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Error::VersionConflict(_) | Error::ConcurrencyConflict(_)
        )
    }

    /// Check if retrying with fresh reads may succeed
    pub fn is_retryable(&self) -> bool {
        self.is_conflict()
    }

    /// Check if this is a not-found error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// The record a conflict names, if this is a conflict
    pub fn conflicting_record(&self) -> Option<RecordId> {
        match self {
            Error::VersionConflict(c) | Error::ConcurrencyConflict(c) => Some(c.record_id),
            _ => None,
        }
    }
}
