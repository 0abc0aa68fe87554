//! Unified error types for Occam.
//!
//! This module provides a clean error type that wraps the errors raised by
//! the store and units-of-work and presents a stable interface to callers.
//! Conflicts are kept apart from every other failure so callers can decide
//! whether to retry.

use occam_core::RecordId;
use thiserror::Error;

/// All Occam errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Record not found
    #[error("not found: {0}")]
    NotFound(String),

    /// A commit lost a race; retry with fresh reads
    #[error("concurrency conflict on record {record_id}")]
    ConcurrencyConflict {
        /// First record whose version moved
        record_id: RecordId,
    },

    /// A domain invariant rejected a change
    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    /// Misuse of the API (unread record, finished unit-of-work, bad payload)
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The store cannot serve the request
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// Configuration could not be loaded or is invalid
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal error (bug or invariant violation)
    #[error("internal error: {0}")]
    Internal(String),
}

/// Result type for Occam operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Check if this error is retryable.
    ///
    /// Only concurrency conflicts are: the same work may succeed against
    /// fresh reads.
    pub fn is_retryable(&self) -> bool {
        self.is_conflict()
    }

    /// Check if this is a conflict error.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::ConcurrencyConflict { .. })
    }

    /// Check if this is a not-found error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_))
    }

    /// The record a conflict names, if this is a conflict.
    pub fn conflicting_record(&self) -> Option<RecordId> {
        match self {
            Error::ConcurrencyConflict { record_id } => Some(*record_id),
            _ => None,
        }
    }
}

// Convert from internal core errors
impl From<occam_core::Error> for Error {
    fn from(e: occam_core::Error) -> Self {
        use occam_core::Error as CoreError;
        match e {
            CoreError::NotFound(id) => Error::NotFound(format!("record {}", id)),
            CoreError::VersionConflict(c) | CoreError::ConcurrencyConflict(c) => {
                Error::ConcurrencyConflict {
                    record_id: c.record_id,
                }
            }
            CoreError::NotRead(id) => {
                Error::InvalidInput(format!("record {} was not read in this unit of work", id))
            }
            CoreError::InvalidState(msg) => Error::InvalidInput(msg),
            e @ CoreError::WrongType { .. } => Error::InvalidInput(e.to_string()),
            CoreError::InvariantViolation(msg) => Error::InvariantViolation(msg),
            CoreError::Unavailable(msg) => Error::Unavailable(msg),
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(e: toml::de::Error) -> Self {
        Error::Config(e.to_string())
    }
}
