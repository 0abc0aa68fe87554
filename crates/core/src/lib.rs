//! Core types for Occam
//!
//! This crate defines the vocabulary shared by every layer of the optimistic
//! concurrency stack:
//! - [`RecordId`], [`Version`], [`Table`]: record identity and versioning
//! - [`Record`] and [`Value`]: the stored state of a record
//! - [`WriteSet`] and [`ExpectedVersions`]: what a commit wants to change and
//!   what it expects the live store to look like
//! - [`detect_conflict`]: the pure commit-time conflict detector
//! - [`VersionedStorage`]: the contract a store offers to units-of-work

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod record;
pub mod traits;
pub mod types;
pub mod validation;
pub mod value;
pub mod write;

pub use error::{Error, Result};
pub use record::Record;
pub use traits::VersionedStorage;
pub use types::{RecordId, Table, Version};
pub use validation::{detect_conflict, Conflict, ConflictType, ValidationResult};
pub use value::Value;
pub use write::{AppliedCommit, Expectation, ExpectedVersions, WriteOp, WriteSet};
