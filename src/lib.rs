//! # Occam
//!
//! Optimistic concurrency control over an in-memory versioned record store.
//!
//! Every record carries a version. A [`UnitOfWork`] reads records, remembers
//! the version it saw, stages writes explicitly, and commits them in one
//! atomic step that succeeds only if every version it depends on is still
//! current. The first unit-of-work to commit against a version wins; every
//! other one fails with [`Error::ConcurrencyConflict`] and the caller decides
//! whether to retry.
//!
//! ## Quick Start
//!
//! ```
//! use occamdb::prelude::*;
//!
//! let db = Occam::open()?;
//! let item = db.create("item", Value::from("Some Item"));
//!
//! let mut u1 = db.begin();
//! let mut u2 = db.begin();
//! u1.read(item.id, LockMode::None)?;
//! u2.read(item.id, LockMode::None)?;
//! u1.stage(item.id, Value::from("New Name"))?;
//! u2.stage(item.id, Value::from("Other Name"))?;
//!
//! u2.commit()?;
//! assert!(u1.commit().is_err());
//! assert_eq!(db.get(item.id)?.value, Value::from("Other Name"));
//! # Ok::<(), occamdb::Error>(())
//! ```
//!
//! ## Lock modes
//!
//! - [`LockMode::None`]: the read is not validated
//! - [`LockMode::Optimistic`]: the read is validated at commit, even if the
//!   record was never written
//! - [`LockMode::OptimisticForceIncrement`]: validated, and the record's
//!   version is bumped on commit so that others depending on it conflict

#![warn(missing_docs)]

mod config;
mod database;
mod error;

pub mod catalog;
pub mod logging;
pub mod prelude;

// Re-export main entry points
pub use config::{LogConfig, OccamConfig, RetryPolicy};
pub use database::{DatabaseMetrics, Occam, OccamBuilder};
pub use error::{Error, Result};

// Re-export the layers beneath
pub use occam_concurrency::{
    LockMode, MetricsSnapshot, PendingWrites, ReadTicket, UnitOfWork, UnitOfWorkManager,
    UnitOfWorkStatus,
};
pub use occam_core::{AppliedCommit, Record, RecordId, Table, Value, Version, VersionedStorage};
pub use occam_storage::{StoreConfig, VersionedStore};
