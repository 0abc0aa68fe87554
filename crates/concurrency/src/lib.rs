//! Concurrency layer for Occam
//!
//! This crate implements the application-facing side of optimistic
//! concurrency control:
//! - [`LockMode`]: per-read policy (unchecked, checked, checked and bumped)
//! - [`ReadSet`]: the tickets a unit-of-work captured while reading
//! - [`UnitOfWork`]: one logical transaction over an injected store
//! - [`UnitOfWorkManager`]: hands out units-of-work and aggregates metrics
//!
//! Nothing here takes a lock across a unit-of-work. The only serialization
//! point is the store's `try_apply`.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod lock;
pub mod manager;
pub mod metrics;
pub mod unit_of_work;

pub use lock::{LockMode, ReadSet, ReadTicket};
pub use manager::UnitOfWorkManager;
pub use metrics::{MetricsSnapshot, UnitOfWorkMetrics};
pub use unit_of_work::{PendingWrites, UnitOfWork, UnitOfWorkStatus};
