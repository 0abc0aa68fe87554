//! Storage layer for Occam
//!
//! This crate implements the versioned record store:
//! - VersionedStore: FxHashMap behind a parking_lot RwLock
//! - Monotonic record id allocation (ids are never reused)
//! - Per-record versions, bumped once per applied batch
//! - Atomic check-then-apply of commit batches (`try_apply`)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod store;

pub use store::{StoreConfig, VersionedStore};
