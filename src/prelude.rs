//! Convenient imports for Occam.
//!
//! ```
//! use occamdb::prelude::*;
//!
//! let db = Occam::open()?;
//! let mut uow = db.begin();
//! assert!(uow.is_read_only());
//! uow.commit()?;
//! # Ok::<(), occamdb::Error>(())
//! ```

// Main entry point
pub use crate::database::{Occam, OccamBuilder};

// Error handling
pub use crate::error::{Error, Result};

// Configuration
pub use crate::config::{OccamConfig, RetryPolicy};

// Units of work
pub use occam_concurrency::{LockMode, UnitOfWork, UnitOfWorkStatus};

// Core types
pub use occam_core::{Record, RecordId, Table, Value, Version};
