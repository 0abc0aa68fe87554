//! Main database entry point for Occam.
//!
//! This module provides the `Occam` struct, which owns one versioned store and
//! hands out units-of-work over it.

use crate::config::{OccamConfig, RetryPolicy};
use crate::error::{Error, Result};
use crate::logging;
use occam_concurrency::{UnitOfWork, UnitOfWorkManager, UnitOfWorkStatus};
use occam_core::{Record, RecordId, Table, Value};
use occam_storage::VersionedStore;
use std::sync::Arc;

/// The Occam database.
///
/// Create one with [`Occam::open`], [`Occam::from_config`] or
/// [`Occam::builder`]. Every handle owns its own store; there is no
/// process-wide instance.
///
/// # Example
///
/// ```
/// use occamdb::prelude::*;
///
/// let db = Occam::open()?;
/// let item = db.create("item", Value::from("Some Item"));
///
/// db.transaction(|uow| {
///     uow.read(item.id, LockMode::Optimistic)?;
///     uow.stage(item.id, Value::from("New Name"))?;
///     Ok(())
/// })?;
///
/// assert_eq!(db.get(item.id)?.version, Version::new(1));
/// # Ok::<(), occamdb::Error>(())
/// ```
pub struct Occam {
    manager: UnitOfWorkManager<VersionedStore>,
    config: OccamConfig,
}

impl Occam {
    /// Open a database with default settings.
    pub fn open() -> Result<Self> {
        Self::builder().open()
    }

    /// Open a database from a validated configuration.
    pub fn from_config(config: OccamConfig) -> Result<Self> {
        config.validate()?;
        let store = Arc::new(VersionedStore::from_config(&config.store));
        tracing::info!(
            initial_capacity = config.store.initial_capacity,
            max_attempts = config.retry.max_attempts,
            "database opened"
        );
        Ok(Self {
            manager: UnitOfWorkManager::new(store),
            config,
        })
    }

    /// Create a builder for database configuration.
    pub fn builder() -> OccamBuilder {
        OccamBuilder::new()
    }

    /// The configuration this database was opened with.
    pub fn config(&self) -> &OccamConfig {
        &self.config
    }

    /// The underlying store.
    pub fn store(&self) -> &Arc<VersionedStore> {
        self.manager.store()
    }

    /// Begin a unit-of-work.
    pub fn begin(&self) -> UnitOfWork<VersionedStore> {
        self.manager.begin()
    }

    // ========================================================================
    // Application-owned lifecycle
    // ========================================================================

    /// Create a record at version 0, outside any unit-of-work.
    pub fn create(&self, table: impl Into<Table>, value: Value) -> Record {
        self.store().create(table.into(), value)
    }

    /// Get the committed state of a record.
    pub fn get(&self, id: RecordId) -> Result<Record> {
        self.store()
            .get(id)
            .ok_or_else(|| Error::NotFound(format!("record {}", id)))
    }

    /// Remove a record unconditionally, outside any unit-of-work.
    pub fn delete(&self, id: RecordId) -> Option<Record> {
        self.store().delete(id)
    }

    // ========================================================================
    // Transactions
    // ========================================================================

    /// Run `f` in a fresh unit-of-work and commit it.
    ///
    /// If `f` fails the unit-of-work is rolled back and the error returned.
    /// A concurrency conflict at commit is returned as is; nothing is retried.
    /// If `f` commits the unit-of-work itself its value is returned; if it
    /// rolls it back, the call fails with [`Error::InvalidInput`].
    pub fn transaction<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&mut UnitOfWork<VersionedStore>) -> Result<T>,
    {
        let mut uow = self.begin();
        match f(&mut uow) {
            Ok(value) => {
                match uow.status() {
                    UnitOfWorkStatus::Active => {
                        uow.commit()?;
                    }
                    UnitOfWorkStatus::RolledBack { reason } => {
                        return Err(Error::InvalidInput(format!(
                            "unit of work {} rolled back inside transaction: {}",
                            uow.id(),
                            reason
                        )));
                    }
                    UnitOfWorkStatus::Committing | UnitOfWorkStatus::Committed => {}
                }
                Ok(value)
            }
            Err(e) => {
                if uow.is_active() {
                    let _ = uow.rollback();
                }
                Err(e)
            }
        }
    }

    /// Like [`transaction`](Self::transaction), retrying on conflict with the
    /// configured [`RetryPolicy`].
    ///
    /// Each attempt runs `f` against a new unit-of-work, so every read is
    /// fresh. Errors other than [`Error::ConcurrencyConflict`] are returned
    /// immediately.
    pub fn transaction_with_retry<F, T>(&self, f: F) -> Result<T>
    where
        F: FnMut(&mut UnitOfWork<VersionedStore>) -> Result<T>,
    {
        self.transaction_with_policy(self.config.retry, f)
    }

    /// Like [`transaction_with_retry`](Self::transaction_with_retry) with an
    /// explicit policy.
    pub fn transaction_with_policy<F, T>(&self, policy: RetryPolicy, mut f: F) -> Result<T>
    where
        F: FnMut(&mut UnitOfWork<VersionedStore>) -> Result<T>,
    {
        let attempts = policy.max_attempts.max(1);
        let mut attempt = 0;
        loop {
            match self.transaction(&mut f) {
                Err(e) if e.is_retryable() && attempt + 1 < attempts => {
                    tracing::debug!(attempt, error = %e, "retrying after conflict");
                    let delay = policy.delay(attempt);
                    if !delay.is_zero() {
                        std::thread::sleep(delay);
                    }
                    attempt += 1;
                }
                result => return result,
            }
        }
    }

    /// Get database metrics.
    pub fn metrics(&self) -> DatabaseMetrics {
        let m = self.manager.metrics();
        DatabaseMetrics {
            units_begun: m.begun,
            units_committed: m.committed,
            units_rolled_back: m.rolled_back,
            conflicts: m.conflicts,
            commit_rate: m.commit_rate(),
            store_commits: self.store().commit_count(),
            records: self.store().len(),
        }
    }
}

impl std::fmt::Debug for Occam {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Occam")
            .field("store", self.store())
            .field("config", &self.config)
            .finish()
    }
}

/// Database metrics.
#[derive(Debug, Clone)]
pub struct DatabaseMetrics {
    /// Units-of-work handed out
    pub units_begun: u64,
    /// Units-of-work committed
    pub units_committed: u64,
    /// Units-of-work rolled back (explicitly or by a failed commit)
    pub units_rolled_back: u64,
    /// Rollbacks caused by a concurrency conflict
    pub conflicts: u64,
    /// Commit success rate (0.0 - 1.0)
    pub commit_rate: f64,
    /// Batches applied by the store
    pub store_commits: u64,
    /// Records currently stored
    pub records: usize,
}

/// Builder for database configuration.
///
/// # Example
///
/// ```
/// use occamdb::{Occam, RetryPolicy};
///
/// let db = Occam::builder()
///     .initial_capacity(64)
///     .retry_policy(RetryPolicy::default().with_max_attempts(5))
///     .open()?;
/// assert_eq!(db.config().retry.max_attempts, 5);
/// # Ok::<(), occamdb::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct OccamBuilder {
    config: OccamConfig,
    init_logging: bool,
}

impl OccamBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an existing configuration.
    pub fn config(mut self, config: OccamConfig) -> Self {
        self.config = config;
        self
    }

    /// Number of records to pre-allocate room for.
    pub fn initial_capacity(mut self, capacity: usize) -> Self {
        self.config.store.initial_capacity = capacity;
        self
    }

    /// Retry policy for `transaction_with_retry`.
    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.config.retry = policy;
        self
    }

    /// Tracing filter used when logging is initialized.
    pub fn log_filter(mut self, filter: impl Into<String>) -> Self {
        self.config.log.filter = filter.into();
        self
    }

    /// Install the fmt subscriber on open (see [`logging::init`]).
    pub fn with_logging(mut self) -> Self {
        self.init_logging = true;
        self
    }

    /// Open the database.
    pub fn open(self) -> Result<Occam> {
        if self.init_logging {
            logging::init(&self.config.log.filter);
        }
        Occam::from_config(self.config)
    }
}
