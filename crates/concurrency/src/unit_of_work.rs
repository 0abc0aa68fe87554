//! Unit-of-work for optimistic concurrency control
//!
//! A [`UnitOfWork`] is one logical transaction. It reads committed records
//! through an injected store, remembers the version it saw for each one (a
//! [`ReadTicket`]), accumulates explicitly staged writes, and on commit hands
//! both to the store's `try_apply` in a single call.
//!
//! ## Lifecycle
//!
//! ```text
//! Active ──commit()──> Committing ──> Committed
//!    │                     │
//!    │                     └──conflict / store error──> RolledBack
//!    └──rollback()──────────────────────────────────> RolledBack
//! ```
//!
//! Terminal states are final. No method re-enters `Active`.
//!
//! ## What gets validated
//!
//! - tickets read under `Optimistic`: version verified
//! - tickets read under `OptimisticForceIncrement`: version verified and
//!   bumped, even if nothing was staged for the record
//! - every staged id: version verified against its ticket, or expected absent
//!   for records this unit-of-work inserted
//!
//! Records read under `None` and never staged are not validated at all.

use crate::lock::{LockMode, ReadSet, ReadTicket};
use crate::metrics::UnitOfWorkMetrics;
use occam_core::{
    AppliedCommit, Error, ExpectedVersions, Record, RecordId, Result, Table, Value,
    VersionedStorage, WriteOp, WriteSet,
};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Status of a unit-of-work in its lifecycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UnitOfWorkStatus {
    /// Reads and staging allowed
    Active,
    /// Handing the batch to the store
    Committing,
    /// Batch applied
    Committed,
    /// Discarded, by request or because commit failed
    RolledBack {
        /// Human-readable reason
        reason: String,
    },
}

/// Summary of what a commit would send to the store
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingWrites {
    /// Staged puts (updates and inserts)
    pub puts: usize,
    /// Staged deletes
    pub deletes: usize,
    /// Records bumped without a staged write
    pub forced_increments: usize,
}

impl PendingWrites {
    /// Check if a commit would change nothing
    pub fn is_empty(&self) -> bool {
        self.puts == 0 && self.deletes == 0 && self.forced_increments == 0
    }
}

/// One logical transaction over a [`VersionedStorage`]
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use occam_concurrency::{LockMode, UnitOfWork};
/// use occam_core::{Table, Value};
/// use occam_storage::VersionedStore;
///
/// let store = Arc::new(VersionedStore::new());
/// let item = store.create(Table::new("item"), Value::from("Some Item"));
///
/// let mut uow = UnitOfWork::new(1, Arc::clone(&store));
/// uow.read(item.id, LockMode::None).unwrap();
/// uow.stage(item.id, Value::from("New Name")).unwrap();
/// uow.commit().unwrap();
///
/// assert_eq!(store.get(item.id).unwrap().value, Value::from("New Name"));
/// ```
pub struct UnitOfWork<S: VersionedStorage> {
    id: u64,
    store: Arc<S>,
    reads: ReadSet,
    writes: WriteSet,
    /// Records inserted by this unit-of-work, expected absent at commit
    created: BTreeMap<RecordId, Table>,
    status: UnitOfWorkStatus,
    metrics: Arc<UnitOfWorkMetrics>,
}

impl<S: VersionedStorage> UnitOfWork<S> {
    /// Begin a unit-of-work over `store` with private metrics
    pub fn new(id: u64, store: Arc<S>) -> Self {
        Self::with_metrics(id, store, Arc::new(UnitOfWorkMetrics::new()))
    }

    pub(crate) fn with_metrics(id: u64, store: Arc<S>, metrics: Arc<UnitOfWorkMetrics>) -> Self {
        metrics.record_begin();
        tracing::trace!(uow_id = id, "unit of work begun");
        Self {
            id,
            store,
            reads: ReadSet::new(),
            writes: WriteSet::new(),
            created: BTreeMap::new(),
            status: UnitOfWorkStatus::Active,
            metrics,
        }
    }

    // ========================================================================
    // Introspection
    // ========================================================================

    /// Identifier assigned at begin
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Current status
    pub fn status(&self) -> &UnitOfWorkStatus {
        &self.status
    }

    /// Check if reads and staging are still allowed
    pub fn is_active(&self) -> bool {
        matches!(self.status, UnitOfWorkStatus::Active)
    }

    /// Check if the batch was applied
    pub fn is_committed(&self) -> bool {
        matches!(self.status, UnitOfWorkStatus::Committed)
    }

    /// Check if this unit-of-work was discarded
    pub fn is_rolled_back(&self) -> bool {
        matches!(self.status, UnitOfWorkStatus::RolledBack { .. })
    }

    /// Check if nothing has been staged
    pub fn is_read_only(&self) -> bool {
        self.writes.is_empty()
    }

    /// Number of records read
    pub fn read_count(&self) -> usize {
        self.reads.len()
    }

    /// Number of staged writes
    pub fn write_count(&self) -> usize {
        self.writes.len()
    }

    /// The ticket captured for `id`, if it was read
    pub fn ticket(&self, id: RecordId) -> Option<&ReadTicket> {
        self.reads.get(id)
    }

    /// The store this unit-of-work reads from and commits to
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// What a commit would send to the store right now
    pub fn pending_writes(&self) -> PendingWrites {
        let mut pending = PendingWrites::default();
        for (_, op) in self.writes.iter() {
            match op {
                WriteOp::Put { .. } => pending.puts += 1,
                WriteOp::Delete => pending.deletes += 1,
            }
        }
        pending.forced_increments = self
            .reads
            .forced_increments()
            .into_iter()
            .filter(|id| !self.writes.contains(*id))
            .count();
        pending
    }

    fn ensure_active(&self) -> Result<()> {
        if self.is_active() {
            Ok(())
        } else {
            Err(Error::InvalidState(format!(
                "unit of work {} is not active: {:?}",
                self.id, self.status
            )))
        }
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Read a record's payload under `mode`
    ///
    /// See [`read_record`](Self::read_record).
    pub fn read(&mut self, id: RecordId, mode: LockMode) -> Result<Value> {
        self.read_record(id, mode).map(|r| r.value)
    }

    /// Read a record under `mode`
    ///
    /// The first read of an id captures its committed version. Later reads
    /// only strengthen the ticket's mode. A staged put is returned in place of
    /// the committed payload; a staged delete reads as [`Error::NotFound`].
    ///
    /// The returned record is a copy. Changing it has no effect until it is
    /// passed to [`stage`](Self::stage).
    pub fn read_record(&mut self, id: RecordId, mode: LockMode) -> Result<Record> {
        self.ensure_active()?;

        match self.writes.get(id) {
            Some(WriteOp::Delete) => Err(Error::NotFound(id)),
            Some(WriteOp::Put { table, value }) => {
                if self.created.contains_key(&id) {
                    return Ok(Record::new(id, table.clone(), value.clone()));
                }
                self.reads.escalate(id, mode)?;
                let version = self.reads.get(id).map(|t| t.version).unwrap_or_default();
                let mut record = Record::new(id, table.clone(), value.clone());
                record.version = version;
                Ok(record)
            }
            None => {
                let record = self.store.get(id)?;
                self.reads
                    .record(id, record.table.clone(), record.version, mode);
                tracing::trace!(
                    uow_id = self.id,
                    record_id = %id,
                    version = %record.version,
                    mode = %mode,
                    "record read"
                );
                Ok(record)
            }
        }
    }

    /// Query records as this unit-of-work sees them and read every match
    /// under `mode`
    ///
    /// The predicate runs against the effective payload: a staged put
    /// replaces the committed one, a staged delete drops the record, and
    /// records inserted by this unit-of-work are included (without a ticket,
    /// they are expected absent at commit). Matches are returned in id order.
    pub fn query<F>(&mut self, predicate: F, mode: LockMode) -> Result<Vec<Record>>
    where
        F: Fn(&Record) -> bool,
    {
        self.ensure_active()?;

        // Staged ids are fetched whatever their committed payload looks like;
        // the predicate is re-run below on what this unit-of-work would commit
        let writes = &self.writes;
        let committed = self
            .store
            .query(&|r: &Record| writes.contains(r.id) || predicate(r))?;

        let mut results = Vec::with_capacity(committed.len());
        for mut record in committed {
            match self.writes.get(record.id) {
                Some(WriteOp::Delete) => continue,
                Some(WriteOp::Put { value, .. }) => {
                    record.value = value.clone();
                    if !predicate(&record) {
                        continue;
                    }
                    if let Some(ticket) = self.reads.get(record.id) {
                        record.version = ticket.version;
                    }
                }
                None => {}
            }
            self.reads
                .record(record.id, record.table.clone(), record.version, mode);
            results.push(record);
        }

        for (id, table) in &self.created {
            if let Some(WriteOp::Put { value, .. }) = self.writes.get(*id) {
                let record = Record::new(*id, table.clone(), value.clone());
                if predicate(&record) {
                    results.push(record);
                }
            }
        }
        results.sort_by_key(|r| r.id);

        tracing::trace!(
            uow_id = self.id,
            matched = results.len(),
            mode = %mode,
            "query read"
        );
        Ok(results)
    }

    /// Query every record of `table` under `mode`
    pub fn query_table(&mut self, table: &str, mode: LockMode) -> Result<Vec<Record>> {
        self.query(|r| r.is_in(table), mode)
    }

    /// Strengthen the lock mode of a record already read
    ///
    /// # Errors
    /// [`Error::NotRead`] if `id` was never read.
    pub fn lock(&mut self, id: RecordId, mode: LockMode) -> Result<()> {
        self.ensure_active()?;
        if self.created.contains_key(&id) {
            return Ok(());
        }
        self.reads.escalate(id, mode)
    }

    // ========================================================================
    // Staging
    // ========================================================================

    /// Stage a new payload for `id`
    ///
    /// # Errors
    /// [`Error::NotRead`] unless `id` was read or inserted by this
    /// unit-of-work.
    pub fn stage(&mut self, id: RecordId, value: Value) -> Result<()> {
        self.ensure_active()?;

        let table = match self.created.get(&id) {
            Some(table) => table.clone(),
            None => self.reads.get(id).ok_or(Error::NotRead(id))?.table.clone(),
        };
        self.writes.put(id, table, value);
        tracing::trace!(uow_id = self.id, record_id = %id, "write staged");
        Ok(())
    }

    /// Stage removal of `id`
    ///
    /// Removing a record inserted by this unit-of-work simply unstages it.
    ///
    /// # Errors
    /// [`Error::NotRead`] unless `id` was read or inserted by this
    /// unit-of-work.
    pub fn stage_delete(&mut self, id: RecordId) -> Result<()> {
        self.ensure_active()?;

        if self.created.remove(&id).is_some() {
            self.writes.remove(id);
            return Ok(());
        }
        if !self.reads.contains(id) {
            return Err(Error::NotRead(id));
        }
        self.writes.delete(id);
        tracing::trace!(uow_id = self.id, record_id = %id, "delete staged");
        Ok(())
    }

    /// Stage a new record and return its id
    ///
    /// The id is reserved from the store now; the record becomes visible only
    /// when this unit-of-work commits, at version 0.
    pub fn insert(&mut self, table: impl Into<Table>, value: Value) -> Result<RecordId> {
        self.ensure_active()?;

        let table = table.into();
        let id = self.store.allocate_id()?;
        self.created.insert(id, table.clone());
        self.writes.put(id, table, value);
        tracing::trace!(uow_id = self.id, record_id = %id, "insert staged");
        Ok(id)
    }

    // ========================================================================
    // Commit / rollback
    // ========================================================================

    /// Expectations a commit would hand to the store
    pub fn expected_versions(&self) -> ExpectedVersions {
        let mut expected = self.reads.expected_versions();
        for id in self.writes.ids() {
            if self.created.contains_key(&id) {
                expected.expect_absent(id);
            } else if !expected.contains(id) {
                if let Some(ticket) = self.reads.get(id) {
                    expected.verify_version(id, ticket.version);
                }
            }
        }
        expected
    }

    /// Validate and apply this unit-of-work
    ///
    /// A unit-of-work with nothing to validate and nothing to apply commits
    /// without touching the store and reports `commit_seq == 0`.
    ///
    /// # Errors
    /// - [`Error::ConcurrencyConflict`] naming the first record whose version
    ///   moved; the unit-of-work is rolled back
    /// - any other store error, unchanged; the unit-of-work is rolled back
    /// - [`Error::InvalidState`] if not active
    pub fn commit(&mut self) -> Result<AppliedCommit> {
        self.ensure_active()?;
        self.status = UnitOfWorkStatus::Committing;

        let expected = self.expected_versions();
        if expected.is_empty() && self.writes.is_empty() {
            self.status = UnitOfWorkStatus::Committed;
            self.metrics.record_commit();
            tracing::trace!(uow_id = self.id, "empty unit of work committed");
            return Ok(AppliedCommit::default());
        }

        match self.store.try_apply(&self.writes, &expected) {
            Ok(applied) => {
                self.status = UnitOfWorkStatus::Committed;
                self.metrics.record_commit();
                tracing::debug!(
                    uow_id = self.id,
                    commit_seq = applied.commit_seq,
                    writes = self.writes.len(),
                    checked = expected.len(),
                    "unit of work committed"
                );
                Ok(applied)
            }
            Err(Error::VersionConflict(conflict)) => {
                tracing::debug!(
                    uow_id = self.id,
                    record_id = %conflict.record_id,
                    "unit of work lost a concurrency conflict"
                );
                self.finish_rollback(format!("concurrency conflict: {}", conflict), true);
                Err(Error::ConcurrencyConflict(conflict))
            }
            Err(e) => {
                tracing::error!(
                    uow_id = self.id,
                    error = %e,
                    "store failed during commit"
                );
                self.finish_rollback(format!("commit failed: {}", e), false);
                Err(e)
            }
        }
    }

    /// Discard every ticket and staged write
    ///
    /// Performs no store interaction.
    ///
    /// # Errors
    /// [`Error::InvalidState`] if already committed or rolled back.
    pub fn rollback(&mut self) -> Result<()> {
        self.ensure_active()?;
        self.finish_rollback("rolled back by caller".to_string(), false);
        tracing::trace!(uow_id = self.id, "unit of work rolled back");
        Ok(())
    }

    fn finish_rollback(&mut self, reason: String, conflict: bool) {
        self.status = UnitOfWorkStatus::RolledBack { reason };
        self.reads.clear();
        self.writes.clear();
        self.created.clear();
        self.metrics.record_rollback(conflict);
    }
}

impl<S: VersionedStorage> Drop for UnitOfWork<S> {
    fn drop(&mut self) {
        if self.is_active() && !self.writes.is_empty() {
            tracing::trace!(
                uow_id = self.id,
                writes = self.writes.len(),
                "active unit of work dropped, staged writes discarded"
            );
        }
    }
}

impl<S: VersionedStorage> std::fmt::Debug for UnitOfWork<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("id", &self.id)
            .field("status", &self.status)
            .field("reads", &self.reads.len())
            .field("writes", &self.writes.len())
            .field("created", &self.created.len())
            .finish()
    }
}
