//! Versioned record store
//!
//! # Design
//!
//! - FxHashMap: O(1) lookups, fast non-crypto hash
//! - parking_lot RwLock: guards the record map; held exclusively only while
//!   a validated batch is written in
//! - commit lock: a Mutex serializing every mutation (`try_apply`, `create`,
//!   `delete`), separate from the map lock
//! - AtomicU64 id allocator: ids start at 1 and are never handed out twice
//!
//! # Atomicity
//!
//! `try_apply` holds the commit lock for the whole check-then-apply sequence,
//! so two racing batches that expect the same version can never both succeed.
//! The conflict detector runs under the shared map lock, so readers proceed
//! during validation. They only wait for the short exclusive section that
//! writes a validated batch in, and never see half a batch.

use occam_core::validation::{detect_conflict, ValidationResult};
use occam_core::{
    AppliedCommit, Error, Expectation, ExpectedVersions, Record, RecordId, Result, Table, Value,
    VersionedStorage, WriteOp, WriteSet,
};
use parking_lot::{Mutex, RwLock};
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Store tuning knobs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Number of records to pre-allocate room for
    pub initial_capacity: usize,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            initial_capacity: 1024,
        }
    }
}

/// In-memory versioned record store
///
/// # Thread Safety
///
/// All operations are thread-safe:
/// - get()/query(): shared map lock, never see a partial batch
/// - try_apply(): commit lock for validation and apply, exclusive map lock
///   only while applying
/// - create()/delete(): commit lock, then a brief exclusive map lock
/// - allocate_id(): lock-free
///
/// # Example
///
/// ```
/// use occam_storage::VersionedStore;
/// use occam_core::{Table, Value, Version};
///
/// let store = VersionedStore::new();
/// let record = store.create(Table::new("item"), Value::from("Some Item"));
/// assert_eq!(record.version, Version::INITIAL);
/// ```
pub struct VersionedStore {
    records: RwLock<FxHashMap<RecordId, Record>>,
    /// Serializes mutations; readers never take it
    commit_lock: Mutex<()>,
    /// Last id handed out (0 = none yet)
    last_id: AtomicU64,
    /// Number of batches applied by `try_apply`
    commits: AtomicU64,
}

impl VersionedStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::with_capacity(0)
    }

    /// Create a store with room for `capacity` records
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            records: RwLock::new(FxHashMap::with_capacity_and_hasher(
                capacity,
                Default::default(),
            )),
            commit_lock: Mutex::new(()),
            last_id: AtomicU64::new(0),
            commits: AtomicU64::new(0),
        }
    }

    /// Create a store from configuration
    pub fn from_config(config: &StoreConfig) -> Self {
        tracing::debug!(initial_capacity = config.initial_capacity, "creating versioned store");
        Self::with_capacity(config.initial_capacity)
    }

    /// Last record id handed out (0 if none)
    pub fn last_id(&self) -> u64 {
        self.last_id.load(Ordering::Acquire)
    }

    /// Number of batches successfully applied by `try_apply`
    pub fn commit_count(&self) -> u64 {
        self.commits.load(Ordering::Acquire)
    }

    /// Number of records currently stored
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    /// Check if the store holds no records
    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    #[inline]
    fn next_id(&self) -> RecordId {
        RecordId::new(self.last_id.fetch_add(1, Ordering::AcqRel) + 1)
    }

    // ========================================================================
    // Application-owned lifecycle
    // ========================================================================

    /// Create a record at version 0, outside any unit-of-work
    pub fn create(&self, table: Table, value: Value) -> Record {
        let id = self.next_id();
        let record = Record::new(id, table, value);
        let _commit_guard = self.commit_lock.lock();
        self.records.write().insert(id, record.clone());
        tracing::trace!(record_id = %id, table = %record.table, "record created");
        record
    }

    /// Remove a record unconditionally, outside any unit-of-work
    ///
    /// Returns the removed record if it existed. Units-of-work still holding a
    /// ticket for it will fail to commit.
    pub fn delete(&self, id: RecordId) -> Option<Record> {
        let _commit_guard = self.commit_lock.lock();
        let removed = self.records.write().remove(&id);
        if removed.is_some() {
            tracing::trace!(record_id = %id, "record deleted");
        }
        removed
    }

    // ========================================================================
    // Reads
    // ========================================================================

    /// Get the committed state of a record
    #[inline]
    pub fn get(&self, id: RecordId) -> Option<Record> {
        self.records.read().get(&id).cloned()
    }

    /// Check if a record exists
    #[inline]
    pub fn contains(&self, id: RecordId) -> bool {
        self.records.read().contains_key(&id)
    }

    /// All records matching `predicate`, sorted by id
    ///
    /// NOTE: O(n) scan. Queries are not on the commit path.
    pub fn query<F>(&self, predicate: F) -> Vec<Record>
    where
        F: Fn(&Record) -> bool,
    {
        let mut results: Vec<_> = self
            .records
            .read()
            .values()
            .filter(|r| predicate(r))
            .cloned()
            .collect();
        results.sort_by_key(|r| r.id);
        results
    }

    /// All records of one table, sorted by id
    pub fn scan_table(&self, table: &str) -> Vec<Record> {
        self.query(|r| r.is_in(table))
    }

    // ========================================================================
    // Commit
    // ========================================================================

    /// Atomically validate `expected` and apply `writes`
    ///
    /// Per id:
    /// - expected + `Put`: payload replaced, version +1 (or created at 0 when
    ///   expected absent)
    /// - expected + `Delete`: record removed
    /// - expected, no write: forced increment, payload untouched (skipped for
    ///   ids registered with `verify_version`)
    /// - write, no expectation: applied blindly (+1 if present, else created)
    pub fn try_apply(
        &self,
        writes: &WriteSet,
        expected: &ExpectedVersions,
    ) -> Result<AppliedCommit> {
        // Held until the batch is applied: nothing else mutates the map
        // between validation and apply
        let _commit_guard = self.commit_lock.lock();

        let live = self.records.read();
        let validation = detect_conflict(expected, |id| live.get(&id).map(|r| r.version));
        drop(live);
        if let ValidationResult::Conflict(conflict) = validation {
            tracing::debug!(
                record_id = %conflict.record_id,
                expected = %conflict.expected,
                kind = ?conflict.kind,
                "batch rejected"
            );
            return Err(Error::VersionConflict(conflict));
        }

        let mut applied = AppliedCommit::default();
        let mut records = self.records.write();

        for (id, op) in writes.iter() {
            match op {
                WriteOp::Put { table, value } => {
                    let version = match records.get_mut(&id) {
                        Some(record) => {
                            record.apply_update(value.clone());
                            record.version
                        }
                        None => {
                            let record = Record::new(id, table.clone(), value.clone());
                            let version = record.version;
                            records.insert(id, record);
                            version
                        }
                    };
                    applied.versions.insert(id, version);
                }
                WriteOp::Delete => {
                    if records.remove(&id).is_some() {
                        applied.deleted.push(id);
                    }
                }
            }
        }

        for (id, expectation) in expected.iter() {
            if writes.contains(id)
                || expectation == Expectation::Absent
                || expected.is_verify_only(id)
            {
                continue;
            }
            // Validation above guarantees the record is present
            if let Some(record) = records.get_mut(&id) {
                record.bump();
                applied.versions.insert(id, record.version);
            }
        }

        applied.commit_seq = self.commits.fetch_add(1, Ordering::AcqRel) + 1;
        drop(records);

        tracing::debug!(
            commit_seq = applied.commit_seq,
            touched = applied.versions.len(),
            deleted = applied.deleted.len(),
            "batch applied"
        );
        Ok(applied)
    }
}

impl Default for VersionedStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for VersionedStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VersionedStore")
            .field("records", &self.len())
            .field("last_id", &self.last_id())
            .field("commits", &self.commit_count())
            .finish()
    }
}

impl VersionedStorage for VersionedStore {
    fn get(&self, id: RecordId) -> Result<Record> {
        VersionedStore::get(self, id).ok_or(Error::NotFound(id))
    }

    fn query(&self, predicate: &dyn Fn(&Record) -> bool) -> Result<Vec<Record>> {
        Ok(VersionedStore::query(self, predicate))
    }

    fn try_apply(&self, writes: &WriteSet, expected: &ExpectedVersions) -> Result<AppliedCommit> {
        VersionedStore::try_apply(self, writes, expected)
    }

    fn allocate_id(&self) -> Result<RecordId> {
        Ok(self.next_id())
    }
}
