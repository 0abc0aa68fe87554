//! Storage contract consumed by units-of-work

use crate::error::Result;
use crate::record::Record;
use crate::types::RecordId;
use crate::write::{AppliedCommit, ExpectedVersions, WriteSet};

/// A store of versioned records
///
/// Implementations must make [`try_apply`](VersionedStorage::try_apply) a
/// single atomic step relative to every other `try_apply`: the expectation
/// check and the application of the batch happen in one critical section, and
/// no reader ever observes part of a batch.
///
/// `get` and `query` never block on each other and always reflect the latest
/// successful batch, never an in-flight one.
pub trait VersionedStorage: Send + Sync {
    /// Get the committed state of a record
    ///
    /// # Errors
    /// [`Error::NotFound`](crate::Error::NotFound) if the record does not exist.
    fn get(&self, id: RecordId) -> Result<Record>;

    /// Get every committed record matching `predicate`, ordered by id
    ///
    /// Each record reflects its own latest commit. Consistency across the
    /// whole result set is not promised.
    fn query(&self, predicate: &dyn Fn(&Record) -> bool) -> Result<Vec<Record>>;

    /// Atomically validate `expected` and apply `writes`
    ///
    /// On success every surviving id in `expected` has moved to its next
    /// version (forced increments included) and every op in `writes` has been
    /// applied. On failure nothing has changed.
    ///
    /// # Errors
    /// [`Error::VersionConflict`](crate::Error::VersionConflict) naming the
    /// first failing id, or a store failure.
    fn try_apply(&self, writes: &WriteSet, expected: &ExpectedVersions) -> Result<AppliedCommit>;

    /// Reserve a fresh record id for a record that will be created by a batch
    fn allocate_id(&self) -> Result<RecordId>;
}

impl<S: VersionedStorage + ?Sized> VersionedStorage for std::sync::Arc<S> {
    fn get(&self, id: RecordId) -> Result<Record> {
        (**self).get(id)
    }

    fn query(&self, predicate: &dyn Fn(&Record) -> bool) -> Result<Vec<Record>> {
        (**self).query(predicate)
    }

    fn try_apply(&self, writes: &WriteSet, expected: &ExpectedVersions) -> Result<AppliedCommit> {
        (**self).try_apply(writes, expected)
    }

    fn allocate_id(&self) -> Result<RecordId> {
        (**self).allocate_id()
    }
}
