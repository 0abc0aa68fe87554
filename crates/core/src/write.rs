//! Write sets and version expectations
//!
//! A commit is described by two maps handed to
//! [`VersionedStorage::try_apply`](crate::VersionedStorage::try_apply):
//!
//! - [`WriteSet`]: the payload changes the committer wants applied
//! - [`ExpectedVersions`]: the live state the committer expects to find
//!
//! Every id in `ExpectedVersions` that is still present after the batch moves
//! to its next version, whether or not the id also appears in the write set.
//! Ids that are expected but not written are pure forced increments, unless
//! they were registered with [`ExpectedVersions::verify_version`], in which
//! case they are checked and left alone.

use crate::types::{RecordId, Table, Version};
use crate::value::Value;
use std::collections::{BTreeMap, BTreeSet};

/// What a committer expects the live state of a record to be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Expectation {
    /// The record exists at exactly this version
    Version(Version),
    /// The record does not exist yet (new records created by the committer)
    Absent,
}

impl std::fmt::Display for Expectation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Expectation::Version(v) => write!(f, "{}", v),
            Expectation::Absent => f.write_str("absent"),
        }
    }
}

/// A staged change to one record
#[derive(Debug, Clone, PartialEq)]
pub enum WriteOp {
    /// Create or replace the payload
    Put {
        /// Table the record belongs to
        table: Table,
        /// New payload
        value: Value,
    },
    /// Remove the record
    Delete,
}

/// Staged writes, keyed by record id
///
/// Ordered so that batches are applied and logged deterministically.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteSet {
    ops: BTreeMap<RecordId, WriteOp>,
}

impl WriteSet {
    /// Create an empty write set
    pub fn new() -> Self {
        Self::default()
    }

    /// Stage a put, replacing any earlier op for the same id
    pub fn put(&mut self, id: RecordId, table: Table, value: Value) {
        self.ops.insert(id, WriteOp::Put { table, value });
    }

    /// Stage a delete, replacing any earlier op for the same id
    pub fn delete(&mut self, id: RecordId) {
        self.ops.insert(id, WriteOp::Delete);
    }

    /// Unstage `id`, returning its op
    pub fn remove(&mut self, id: RecordId) -> Option<WriteOp> {
        self.ops.remove(&id)
    }

    /// Get the staged op for `id`
    pub fn get(&self, id: RecordId) -> Option<&WriteOp> {
        self.ops.get(&id)
    }

    /// Check whether `id` has a staged op
    pub fn contains(&self, id: RecordId) -> bool {
        self.ops.contains_key(&id)
    }

    /// Iterate staged ops in id order
    pub fn iter(&self) -> impl Iterator<Item = (RecordId, &WriteOp)> {
        self.ops.iter().map(|(id, op)| (*id, op))
    }

    /// Ids with a staged op, in id order
    pub fn ids(&self) -> impl Iterator<Item = RecordId> + '_ {
        self.ops.keys().copied()
    }

    /// Number of staged ops
    pub fn len(&self) -> usize {
        self.ops.len()
    }

    /// Check whether nothing is staged
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Drop every staged op
    pub fn clear(&mut self) {
        self.ops.clear();
    }
}

/// Expected live state per record id, in id order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExpectedVersions {
    entries: BTreeMap<RecordId, Expectation>,
    /// Ids that are validated but not bumped when unwritten
    verify_only: BTreeSet<RecordId>,
}

impl ExpectedVersions {
    /// Create an empty map
    pub fn new() -> Self {
        Self::default()
    }

    /// Expect `id` to be at `version`; bumped on commit even if unwritten
    pub fn expect_version(&mut self, id: RecordId, version: Version) {
        self.verify_only.remove(&id);
        self.entries.insert(id, Expectation::Version(version));
    }

    /// Expect `id` to be at `version`; left untouched on commit unless written
    pub fn verify_version(&mut self, id: RecordId, version: Version) {
        self.verify_only.insert(id);
        self.entries.insert(id, Expectation::Version(version));
    }

    /// Expect `id` not to exist
    pub fn expect_absent(&mut self, id: RecordId) {
        self.verify_only.remove(&id);
        self.entries.insert(id, Expectation::Absent);
    }

    /// Check whether `id` is validated without a forced increment
    pub fn is_verify_only(&self, id: RecordId) -> bool {
        self.verify_only.contains(&id)
    }

    /// Get the expectation for `id`
    pub fn get(&self, id: RecordId) -> Option<Expectation> {
        self.entries.get(&id).copied()
    }

    /// Check whether `id` carries an expectation
    pub fn contains(&self, id: RecordId) -> bool {
        self.entries.contains_key(&id)
    }

    /// Iterate expectations in id order
    pub fn iter(&self) -> impl Iterator<Item = (RecordId, Expectation)> + '_ {
        self.entries.iter().map(|(id, e)| (*id, *e))
    }

    /// Number of expectations
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check whether there are no expectations
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(RecordId, Expectation)> for ExpectedVersions {
    fn from_iter<I: IntoIterator<Item = (RecordId, Expectation)>>(iter: I) -> Self {
        Self {
            entries: iter.into_iter().collect(),
            verify_only: BTreeSet::new(),
        }
    }
}

/// Outcome of a successful [`try_apply`](crate::VersionedStorage::try_apply)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppliedCommit {
    /// Store-wide sequence number of this batch (1 for the first batch)
    pub commit_seq: u64,
    /// Post-commit version of every surviving record the batch touched
    pub versions: BTreeMap<RecordId, Version>,
    /// Records removed by the batch
    pub deleted: Vec<RecordId>,
}

impl AppliedCommit {
    /// Post-commit version of `id`, if the batch touched it and it survived
    pub fn version_of(&self, id: RecordId) -> Option<Version> {
        self.versions.get(&id).copied()
    }
}
