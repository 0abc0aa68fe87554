//! Lock-mode policy
//!
//! Every read inside a unit-of-work names a [`LockMode`]. The mode decides
//! whether the record's observed version takes part in commit-time
//! validation, and whether the record is bumped even when nothing was staged
//! for it.
//!
//! Modes form a total order. Reading the same record twice keeps the stronger
//! mode; a ticket is never downgraded.

use occam_core::{Error, ExpectedVersions, RecordId, Result, Table, Version};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a read participates in commit-time validation
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum LockMode {
    /// The record may change concurrently without affecting this commit
    #[default]
    None,
    /// The observed version must still be current at commit
    Optimistic,
    /// Like `Optimistic`, and the record is bumped on commit even if unwritten
    OptimisticForceIncrement,
}

impl LockMode {
    /// Check if reads in this mode are validated at commit
    pub fn checks_version(self) -> bool {
        self >= LockMode::Optimistic
    }

    /// Check if reads in this mode bump the record on commit
    pub fn forces_increment(self) -> bool {
        self == LockMode::OptimisticForceIncrement
    }

    /// The stricter of two modes
    pub fn strongest(a: LockMode, b: LockMode) -> LockMode {
        a.max(b)
    }
}

impl std::fmt::Display for LockMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            LockMode::None => "none",
            LockMode::Optimistic => "optimistic",
            LockMode::OptimisticForceIncrement => "optimistic_force_increment",
        };
        f.write_str(s)
    }
}

/// What a unit-of-work observed about one record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReadTicket {
    /// Record read
    pub record_id: RecordId,
    /// Table the record belongs to
    pub table: Table,
    /// Version seen on the first read
    pub version: Version,
    /// Strongest mode requested so far
    pub mode: LockMode,
}

/// Read tickets of one unit-of-work, keyed by record id
#[derive(Debug, Clone, Default)]
pub struct ReadSet {
    tickets: BTreeMap<RecordId, ReadTicket>,
}

impl ReadSet {
    /// Create an empty read set
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a read
    ///
    /// The first read of an id fixes its version. Later reads only strengthen
    /// the mode; `version` is ignored for them.
    pub fn record(&mut self, id: RecordId, table: Table, version: Version, mode: LockMode) {
        self.tickets
            .entry(id)
            .and_modify(|t| t.mode = LockMode::strongest(t.mode, mode))
            .or_insert(ReadTicket {
                record_id: id,
                table,
                version,
                mode,
            });
    }

    /// Strengthen the mode of an existing ticket
    ///
    /// # Errors
    /// [`Error::NotRead`] if `id` has no ticket.
    pub fn escalate(&mut self, id: RecordId, mode: LockMode) -> Result<()> {
        let ticket = self.tickets.get_mut(&id).ok_or(Error::NotRead(id))?;
        ticket.mode = LockMode::strongest(ticket.mode, mode);
        Ok(())
    }

    /// Get the ticket for `id`
    pub fn get(&self, id: RecordId) -> Option<&ReadTicket> {
        self.tickets.get(&id)
    }

    /// Check whether `id` was read
    pub fn contains(&self, id: RecordId) -> bool {
        self.tickets.contains_key(&id)
    }

    /// Iterate tickets in id order
    pub fn iter(&self) -> impl Iterator<Item = &ReadTicket> {
        self.tickets.values()
    }

    /// Expectations contributed by version-checked tickets
    ///
    /// `OptimisticForceIncrement` tickets are registered for a forced bump,
    /// `Optimistic` tickets are only verified.
    pub fn expected_versions(&self) -> ExpectedVersions {
        let mut expected = ExpectedVersions::new();
        for ticket in self.iter() {
            if ticket.mode.forces_increment() {
                expected.expect_version(ticket.record_id, ticket.version);
            } else if ticket.mode.checks_version() {
                expected.verify_version(ticket.record_id, ticket.version);
            }
        }
        expected
    }

    /// Ids that will be bumped on commit regardless of staged writes
    pub fn forced_increments(&self) -> Vec<RecordId> {
        self.iter()
            .filter(|t| t.mode.forces_increment())
            .map(|t| t.record_id)
            .collect()
    }

    /// Number of tickets
    pub fn len(&self) -> usize {
        self.tickets.len()
    }

    /// Check whether nothing was read
    pub fn is_empty(&self) -> bool {
        self.tickets.is_empty()
    }

    /// Drop every ticket
    pub fn clear(&mut self) {
        self.tickets.clear();
    }
}
