//! Unit-of-work counters
//!
//! One [`UnitOfWorkMetrics`] is shared (via `Arc`) between a manager and every
//! unit-of-work it hands out. Counters are relaxed atomics; a snapshot is not
//! a consistent cut across them.

use std::sync::atomic::{AtomicU64, Ordering};

/// Shared lifecycle counters
#[derive(Debug, Default)]
pub struct UnitOfWorkMetrics {
    begun: AtomicU64,
    committed: AtomicU64,
    rolled_back: AtomicU64,
    conflicts: AtomicU64,
}

impl UnitOfWorkMetrics {
    /// Create zeroed counters
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_begin(&self) {
        self.begun.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_commit(&self) {
        self.committed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_rollback(&self, conflict: bool) {
        self.rolled_back.fetch_add(1, Ordering::Relaxed);
        if conflict {
            self.conflicts.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Read the current counter values
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            begun: self.begun.load(Ordering::Relaxed),
            committed: self.committed.load(Ordering::Relaxed),
            rolled_back: self.rolled_back.load(Ordering::Relaxed),
            conflicts: self.conflicts.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time copy of [`UnitOfWorkMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MetricsSnapshot {
    /// Units-of-work handed out
    pub begun: u64,
    /// Successful commits
    pub committed: u64,
    /// Rollbacks, explicit or caused by a failed commit
    pub rolled_back: u64,
    /// Rollbacks caused by a concurrency conflict
    pub conflicts: u64,
}

impl MetricsSnapshot {
    /// Units-of-work neither committed nor rolled back (includes dropped ones)
    pub fn unfinished(&self) -> u64 {
        self.begun
            .saturating_sub(self.committed)
            .saturating_sub(self.rolled_back)
    }

    /// Fraction of finished units-of-work that committed (0.0 when none)
    pub fn commit_rate(&self) -> f64 {
        let finished = self.committed + self.rolled_back;
        if finished == 0 {
            0.0
        } else {
            self.committed as f64 / finished as f64
        }
    }
}
