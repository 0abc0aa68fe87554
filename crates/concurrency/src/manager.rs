//! Unit-of-work manager
//!
//! Hands out units-of-work over one injected store. The manager holds no lock
//! and takes no part in commit; it only assigns ids and owns the metrics every
//! unit-of-work it creates reports into.

use crate::metrics::{MetricsSnapshot, UnitOfWorkMetrics};
use crate::unit_of_work::UnitOfWork;
use occam_core::VersionedStorage;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Factory for units-of-work sharing one store
///
/// # Thread Safety
///
/// `begin()` is lock-free and may be called from any thread. Each returned
/// unit-of-work is owned by its caller; the only state shared between them is
/// the store and the metrics counters.
pub struct UnitOfWorkManager<S: VersionedStorage> {
    store: Arc<S>,
    /// Next unit-of-work id (starts at 1)
    next_id: AtomicU64,
    metrics: Arc<UnitOfWorkMetrics>,
}

impl<S: VersionedStorage> UnitOfWorkManager<S> {
    /// Create a manager over `store`
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            next_id: AtomicU64::new(1),
            metrics: Arc::new(UnitOfWorkMetrics::new()),
        }
    }

    /// Begin a unit-of-work
    pub fn begin(&self) -> UnitOfWork<S> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        UnitOfWork::with_metrics(id, Arc::clone(&self.store), Arc::clone(&self.metrics))
    }

    /// The shared store
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Counters across every unit-of-work this manager handed out
    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

impl<S: VersionedStorage> std::fmt::Debug for UnitOfWorkManager<S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitOfWorkManager")
            .field("next_id", &self.next_id.load(Ordering::Relaxed))
            .field("metrics", &self.metrics.snapshot())
            .finish()
    }
}
