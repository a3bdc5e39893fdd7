//! Module: obs
//! Responsibility: lightweight engine counters and their snapshot view.
//! Does not own: any external metrics surface; callers export snapshots.

use std::sync::atomic::{AtomicU64, Ordering};

///
/// EngineCounters
///
/// Monotonic counters bumped on the engine's hot paths. Reads are relaxed;
/// these are diagnostics, not coordination.
///

#[derive(Debug, Default)]
pub struct EngineCounters {
    queries: AtomicU64,
    pages_served: AtomicU64,
    index_scans: AtomicU64,
    index_writes: AtomicU64,
    unique_conflicts: AtomicU64,
    transient_retries: AtomicU64,
    invalid_cursors: AtomicU64,
}

impl EngineCounters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_query(&self) {
        self.queries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_page(&self) {
        self.pages_served.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_index_scan(&self) {
        self.index_scans.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_index_write(&self) {
        self.index_writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_unique_conflict(&self) {
        self.unique_conflicts.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_transient_retry(&self) {
        self.transient_retries.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalid_cursor(&self) {
        self.invalid_cursors.fetch_add(1, Ordering::Relaxed);
    }

    #[must_use]
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            queries: self.queries.load(Ordering::Relaxed),
            pages_served: self.pages_served.load(Ordering::Relaxed),
            index_scans: self.index_scans.load(Ordering::Relaxed),
            index_writes: self.index_writes.load(Ordering::Relaxed),
            unique_conflicts: self.unique_conflicts.load(Ordering::Relaxed),
            transient_retries: self.transient_retries.load(Ordering::Relaxed),
            invalid_cursors: self.invalid_cursors.load(Ordering::Relaxed),
        }
    }
}

///
/// CounterSnapshot
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct CounterSnapshot {
    pub queries: u64,
    pub pages_served: u64,
    pub index_scans: u64,
    pub index_writes: u64,
    pub unique_conflicts: u64,
    pub transient_retries: u64,
    pub invalid_cursors: u64,
}

///
/// TESTS
///

#[cfg(test)]
mod tests {
    use super::EngineCounters;

    #[test]
    fn snapshot_reflects_recorded_events() {
        let counters = EngineCounters::new();
        counters.record_query();
        counters.record_query();
        counters.record_index_scan();
        counters.record_unique_conflict();

        let snap = counters.snapshot();
        assert_eq!(snap.queries, 2);
        assert_eq!(snap.index_scans, 1);
        assert_eq!(snap.unique_conflicts, 1);
        assert_eq!(snap.pages_served, 0);
    }
}
