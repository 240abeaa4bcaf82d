//! Client-side operation counters.
//!
//! Every container keeps one [`ClientStats`] shared by all KV objects opened
//! from it.
//!
//! ```rust,ignore
//! let cont = Container::open(engine, pool, cont)?;
//! let kv = cont.newkv()?;
//! kv.put("a", "1")?;
//!
//! let stats = cont.stats();
//! println!("puts: {}", stats.puts);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

/// Atomic operation counters.
///
/// Counters are monotonically increasing and can be read while operations
/// are in flight.
#[derive(Debug, Default)]
pub struct ClientStats {
    gets: AtomicU64,
    puts: AtomicU64,
    deletes: AtomicU64,
    enumerate_calls: AtomicU64,
    bulk_calls: AtomicU64,
    objects_opened: AtomicU64,
    objects_closed: AtomicU64,
    errors: AtomicU64,
}

impl ClientStats {
    /// Creates a zeroed stats instance.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_get(&self) {
        self.gets.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_put(&self) {
        self.puts.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_delete(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_enumerate(&self) {
        self.enumerate_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_bulk(&self) {
        self.bulk_calls.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_open(&self) {
        self.objects_opened.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_close(&self) {
        self.objects_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a point-in-time copy of all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            gets: self.gets.load(Ordering::Relaxed),
            puts: self.puts.load(Ordering::Relaxed),
            deletes: self.deletes.load(Ordering::Relaxed),
            enumerate_calls: self.enumerate_calls.load(Ordering::Relaxed),
            bulk_calls: self.bulk_calls.load(Ordering::Relaxed),
            objects_opened: self.objects_opened.load(Ordering::Relaxed),
            objects_closed: self.objects_closed.load(Ordering::Relaxed),
            errors: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// A point-in-time copy of [`ClientStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    /// Point and bulk key fetches issued to the engine.
    pub gets: u64,
    /// Key inserts/updates issued to the engine.
    pub puts: u64,
    /// Key deletes issued to the engine.
    pub deletes: u64,
    /// Enumeration pages requested.
    pub enumerate_calls: u64,
    /// Bulk get/put calls.
    pub bulk_calls: u64,
    /// KV objects opened.
    pub objects_opened: u64,
    /// KV objects closed.
    pub objects_closed: u64,
    /// Engine calls that returned a non-success status.
    pub errors: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        assert_eq!(ClientStats::new().snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn counters_accumulate() {
        let stats = ClientStats::new();
        stats.record_get();
        stats.record_get();
        stats.record_put();
        stats.record_error();

        let snap = stats.snapshot();
        assert_eq!(snap.gets, 2);
        assert_eq!(snap.puts, 1);
        assert_eq!(snap.errors, 1);
        assert_eq!(snap.deletes, 0);
    }
}
