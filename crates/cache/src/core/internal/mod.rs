//! Internal counters backing [`CacheStats`](crate::stats::CacheStats)

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::SystemTime;

/// Internal cache statistics with atomic counters
pub struct CacheCounters {
    pub memory_hits: AtomicU64,
    pub disk_hits: AtomicU64,
    pub misses: AtomicU64,
    pub writes: AtomicU64,
    pub deletes: AtomicU64,
    pub evictions: AtomicU64,
    pub expired_removals: AtomicU64,
    pub errors: AtomicU64,
    pub checksum_failures: AtomicU64,
    pub corrupted_entries: AtomicU64,
    pub atomic_op_failures: AtomicU64,
    pub cleanup_runs: AtomicU64,
    pub stats_since: SystemTime,
}

impl Default for CacheCounters {
    fn default() -> Self {
        Self {
            memory_hits: AtomicU64::new(0),
            disk_hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            writes: AtomicU64::new(0),
            deletes: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
            expired_removals: AtomicU64::new(0),
            errors: AtomicU64::new(0),
            checksum_failures: AtomicU64::new(0),
            corrupted_entries: AtomicU64::new(0),
            atomic_op_failures: AtomicU64::new(0),
            cleanup_runs: AtomicU64::new(0),
            stats_since: SystemTime::now(),
        }
    }
}

impl CacheCounters {
    pub fn record_memory_hit(&self) {
        self.memory_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_disk_hit(&self) {
        self.disk_hits.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_write(&self) {
        self.writes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_delete(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_evictions(&self, count: usize) {
        if count > 0 {
            self.evictions.fetch_add(count as u64, Ordering::Relaxed);
        }
    }

    pub fn record_expired(&self, count: u64) {
        self.expired_removals.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_checksum_failure(&self) {
        self.checksum_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_corrupted(&self, count: u64) {
        self.corrupted_entries.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_atomic_failure(&self) {
        self.atomic_op_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_cleanup(&self) {
        self.cleanup_runs.fetch_add(1, Ordering::Relaxed);
    }

    pub fn hits(&self) -> u64 {
        self.memory_hits.load(Ordering::Relaxed) + self.disk_hits.load(Ordering::Relaxed)
    }

    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits();
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        if total == 0 {
            0.0
        } else {
            hits as f64 / total as f64
        }
    }
}
