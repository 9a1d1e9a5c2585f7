//! Statistics aggregated across managed caches

use crate::stats::CacheStats;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Write;

/// Totals over every cache a [`CacheManager`](super::CacheManager) owns
#[derive(Debug, Clone, Serialize)]
pub struct GlobalCacheStats {
    /// Per-cache snapshots keyed by cache name
    pub caches: BTreeMap<String, CacheStats>,
    pub cache_count: usize,
    pub total_hits: u64,
    pub total_misses: u64,
    /// Hits over lookups across all caches, so busy caches weigh more
    pub hit_rate: f64,
    pub total_entries: u64,
    pub total_memory_entries: usize,
    /// Bytes of entry files on disk
    pub total_size: u64,
    pub total_errors: u64,
    pub total_checksum_failures: u64,
}

impl GlobalCacheStats {
    pub fn from_caches(stats: impl IntoIterator<Item = CacheStats>) -> Self {
        let caches: BTreeMap<String, CacheStats> =
            stats.into_iter().map(|s| (s.name.clone(), s)).collect();

        let total_hits = caches.values().map(|s| s.hits).sum();
        let total_misses = caches.values().map(|s| s.misses).sum();
        let lookups = total_hits + total_misses;

        Self {
            cache_count: caches.len(),
            total_hits,
            total_misses,
            hit_rate: if lookups == 0 {
                0.0
            } else {
                total_hits as f64 / lookups as f64
            },
            total_entries: caches.values().map(CacheStats::entry_count).sum(),
            total_memory_entries: caches.values().map(|s| s.memory_entries).sum(),
            total_size: caches.values().map(|s| s.storage.total_size).sum(),
            total_errors: caches.values().map(|s| s.errors).sum(),
            total_checksum_failures: caches.values().map(|s| s.checksum_failures).sum(),
            caches,
        }
    }

    /// Multi-line human readable report
    pub fn summary(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "Caches: {}", self.cache_count);
        let _ = writeln!(
            out,
            "Hit rate: {:.1}% ({} hits, {} misses)",
            self.hit_rate * 100.0,
            self.total_hits,
            self.total_misses
        );
        let _ = writeln!(
            out,
            "Entries: {} on disk, {} in memory",
            self.total_entries, self.total_memory_entries
        );
        let _ = writeln!(out, "Size: {}", format_bytes(self.total_size));
        if self.total_errors > 0 || self.total_checksum_failures > 0 {
            let _ = writeln!(
                out,
                "Errors: {} ({} checksum failures)",
                self.total_errors, self.total_checksum_failures
            );
        }

        for (name, stats) in &self.caches {
            let _ = writeln!(
                out,
                "  {}: {} entries, {:.1}% hit rate, {}{}",
                name,
                stats.entry_count(),
                stats.hit_rate * 100.0,
                format_bytes(stats.storage.total_size),
                if stats.circuit_breaker.as_ref().is_some_and(|cb| cb.is_open()) {
                    ", circuit open"
                } else {
                    ""
                }
            );
        }
        out
    }
}

fn format_bytes(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KiB", "MiB", "GiB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}
