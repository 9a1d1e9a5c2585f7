//! Statistics snapshot

use crate::core::types::Cache;
use crate::stats::{CacheStats, CircuitBreakerSnapshot, StorageSummary};
use crate::storage::{scan_usage, PartitionInfo, ENTRY_OVERHEAD_BYTES};
use std::sync::atomic::Ordering;

impl Cache {
    /// Snapshot of counters, tier sizes and component state.
    ///
    /// Recounts the entry files on disk, so the cost grows with the cache.
    pub async fn stats(&self) -> CacheStats {
        let counters = &self.inner.stats;
        let circuit_breaker = match &self.inner.breaker {
            Some(breaker) => Some(CircuitBreakerSnapshot::from(breaker.stats().await)),
            None => None,
        };

        CacheStats {
            name: self.inner.name.clone(),
            hits: counters.hits(),
            misses: counters.misses.load(Ordering::Relaxed),
            memory_hits: counters.memory_hits.load(Ordering::Relaxed),
            disk_hits: counters.disk_hits.load(Ordering::Relaxed),
            hit_rate: counters.hit_rate(),
            writes: counters.writes.load(Ordering::Relaxed),
            deletes: counters.deletes.load(Ordering::Relaxed),
            evictions: counters.evictions.load(Ordering::Relaxed),
            expired_removals: counters.expired_removals.load(Ordering::Relaxed),
            errors: counters.errors.load(Ordering::Relaxed),
            checksum_failures: counters.checksum_failures.load(Ordering::Relaxed),
            corrupted_entries: counters.corrupted_entries.load(Ordering::Relaxed),
            atomic_op_failures: counters.atomic_op_failures.load(Ordering::Relaxed),
            cleanup_runs: counters.cleanup_runs.load(Ordering::Relaxed),
            memory_entries: self.memory_len(),
            max_memory_entries: self.inner.options.max_memory_entries,
            effective_capacity: self.effective_capacity(),
            compression: self.inner.compression.stats(),
            circuit_breaker,
            workers: self.inner.workers.as_ref().map(|w| w.stats()),
            memory_pressure: self.memory_pressure(),
            storage: self.storage_summary().await,
            stats_since: counters.stats_since,
        }
    }

    async fn storage_summary(&self) -> StorageSummary {
        match &self.inner.storage {
            Some(storage) => match storage.partition_stats().await {
                Ok(partitions) => StorageSummary {
                    partitioned: true,
                    partition_count: partitions.len() as u32,
                    file_count: partitions.iter().map(|p| p.file_count).sum(),
                    total_size: partitions.iter().map(|p| p.total_size).sum(),
                    estimated_memory: partitions.iter().map(PartitionInfo::estimated_memory).sum(),
                },
                Err(e) => {
                    tracing::warn!("Failed to collect partition statistics: {}", e);
                    StorageSummary {
                        partitioned: true,
                        ..StorageSummary::default()
                    }
                }
            },
            None => {
                let dir = self.inner.base_dir.clone();
                match tokio::task::spawn_blocking(move || scan_usage(&dir)).await {
                    Ok(usage) => StorageSummary {
                        partitioned: false,
                        partition_count: 0,
                        file_count: usage.file_count,
                        total_size: usage.total_size,
                        estimated_memory: usage.total_size
                            + usage.file_count * ENTRY_OVERHEAD_BYTES,
                    },
                    Err(e) => {
                        tracing::warn!("Failed to scan cache directory: {}", e);
                        StorageSummary::default()
                    }
                }
            }
        }
    }
}
