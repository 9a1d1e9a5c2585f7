//! Point-in-time statistics snapshots

use crate::compression::CompressionStats;
use crate::memory::MemoryPressureLevel;
use crate::workers::WorkerStats;
use serde::Serialize;
use std::time::SystemTime;
use tiercache_utils::resilience::{CircuitBreakerStats, CircuitState};

/// Serializable view of the circuit breaker guarding disk I/O
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CircuitBreakerSnapshot {
    pub state: String,
    pub failure_count: usize,
    pub success_count: usize,
    pub total_requests: u64,
    pub total_failures: u64,
    pub total_successes: u64,
    pub rejected_requests: u64,
}

impl CircuitBreakerSnapshot {
    pub fn is_open(&self) -> bool {
        self.state == CircuitState::Open.to_string()
    }
}

impl From<CircuitBreakerStats> for CircuitBreakerSnapshot {
    fn from(stats: CircuitBreakerStats) -> Self {
        Self {
            state: stats.state.to_string(),
            failure_count: stats.failure_count,
            success_count: stats.success_count,
            total_requests: stats.total_requests,
            total_failures: stats.total_failures,
            total_successes: stats.total_successes,
            rejected_requests: stats.rejected_requests,
        }
    }
}

/// Persistent tier usage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StorageSummary {
    pub partitioned: bool,
    /// Partition directories present on disk
    pub partition_count: u32,
    pub file_count: u64,
    pub total_size: u64,
    pub estimated_memory: u64,
}

/// Statistics for one cache instance
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub name: String,
    pub hits: u64,
    pub misses: u64,
    pub memory_hits: u64,
    pub disk_hits: u64,
    /// Hits over lookups, 0.0 to 1.0
    pub hit_rate: f64,
    pub writes: u64,
    pub deletes: u64,
    pub evictions: u64,
    pub expired_removals: u64,
    pub errors: u64,
    pub checksum_failures: u64,
    pub corrupted_entries: u64,
    pub atomic_op_failures: u64,
    pub cleanup_runs: u64,
    pub memory_entries: usize,
    pub max_memory_entries: usize,
    /// Current memory tier capacity, lowered under critical memory pressure
    pub effective_capacity: usize,
    pub compression: CompressionStats,
    pub circuit_breaker: Option<CircuitBreakerSnapshot>,
    pub workers: Option<WorkerStats>,
    pub memory_pressure: MemoryPressureLevel,
    pub storage: StorageSummary,
    /// When counting started
    pub stats_since: SystemTime,
}

impl CacheStats {
    /// Entries held by the persistent tier
    pub fn entry_count(&self) -> u64 {
        self.storage.file_count
    }

    pub fn total_lookups(&self) -> u64 {
        self.hits + self.misses
    }
}
