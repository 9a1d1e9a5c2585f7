//! Two-tier cache with a memory LRU in front of a directory of entry files
//!
//! A [`Cache`] serves hot entries from memory and keeps every entry on disk
//! as JSON, gzip-compressed above a size threshold, checksummed, and written
//! atomically. Disk access runs behind a circuit breaker. Background timers
//! sweep expired entries and shrink the memory tier under memory pressure.
//!
//! [`CacheManager`] owns a set of named caches under one root directory.
//!
//! ```rust,no_run
//! use tiercache::{Cache, CacheOptions};
//!
//! # async fn example() -> tiercache::Result<()> {
//! let cache = Cache::new("/tmp/my-cache", CacheOptions::default()).await?;
//! cache.set("user:1", &"Ada", None).await?;
//! let name: Option<String> = cache.get("user:1", None).await;
//! # Ok(())
//! # }
//! ```

pub mod checksum;
pub mod compression;
pub mod config;
pub mod core;
pub mod entry;
pub mod events;
pub mod manager;
pub mod memory;
pub mod stats;
pub mod storage;
pub mod workers;

pub use self::core::{Cache, CacheBuilder};
pub use checksum::{ChecksumValidator, ValidationResult};
pub use compression::{CompressionResult, CompressionService, CompressionStats};
pub use config::{
    CacheConfiguration, CacheOptions, CacheOptionsBuilder, CacheOptionsLoader, ConfigSource,
};
pub use entry::CacheEntry;
pub use events::{
    CacheEvent, CacheOperation, EventBus, EventKind, OperationEvent, SubscriptionId,
};
pub use manager::{CacheManager, GlobalCacheStats, CONFIG_CACHE_NAME};
pub use memory::{
    MemoryPressureDetector, MemoryPressureLevel, MemorySample, MemorySampler, SystemMemorySampler,
};
pub use stats::{CacheStats, CircuitBreakerSnapshot, StorageSummary};
pub use storage::{PartitionInfo, PartitionedStorage};
pub use tiercache_core::{Error, RecoveryHint, Result};
pub use workers::{
    BackgroundTask, BackgroundWorkerManager, CleanupReport, RemovalCandidate, RemovalReason,
    ScanResult, TaskOutput, WorkerStats,
};
