//! Cache builder and initialization

use crate::compression::CompressionService;
use crate::config::CacheOptions;
use crate::events::EventBus;
use crate::memory::{MemoryPressureDetector, MemorySampler, SystemMemorySampler};
use crate::storage::PartitionedStorage;
use crate::workers::BackgroundWorkerManager;
use lru::LruCache;
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize};
use std::sync::Arc;
use tiercache_core::{Error, Result};
use tiercache_utils::{
    AtomicFileOperations, CircuitBreaker, CircuitBreakerConfig, DirectFileOperations,
    FileOperations,
};
use tokio::fs;

use super::cleanup::start_background_tasks;
use super::internal::CacheCounters;
use super::types::{Cache, CacheInner};

/// Assembles a [`Cache`], with seams for swapping out its I/O and memory sampling
pub struct CacheBuilder {
    name: String,
    base_dir: PathBuf,
    options: CacheOptions,
    file_ops: Option<Arc<dyn FileOperations>>,
    sampler: Option<Arc<dyn MemorySampler>>,
    events: Option<Arc<EventBus>>,
}

impl CacheBuilder {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            name: "default".to_string(),
            base_dir: base_dir.into(),
            options: CacheOptions::default(),
            file_ops: None,
            sampler: None,
            events: None,
        }
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn options(mut self, options: CacheOptions) -> Self {
        self.options = options;
        self
    }

    /// Route all persistent-tier I/O through `file_ops`
    pub fn with_file_operations(mut self, file_ops: Arc<dyn FileOperations>) -> Self {
        self.file_ops = Some(file_ops);
        self
    }

    pub fn with_memory_sampler(mut self, sampler: Arc<dyn MemorySampler>) -> Self {
        self.sampler = Some(sampler);
        self
    }

    /// Share an event bus with other components
    pub fn with_event_bus(mut self, events: Arc<EventBus>) -> Self {
        self.events = Some(events);
        self
    }

    pub async fn build(self) -> Result<Cache> {
        let options = self.options;
        options.validate()?;

        let base_dir = self.base_dir;
        match fs::create_dir_all(&base_dir).await {
            Ok(()) => {}
            Err(e) => return Err(Error::file_system(&base_dir, "create cache directory", e)),
        }

        let storage = if options.enable_partitioning {
            match PartitionedStorage::new(base_dir.clone(), options.partition_count).await {
                Ok(storage) => Some(storage),
                Err(e) => {
                    tracing::warn!(
                        "Partitioned storage unavailable for cache '{}', using a flat directory: {}",
                        self.name,
                        e
                    );
                    None
                }
            }
        } else {
            None
        };

        let file_ops = match self.file_ops {
            Some(file_ops) => file_ops,
            None if options.enable_atomic_ops => {
                Arc::new(AtomicFileOperations::new(options.keep_backups))
            }
            None => Arc::new(DirectFileOperations),
        };

        let breaker = options.enable_circuit_breaker.then(|| {
            CircuitBreaker::new(CircuitBreakerConfig {
                failure_threshold: options.circuit_breaker_threshold,
                break_duration: options.circuit_breaker_timeout,
                half_open_max_calls: options.half_open_max_calls,
                ..CircuitBreakerConfig::default()
            })
        });

        let workers = options.enable_background_workers.then(|| {
            Arc::new(BackgroundWorkerManager::new(
                options.worker_count,
                options.worker_queue_timeout,
            ))
        });

        let compression = CompressionService::new(
            options.compression_level,
            options.worker_threshold,
            workers.clone(),
        );

        let events = self.events.unwrap_or_default();

        let pressure = if options.enable_memory_pressure_detection {
            let sampler = self
                .sampler
                .unwrap_or_else(|| Arc::new(SystemMemorySampler::new()));
            Some(Arc::new(MemoryPressureDetector::new(
                sampler,
                options.memory_warning_threshold,
                options.memory_critical_threshold,
                Arc::clone(&events),
            )))
        } else {
            None
        };

        let inner = Arc::new(CacheInner {
            name: self.name,
            effective_capacity: AtomicUsize::new(options.max_memory_entries),
            options,
            base_dir,
            memory: Mutex::new(LruCache::unbounded()),
            storage,
            file_ops,
            breaker,
            compression,
            workers,
            pressure,
            events,
            stats: CacheCounters::default(),
            cleanup_lock: tokio::sync::Mutex::new(()),
            background_handles: Mutex::new(Vec::new()),
            destroyed: AtomicBool::new(false),
        });

        let cache = Cache { inner };
        start_background_tasks(&cache);

        tracing::info!(
            "Cache '{}' ready at {} ({})",
            cache.inner.name,
            cache.inner.base_dir.display(),
            if cache.inner.storage.is_some() {
                "partitioned"
            } else {
                "flat"
            }
        );

        Ok(cache)
    }
}

impl Cache {
    /// Create a cache rooted at `base_dir`
    pub async fn new(base_dir: impl Into<PathBuf>, options: CacheOptions) -> Result<Self> {
        CacheBuilder::new(base_dir).options(options).build().await
    }

    pub fn builder(base_dir: impl Into<PathBuf>) -> CacheBuilder {
        CacheBuilder::new(base_dir)
    }
}
