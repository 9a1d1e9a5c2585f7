//! Core cache types and structures

use crate::compression::CompressionService;
use crate::config::CacheOptions;
use crate::entry::CacheEntry;
use crate::events::EventBus;
use crate::memory::MemoryPressureDetector;
use crate::storage::PartitionedStorage;
use crate::workers::BackgroundWorkerManager;
use lru::LruCache;
use parking_lot::Mutex;
use serde_json::Value;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize};
use std::sync::Arc;
use tiercache_utils::{CircuitBreaker, FileOperations};
use tokio::task::JoinHandle;

use super::internal::CacheCounters;

/// Two-tier cache: an LRU memory tier in front of a directory of entry files
#[derive(Clone)]
pub struct Cache {
    pub(super) inner: Arc<CacheInner>,
}

pub(super) struct CacheInner {
    /// Name used in logs and statistics
    pub name: String,
    pub options: CacheOptions,
    pub base_dir: PathBuf,
    /// Hot entries, ordered by recency of reads and writes
    pub memory: Mutex<LruCache<String, CacheEntry<Value>>>,
    /// Memory tier capacity; halved under critical memory pressure
    pub effective_capacity: AtomicUsize,
    /// `None` when partitioning is off or failed to initialize
    pub storage: Option<PartitionedStorage>,
    pub file_ops: Arc<dyn FileOperations>,
    pub breaker: Option<CircuitBreaker>,
    pub compression: CompressionService,
    pub workers: Option<Arc<BackgroundWorkerManager>>,
    pub pressure: Option<Arc<MemoryPressureDetector>>,
    pub events: Arc<EventBus>,
    pub stats: CacheCounters,
    /// Serializes cleanup passes
    pub cleanup_lock: tokio::sync::Mutex<()>,
    /// Cleanup and memory sampling timers
    pub background_handles: Mutex<Vec<JoinHandle<()>>>,
    pub destroyed: AtomicBool,
}

impl Drop for CacheInner {
    fn drop(&mut self) {
        for handle in self.background_handles.get_mut().drain(..) {
            handle.abort();
        }
        if let Some(workers) = &self.workers {
            workers.shutdown();
        }
    }
}

impl std::fmt::Debug for Cache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Cache")
            .field("name", &self.inner.name)
            .field("base_dir", &self.inner.base_dir)
            .field("partitioned", &self.inner.storage.is_some())
            .field("memory_entries", &self.inner.memory.lock().len())
            .finish()
    }
}
