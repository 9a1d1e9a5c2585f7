//! Miscellaneous cache operations

mod clear;
mod stats;

use crate::config::CacheOptions;
use crate::events::{CacheOperation, EventBus};
use crate::memory::MemoryPressureLevel;
use std::path::Path;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Instant;

use crate::core::types::Cache;

impl Cache {
    /// Whether `key` is cached.
    ///
    /// A live memory entry answers immediately and counts as an access.
    /// Otherwise only the existence of an entry file is checked: its TTL is
    /// not read, so an expired entry that no sweep or `get` has removed yet
    /// still reports `true`. Use [`get`](Self::get) when expiry matters.
    pub async fn has(&self, key: &str) -> bool {
        let started = Instant::now();

        let live_in_memory = {
            let mut memory = self.inner.memory.lock();
            match memory.get_mut(key) {
                Some(entry) if !entry.is_expired() => {
                    entry.touch();
                    true
                }
                Some(_) => {
                    memory.pop(key);
                    false
                }
                None => false,
            }
        };

        if live_in_memory {
            self.emit_outcome(CacheOperation::Has, Some(key), started, None);
            return true;
        }

        let paths = self.inner.entry_paths(key);
        let mut error = None;
        let mut found = false;
        for path in [&paths.gz, &paths.json] {
            match self.file_exists(path).await {
                Ok(true) => {
                    found = true;
                    break;
                }
                Ok(false) => {}
                Err(e) => {
                    tracing::debug!("Existence check for '{}' failed: {}", key, e);
                    self.inner.stats.record_error();
                    error = Some(e.to_string());
                    break;
                }
            }
        }

        self.emit_outcome(CacheOperation::Has, Some(key), started, error);
        found
    }

    /// Stop the background timers and worker pool and drop the memory tier.
    ///
    /// Entry files stay on disk. Calling this more than once is harmless.
    pub fn destroy(&self) {
        if self.inner.destroyed.swap(true, Ordering::AcqRel) {
            return;
        }

        for handle in self.inner.background_handles.lock().drain(..) {
            handle.abort();
        }
        if let Some(workers) = &self.inner.workers {
            workers.shutdown();
        }
        self.inner.memory.lock().clear();

        tracing::info!("Cache '{}' destroyed", self.inner.name);
    }

    pub fn is_destroyed(&self) -> bool {
        self.inner.destroyed.load(Ordering::Acquire)
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn base_dir(&self) -> &Path {
        &self.inner.base_dir
    }

    pub fn options(&self) -> &CacheOptions {
        &self.inner.options
    }

    /// Bus carrying this cache's operation, pressure and eviction events
    pub fn events(&self) -> &Arc<EventBus> {
        &self.inner.events
    }

    /// Whether `key` is in the memory tier, expired or not, without touching it
    pub fn in_memory(&self, key: &str) -> bool {
        self.inner.memory.lock().contains(key)
    }

    pub fn memory_len(&self) -> usize {
        self.inner.memory.lock().len()
    }

    pub fn effective_capacity(&self) -> usize {
        self.inner.effective_capacity.load(Ordering::Acquire)
    }

    /// False when partitioning is off or fell back to a flat directory
    pub fn is_partitioned(&self) -> bool {
        self.inner.storage.is_some()
    }

    pub fn memory_pressure(&self) -> MemoryPressureLevel {
        self.inner
            .pressure
            .as_ref()
            .map_or(MemoryPressureLevel::Normal, |p| p.level())
    }
}
