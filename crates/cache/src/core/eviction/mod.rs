//! LRU eviction of the memory tier

use crate::entry::CacheEntry;
use crate::memory::MemoryPressureLevel;
use lru::LruCache;
use serde_json::Value;
use std::sync::atomic::Ordering;

use super::types::Cache;

/// Drop least-recently-touched entries until at most `capacity` remain
pub(super) fn evict_to_capacity(
    memory: &mut LruCache<String, CacheEntry<Value>>,
    capacity: usize,
) -> usize {
    let mut evicted = 0;
    while memory.len() > capacity {
        match memory.pop_lru() {
            Some((key, _)) => {
                tracing::trace!("Evicted '{}' from memory tier", key);
                evicted += 1;
            }
            None => break,
        }
    }
    evicted
}

impl Cache {
    /// React to a memory pressure reading.
    ///
    /// `Critical` runs a cleanup pass and shrinks the memory tier to half of
    /// `max_memory_entries`, evicting in LRU order regardless of TTL.
    /// `Normal` restores the full capacity.
    pub async fn respond_to_memory_pressure(&self, level: MemoryPressureLevel) {
        let max_entries = self.inner.options.max_memory_entries;

        match level {
            MemoryPressureLevel::Critical => {
                tracing::warn!(
                    "Critical memory pressure, shrinking memory tier of cache '{}'",
                    self.inner.name
                );

                match self.cleanup().await {
                    Ok(_) => {}
                    Err(e) => tracing::warn!("Cleanup under memory pressure failed: {}", e),
                }

                let target = (max_entries / 2).max(1);
                self.inner
                    .effective_capacity
                    .store(target, Ordering::Release);

                let (evicted, remaining) = {
                    let mut memory = self.inner.memory.lock();
                    let evicted = evict_to_capacity(&mut memory, target);
                    (evicted, memory.len())
                };
                self.inner.stats.record_evictions(evicted);

                tracing::info!(
                    "Adaptive eviction removed {} entries, {} remain (capacity {})",
                    evicted,
                    remaining,
                    target
                );
                self.report_eviction(evicted, remaining);
            }
            MemoryPressureLevel::Normal => {
                let previous = self
                    .inner
                    .effective_capacity
                    .swap(max_entries, Ordering::AcqRel);
                if previous != max_entries {
                    tracing::info!(
                        "Memory pressure relieved, cache '{}' capacity restored to {}",
                        self.inner.name,
                        max_entries
                    );
                }
            }
            MemoryPressureLevel::Warning => {
                tracing::debug!("Memory usage elevated for cache '{}'", self.inner.name);
            }
        }
    }

    /// Sample memory once and respond to the result
    pub async fn check_memory_pressure(&self) -> Option<MemoryPressureLevel> {
        let detector = self.inner.pressure.as_ref()?;
        match detector.check() {
            Ok(level) => {
                self.respond_to_memory_pressure(level).await;
                Some(level)
            }
            Err(e) => {
                tracing::warn!("Failed to sample memory usage: {}", e);
                None
            }
        }
    }

    fn report_eviction(&self, evicted: usize, remaining: usize) {
        match &self.inner.pressure {
            Some(detector) => detector.report_eviction(evicted, remaining),
            None => self
                .inner
                .events
                .emit(&crate::events::CacheEvent::EvictionCompleted { evicted, remaining }),
        }
    }
}
