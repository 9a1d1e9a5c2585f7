//! Memory tier updates for put operations

use crate::core::eviction::evict_to_capacity;
use crate::core::types::Cache;
use crate::entry::CacheEntry;
use serde_json::Value;
use std::sync::atomic::Ordering;

impl Cache {
    /// Insert `entry` as most recently used, evicting down to the current capacity.
    ///
    /// Returns the entry previously stored under `key`.
    pub(in crate::core) fn store_in_memory(
        &self,
        key: &str,
        entry: CacheEntry<Value>,
    ) -> Option<CacheEntry<Value>> {
        let capacity = self.inner.effective_capacity.load(Ordering::Acquire);

        let (previous, evicted) = {
            let mut memory = self.inner.memory.lock();
            let previous = memory.put(key.to_string(), entry);
            (previous, evict_to_capacity(&mut memory, capacity))
        };

        self.inner.stats.record_evictions(evicted);
        previous
    }

    /// Undo [`store_in_memory`](Self::store_in_memory) after a failed write
    pub(super) fn rollback_memory(&self, key: &str, previous: Option<CacheEntry<Value>>) {
        let mut memory = self.inner.memory.lock();
        match previous {
            Some(entry) => {
                memory.put(key.to_string(), entry);
            }
            None => {
                memory.pop(key);
            }
        }
    }
}
