//! Cache get operations

mod disk;

use crate::entry::CacheEntry;
use crate::events::CacheOperation;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Instant;
use tiercache_core::{Error, Result};
use tiercache_utils::tracing::cache_span;
use tracing::Instrument;

use crate::core::types::Cache;

enum MemoryLookup {
    Hit(Value),
    /// Present but expired or fingerprinted differently
    Stale { expired: bool },
    Absent,
}

impl Cache {
    /// Get a value from the cache.
    ///
    /// Looks in the memory tier first, then on disk, promoting disk hits
    /// into memory. With `input_hash`, only an entry stored under that
    /// fingerprint counts as a hit. Failures of any kind are reported as a
    /// miss and counted in [`stats`](Self::stats).
    pub async fn get<T>(&self, key: &str, input_hash: Option<&str>) -> Option<T>
    where
        T: DeserializeOwned,
    {
        let started = Instant::now();
        let span = cache_span(&self.inner.name, "get");

        let value = self.get_value(key, input_hash).instrument(span).await;
        let result: Result<Option<T>> = match value {
            Ok(Some(value)) => match serde_json::from_value::<T>(value) {
                Ok(data) => Ok(Some(data)),
                Err(e) => {
                    self.inner.stats.record_error();
                    let e = Error::serialization(key, "decode cached value", e);
                    tracing::warn!("{}", e);
                    Err(e)
                }
            },
            Ok(None) => Ok(None),
            Err(e) => Err(e),
        };

        self.emit_operation(CacheOperation::Get, Some(key), started, &result);

        match result {
            Ok(data) => data,
            Err(e) => {
                tracing::debug!("Reporting '{}' as a miss: {}", key, e);
                None
            }
        }
    }

    /// Untyped lookup behind [`get`](Self::get); every error is also a miss
    async fn get_value(&self, key: &str, input_hash: Option<&str>) -> Result<Option<Value>> {
        match self.lookup_memory(key, input_hash) {
            MemoryLookup::Hit(value) => {
                tracing::debug!("Memory hit for '{}'", key);
                self.inner.stats.record_memory_hit();
                return Ok(Some(value));
            }
            MemoryLookup::Stale { expired } => {
                if expired {
                    self.inner.stats.record_expired(1);
                }
                tracing::debug!("Dropping stale memory entry for '{}'", key);
                self.remove_entry_files(key).await;
                self.inner.stats.record_miss();
                return Ok(None);
            }
            MemoryLookup::Absent => {}
        }

        match self.load_from_disk(key, input_hash).await {
            Ok(Some(entry)) => {
                tracing::debug!("Disk hit for '{}'", key);
                let value = entry.data.clone();
                self.store_in_memory(key, entry);
                self.inner.stats.record_disk_hit();
                Ok(Some(value))
            }
            Ok(None) => {
                self.inner.stats.record_miss();
                Ok(None)
            }
            Err(e) => {
                self.inner.stats.record_miss();
                Err(e)
            }
        }
    }

    fn lookup_memory(&self, key: &str, input_hash: Option<&str>) -> MemoryLookup {
        let mut memory = self.inner.memory.lock();
        match memory.get_mut(key) {
            Some(entry) if entry.is_valid(input_hash) => {
                entry.touch();
                MemoryLookup::Hit(entry.data.clone())
            }
            Some(entry) => {
                let expired = entry.is_expired();
                memory.pop(key);
                MemoryLookup::Stale { expired }
            }
            None => MemoryLookup::Absent,
        }
    }

    /// Look up the stored entry for `key` in the memory tier without
    /// touching it or reading from disk
    pub fn peek_entry(&self, key: &str) -> Option<CacheEntry<Value>> {
        self.inner.memory.lock().peek(key).cloned()
    }
}
