//! Cache put operations

mod disk;
mod memory;
mod validation;

use crate::checksum::ChecksumValidator;
use crate::entry::CacheEntry;
use crate::events::CacheOperation;
use crate::storage::hash_key;
use serde::Serialize;
use std::time::{Duration, Instant};
use tiercache_core::{Error, Result};
use tiercache_utils::tracing::cache_span;
use tracing::Instrument;

use crate::core::types::Cache;

impl Cache {
    /// Store `data` under `key` in both tiers.
    ///
    /// `ttl` defaults to the configured TTL. Fails with a validation error
    /// when the serialized value exceeds `max_size`. If the disk write
    /// fails, the memory tier is put back the way it was and the error is
    /// returned.
    pub async fn set<T>(&self, key: &str, data: &T, ttl: Option<Duration>) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        self.set_with_hash(key, data, ttl, None).await
    }

    /// Like [`set`](Self::set), storing `input_hash` as the entry fingerprint.
    ///
    /// A later `get` with a different hash treats the entry as invalid.
    pub async fn set_with_hash<T>(
        &self,
        key: &str,
        data: &T,
        ttl: Option<Duration>,
        input_hash: Option<&str>,
    ) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        let started = Instant::now();
        let span = cache_span(&self.inner.name, "set");

        let result = self.store(key, data, ttl, input_hash).instrument(span).await;
        match &result {
            Ok(()) => self.inner.stats.record_write(),
            Err(e) => {
                tracing::warn!("Failed to cache '{}': {}", key, e);
                self.inner.stats.record_error();
            }
        }

        self.emit_operation(CacheOperation::Set, Some(key), started, &result);
        result
    }

    async fn store<T>(
        &self,
        key: &str,
        data: &T,
        ttl: Option<Duration>,
        input_hash: Option<&str>,
    ) -> Result<()>
    where
        T: Serialize + ?Sized,
    {
        Self::validate_key(key)?;

        let value =
            serde_json::to_value(data).map_err(|e| Error::serialization(key, "serialize", e))?;
        // Checksums are taken over this canonical encoding of the value
        let encoded =
            serde_json::to_vec(&value).map_err(|e| Error::serialization(key, "serialize", e))?;
        self.validate_entry_size(key, encoded.len())?;

        let options = &self.inner.options;
        let hash = input_hash.map_or_else(|| hash_key(key), str::to_owned);
        let mut entry = CacheEntry::new(
            value,
            hash,
            encoded.len() as u64,
            ttl.unwrap_or(options.ttl),
        );
        entry.compressed = options.compression && encoded.len() > options.compression_threshold;
        if options.enable_checksum {
            entry.checksum = Some(ChecksumValidator::calculate_checksum(
                &encoded,
                &entry.metadata(),
            ));
        }

        let previous = self.store_in_memory(key, entry.clone());

        match self.write_to_disk(key, &entry).await {
            Ok(()) => {
                tracing::debug!(
                    "Cached '{}' ({} bytes{})",
                    key,
                    entry.size,
                    if entry.compressed { ", compressed" } else { "" }
                );
                Ok(())
            }
            Err(e) => {
                self.rollback_memory(key, previous);
                if matches!(e, Error::AtomicWrite { .. } | Error::FileSystem { .. }) {
                    self.inner.stats.record_atomic_failure();
                }
                Err(e)
            }
        }
    }
}
