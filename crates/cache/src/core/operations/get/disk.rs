//! Disk loading operations for get

use crate::checksum::ChecksumValidator;
use crate::core::types::Cache;
use crate::entry::CacheEntry;
use crate::storage::EntryPaths;
use serde_json::Value;
use tiercache_core::{Error, Result};

impl Cache {
    /// Read, decode and validate the persisted entry for `key`.
    ///
    /// Expired and differently fingerprinted entries are `Ok(None)`. Read
    /// failures and corrupt entries are errors, already counted. Invalid
    /// files are deleted so the next lookup does not pay for them again.
    pub(super) async fn load_from_disk(
        &self,
        key: &str,
        input_hash: Option<&str>,
    ) -> Result<Option<CacheEntry<Value>>> {
        let paths = self.inner.entry_paths(key);
        let stats = &self.inner.stats;

        let variants = match self.read_entry_bytes(&paths).await {
            Ok(variants) if variants.is_empty() => return Ok(None),
            Ok(variants) => variants,
            Err(e) => {
                tracing::warn!("Failed to read cache entry for '{}': {}", key, e);
                stats.record_error();
                return Err(e);
            }
        };

        let superseded = variants.len() > 1;
        let mut newest: Option<(CacheEntry<Value>, bool)> = None;
        for (bytes, compressed) in variants {
            let entry = match self.decode_entry(key, bytes, compressed).await {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Discarding unreadable cache entry for '{}': {}", key, e);
                    stats.record_corrupted(1);
                    if self.inner.options.enable_checksum {
                        stats.record_checksum_failure();
                    }
                    self.remove_entry_files(key).await;
                    return Err(e);
                }
            };
            let is_newer = newest
                .as_ref()
                .map_or(true, |(current, _)| entry.timestamp > current.timestamp);
            if is_newer {
                newest = Some((entry, compressed));
            }
        }
        let Some((mut entry, compressed)) = newest else {
            return Ok(None);
        };

        // Both variants exist only when a write could not remove its stale sibling
        if superseded {
            let (_, older) = paths.for_write(compressed);
            if let Err(e) = self.delete_file(older).await {
                tracing::debug!("Could not remove superseded {}: {}", older.display(), e);
            }
        }

        if self.inner.options.enable_checksum {
            if let Err(e) = ChecksumValidator::verify(key, &entry) {
                tracing::warn!("Discarding cache entry: {}", e);
                stats.record_checksum_failure();
                stats.record_corrupted(1);
                self.remove_entry_files(key).await;
                return Err(e);
            }
        }

        if entry.is_expired() {
            tracing::debug!("Cache entry for '{}' expired", key);
            stats.record_expired(1);
            self.remove_entry_files(key).await;
            return Ok(None);
        }

        if !entry.matches_hash(input_hash) {
            tracing::debug!("Cache entry for '{}' has a different fingerprint", key);
            self.remove_entry_files(key).await;
            return Ok(None);
        }

        entry.touch();
        Ok(Some(entry))
    }

    /// Raw bytes of every variant present on disk, compressed first
    async fn read_entry_bytes(&self, paths: &EntryPaths) -> Result<Vec<(Vec<u8>, bool)>> {
        let mut variants = Vec::with_capacity(1);
        if let Some(bytes) = self.read_file(&paths.gz).await? {
            variants.push((bytes, true));
        }
        if let Some(bytes) = self.read_file(&paths.json).await? {
            variants.push((bytes, false));
        }
        Ok(variants)
    }

    async fn decode_entry(
        &self,
        key: &str,
        bytes: Vec<u8>,
        compressed: bool,
    ) -> Result<CacheEntry<Value>> {
        let bytes = if compressed {
            self.inner.compression.decompress(bytes).await?
        } else {
            bytes
        };
        serde_json::from_slice(&bytes).map_err(|e| Error::serialization(key, "parse entry", e))
    }
}
