//! Disk write operations for put

use crate::core::types::Cache;
use crate::entry::CacheEntry;
use serde_json::Value;
use tiercache_core::{Error, Result};

impl Cache {
    /// Write `entry` to its file, compressing when flagged, and remove the
    /// other variant left over from an earlier write
    pub(super) async fn write_to_disk(&self, key: &str, entry: &CacheEntry<Value>) -> Result<()> {
        let paths = self.inner.entry_paths_for_write(key).await?;

        let encoded =
            serde_json::to_vec(entry).map_err(|e| Error::serialization(key, "encode entry", e))?;

        let content = if entry.compressed {
            let result = self.inner.compression.compress(encoded).await?;
            tracing::debug!(
                "Compressed '{}' to {} bytes (ratio {:.2})",
                key,
                result.data.len(),
                result.ratio
            );
            result.data
        } else {
            encoded
        };

        let (target, stale) = paths.for_write(entry.compressed);
        let outcome = self.write_file(target, &content).await?;
        if let Some(backup) = outcome.backup_path {
            tracing::debug!("Previous entry for '{}' backed up to {}", key, backup.display());
        }

        // Committed; a sibling left behind loses to this file on read
        if let Err(e) = self.delete_file(stale).await {
            tracing::warn!(
                "Cached '{}' but could not remove stale {}: {}",
                key,
                stale.display(),
                e
            );
            self.inner.stats.record_error();
        }
        Ok(())
    }
}
