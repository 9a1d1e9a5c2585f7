//! Cache remove operations

use crate::events::CacheOperation;
use std::time::Instant;

use super::super::types::Cache;

impl Cache {
    /// Remove an entry from both tiers.
    ///
    /// A key that is not cached is not an error. Disk failures are logged
    /// and counted, never returned. Returns whether the key was present in
    /// either tier.
    pub async fn delete(&self, key: &str) -> bool {
        let started = Instant::now();

        let in_memory = self.inner.memory.lock().pop(key).is_some();

        let paths = self.inner.entry_paths(key);
        let mut on_disk = false;
        let mut failure = None;

        for path in [&paths.json, &paths.gz] {
            match self.delete_file(path).await {
                Ok(outcome) => on_disk |= outcome.existed,
                Err(e) => {
                    tracing::warn!("Failed to delete cache file {}: {}", path.display(), e);
                    self.inner.stats.record_error();
                    failure = Some(e.to_string());
                }
            }
        }

        self.inner.stats.record_delete();
        self.emit_outcome(CacheOperation::Delete, Some(key), started, failure);

        in_memory || on_disk
    }
}
