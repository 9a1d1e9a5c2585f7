//! Removal of every entry

use crate::core::types::Cache;
use crate::events::CacheOperation;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tiercache_core::{Error, Result};
use tokio::fs;

impl Cache {
    /// Empty the memory tier and delete everything under the cache directory.
    ///
    /// Stops at the first failure and returns it.
    pub async fn clear(&self) -> Result<()> {
        let started = Instant::now();

        self.inner.memory.lock().clear();
        let result = self.clear_directory().await;
        if let Some(storage) = &self.inner.storage {
            storage.reset();
        }

        match &result {
            Ok(removed) => {
                tracing::info!("Cleared cache '{}' ({} items removed)", self.inner.name, removed)
            }
            Err(e) => {
                tracing::warn!("Failed to clear cache '{}': {}", self.inner.name, e);
                self.inner.stats.record_error();
            }
        }

        self.emit_operation(CacheOperation::Clear, None, started, &result);
        result.map(|_| ())
    }

    async fn clear_directory(&self) -> Result<usize> {
        let base_dir = &self.inner.base_dir;
        let children = self.guarded("list", || list_children(base_dir)).await?;

        for (path, is_dir) in &children {
            if *is_dir {
                self.remove_dir(path).await?;
            } else {
                self.delete_file(path).await?;
            }
        }

        Ok(children.len())
    }
}

/// Immediate children of `dir`, flagged when they are directories
async fn list_children(dir: &Path) -> Result<Vec<(PathBuf, bool)>> {
    let mut read_dir = match fs::read_dir(dir).await {
        Ok(read_dir) => read_dir,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(Error::file_system(dir, "list cache directory", e)),
    };

    let mut children = Vec::new();
    while let Some(entry) = read_dir
        .next_entry()
        .await
        .map_err(|e| Error::file_system(dir, "list cache directory", e))?
    {
        let path = entry.path();
        let file_type = entry
            .file_type()
            .await
            .map_err(|e| Error::file_system(&path, "inspect cache file", e))?;
        children.push((path, file_type.is_dir()));
    }
    Ok(children)
}
