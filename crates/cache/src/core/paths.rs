//! Resolution of entry file locations

use crate::storage::{hash_key, EntryPaths, GZIP_EXTENSION, JSON_EXTENSION};
use std::path::PathBuf;
use tiercache_core::Result;

use super::types::CacheInner;

impl CacheInner {
    /// Directory that holds, or would hold, the files for `key`
    fn entry_dir(&self, key: &str) -> PathBuf {
        match &self.storage {
            Some(storage) => storage.partition_dir(storage.partition_for(key)),
            None => self.base_dir.clone(),
        }
    }

    /// Where `key` lives on disk, without creating anything
    pub fn entry_paths(&self, key: &str) -> EntryPaths {
        EntryPaths::in_dir(&self.entry_dir(key), &hash_key(key))
    }

    /// Like [`entry_paths`](Self::entry_paths), creating the partition directory
    pub async fn entry_paths_for_write(&self, key: &str) -> Result<EntryPaths> {
        let hash = hash_key(key);
        match &self.storage {
            Some(storage) => {
                let json = storage
                    .get_partitioned_path(key, &format!("{hash}.{JSON_EXTENSION}"))
                    .await?;
                let gz = json.with_file_name(format!("{hash}.{GZIP_EXTENSION}"));
                Ok(EntryPaths { json, gz })
            }
            None => Ok(EntryPaths::in_dir(&self.base_dir, &hash)),
        }
    }

    /// Every directory a cleanup pass should scan
    pub async fn scan_directories(&self) -> Result<Vec<PathBuf>> {
        let mut dirs = vec![self.base_dir.clone()];
        if let Some(storage) = &self.storage {
            dirs.extend(
                storage
                    .existing_partitions()
                    .await?
                    .into_iter()
                    .map(|(_, path)| path),
            );
        }
        Ok(dirs)
    }
}
