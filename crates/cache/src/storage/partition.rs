//! Sharding of entry files across `p<N>` subdirectories

use super::{scan_usage, DirUsage};
use parking_lot::Mutex;
use serde::Serialize;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tiercache_core::{Error, Result};
use tokio::fs;

/// Bytes of bookkeeping assumed per file when estimating memory use
pub const ENTRY_OVERHEAD_BYTES: u64 = 256;

const PARTITION_PREFIX: &str = "p";

/// Usage of a single partition directory
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PartitionInfo {
    pub partition_id: u32,
    pub path: PathBuf,
    pub file_count: u64,
    pub total_size: u64,
}

impl PartitionInfo {
    /// Rough memory needed to hold this partition's entries
    pub fn estimated_memory(&self) -> u64 {
        self.total_size + self.file_count * ENTRY_OVERHEAD_BYTES
    }
}

/// Maps keys onto a fixed set of shard directories under a base directory
#[derive(Debug)]
pub struct PartitionedStorage {
    base_dir: PathBuf,
    partition_count: u32,
    created: Mutex<HashSet<u32>>,
}

impl PartitionedStorage {
    /// Prepare `base_dir` for partitioned layout
    pub async fn new(base_dir: PathBuf, partition_count: u32) -> Result<Self> {
        if partition_count == 0 {
            return Err(Error::validation("partition_count", "must be greater than zero"));
        }

        fs::create_dir_all(&base_dir)
            .await
            .map_err(|e| Error::file_system(&base_dir, "create partition root", e))?;

        let meta = fs::metadata(&base_dir)
            .await
            .map_err(|e| Error::file_system(&base_dir, "inspect partition root", e))?;
        if meta.permissions().readonly() {
            return Err(Error::file_system(
                &base_dir,
                "open partition root",
                std::io::Error::new(std::io::ErrorKind::PermissionDenied, "read-only directory"),
            ));
        }

        Ok(Self {
            base_dir,
            partition_count,
            created: Mutex::new(HashSet::new()),
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn partition_count(&self) -> u32 {
        self.partition_count
    }

    /// Partition for `key`: the first four bytes of its SHA-256, modulo the count
    pub fn partition_for(&self, key: &str) -> u32 {
        let digest = Sha256::digest(key.as_bytes());
        let prefix = u32::from_be_bytes([digest[0], digest[1], digest[2], digest[3]]);
        prefix % self.partition_count
    }

    pub fn partition_dir(&self, partition_id: u32) -> PathBuf {
        self.base_dir.join(format!("{PARTITION_PREFIX}{partition_id}"))
    }

    /// Path of `filename` inside the partition owning `key`, without touching disk
    pub fn resolve(&self, key: &str, filename: &str) -> PathBuf {
        self.partition_dir(self.partition_for(key)).join(filename)
    }

    /// Like [`resolve`](Self::resolve), creating the partition directory on first use
    pub async fn get_partitioned_path(&self, key: &str, filename: &str) -> Result<PathBuf> {
        let partition_id = self.partition_for(key);
        let dir = self.partition_dir(partition_id);

        if !self.created.lock().contains(&partition_id) {
            fs::create_dir_all(&dir)
                .await
                .map_err(|e| Error::file_system(&dir, "create partition directory", e))?;
            self.created.lock().insert(partition_id);
        }

        Ok(dir.join(filename))
    }

    /// Forget which directories exist, after they were removed wholesale
    pub fn reset(&self) {
        self.created.lock().clear();
    }

    /// Partition directories currently present on disk
    pub async fn existing_partitions(&self) -> Result<Vec<(u32, PathBuf)>> {
        let mut read_dir = match fs::read_dir(&self.base_dir).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(Error::file_system(&self.base_dir, "list partitions", e)),
        };

        let mut partitions = Vec::new();
        while let Some(entry) = read_dir
            .next_entry()
            .await
            .map_err(|e| Error::file_system(&self.base_dir, "list partitions", e))?
        {
            let name = entry.file_name();
            let id = name
                .to_str()
                .and_then(|n| n.strip_prefix(PARTITION_PREFIX))
                .and_then(|n| n.parse::<u32>().ok());
            if let Some(id) = id {
                if id < self.partition_count && entry.path().is_dir() {
                    partitions.push((id, entry.path()));
                }
            }
        }
        partitions.sort_by_key(|(id, _)| *id);
        Ok(partitions)
    }

    /// Recount files and bytes in every existing partition
    pub async fn partition_stats(&self) -> Result<Vec<PartitionInfo>> {
        let partitions = self.existing_partitions().await?;
        let dirs: Vec<PathBuf> = partitions.iter().map(|(_, path)| path.clone()).collect();

        let usages = tokio::task::spawn_blocking(move || {
            dirs.iter().map(|d| scan_usage(d)).collect::<Vec<DirUsage>>()
        })
        .await
        .map_err(|e| Error::worker_pool(format!("partition scan did not finish: {e}")))?;

        Ok(partitions
            .into_iter()
            .zip(usages)
            .map(|((partition_id, path), usage)| PartitionInfo {
                partition_id,
                path,
                file_count: usage.file_count,
                total_size: usage.total_size,
            })
            .collect())
    }

    pub async fn estimated_memory_usage(&self) -> Result<u64> {
        Ok(self
            .partition_stats()
            .await?
            .iter()
            .map(PartitionInfo::estimated_memory)
            .sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_paths_are_deterministic() {
        let temp_dir = TempDir::new().unwrap();
        let storage = PartitionedStorage::new(temp_dir.path().to_path_buf(), 256)
            .await
            .unwrap();

        let first = storage.get_partitioned_path("user:1", "a.json").await.unwrap();
        let second = storage.get_partitioned_path("user:1", "a.json").await.unwrap();
        assert_eq!(first, second);
        assert!(first.parent().unwrap().is_dir());

        // A second instance over the same directory agrees
        let reopened = PartitionedStorage::new(temp_dir.path().to_path_buf(), 256)
            .await
            .unwrap();
        assert_eq!(reopened.resolve("user:1", "a.json"), first);
    }

    #[tokio::test]
    async fn test_resolve_does_not_create_directories() {
        let temp_dir = TempDir::new().unwrap();
        let storage = PartitionedStorage::new(temp_dir.path().to_path_buf(), 16)
            .await
            .unwrap();

        let path = storage.resolve("key", "x.json");
        assert!(!path.parent().unwrap().exists());
        assert!(storage.existing_partitions().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_partition_stats() {
        let temp_dir = TempDir::new().unwrap();
        let storage = PartitionedStorage::new(temp_dir.path().to_path_buf(), 4)
            .await
            .unwrap();

        for (key, body) in [("a", "12345"), ("b", "1234567890"), ("c", "1")] {
            let path = storage.get_partitioned_path(key, &format!("{key}.json")).await.unwrap();
            std::fs::write(path, body).unwrap();
        }

        let stats = storage.partition_stats().await.unwrap();
        let files: u64 = stats.iter().map(|p| p.file_count).sum();
        let bytes: u64 = stats.iter().map(|p| p.total_size).sum();
        assert_eq!(files, 3);
        assert_eq!(bytes, 16);
        assert!(stats.iter().all(|p| p.partition_id < 4));
        assert_eq!(
            storage.estimated_memory_usage().await.unwrap(),
            16 + 3 * ENTRY_OVERHEAD_BYTES
        );
    }

    #[tokio::test]
    async fn test_zero_partitions_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let err = PartitionedStorage::new(temp_dir.path().to_path_buf(), 0)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Validation { .. }));
    }

    fn storage_for(count: u32) -> PartitionedStorage {
        PartitionedStorage {
            base_dir: PathBuf::from("/cache"),
            partition_count: count,
            created: Mutex::new(HashSet::new()),
        }
    }

    proptest! {
        #[test]
        fn prop_partition_is_stable_and_in_range(key in ".{0,64}", count in 1u32..1024) {
            let storage = storage_for(count);
            let id = storage.partition_for(&key);
            prop_assert!(id < count);
            prop_assert_eq!(id, storage_for(count).partition_for(&key));
            prop_assert_eq!(storage.resolve(&key, "f.json"), storage.resolve(&key, "f.json"));
        }
    }
}
