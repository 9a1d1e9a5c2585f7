//! On-disk layout of entry files

mod partition;

pub use partition::{PartitionInfo, PartitionedStorage, ENTRY_OVERHEAD_BYTES};

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub const JSON_EXTENSION: &str = "json";
pub const GZIP_EXTENSION: &str = "json.gz";

/// Hex SHA-256 of a cache key; names the entry file and is the default fingerprint
pub fn hash_key(key: &str) -> String {
    hex::encode(Sha256::digest(key.as_bytes()))
}

/// The two files an entry may live in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryPaths {
    pub json: PathBuf,
    pub gz: PathBuf,
}

impl EntryPaths {
    /// Paths inside `dir` for a key whose hash is `hash`
    pub fn in_dir(dir: &Path, hash: &str) -> Self {
        Self {
            json: dir.join(format!("{hash}.{JSON_EXTENSION}")),
            gz: dir.join(format!("{hash}.{GZIP_EXTENSION}")),
        }
    }

    /// `(target, stale sibling)` for a write
    pub fn for_write(&self, compressed: bool) -> (&Path, &Path) {
        if compressed {
            (&self.gz, &self.json)
        } else {
            (&self.json, &self.gz)
        }
    }
}

/// Entry files and bytes found in one directory
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DirUsage {
    pub file_count: u64,
    pub total_size: u64,
}

/// Count entry files at the top level of `dir`
pub fn scan_usage(dir: &Path) -> DirUsage {
    let mut usage = DirUsage::default();
    for entry in WalkDir::new(dir)
        .min_depth(1)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
    {
        let is_entry = entry
            .file_name()
            .to_str()
            .map_or(false, |n| n.ends_with(".json") || n.ends_with(".json.gz"));
        if is_entry {
            usage.file_count += 1;
            usage.total_size += entry.metadata().map(|m| m.len()).unwrap_or(0);
        }
    }
    usage
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_hash_key_is_sha256_hex() {
        assert_eq!(
            hash_key(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
        assert_eq!(hash_key("user:1").len(), 64);
    }

    #[test]
    fn test_entry_paths() {
        let paths = EntryPaths::in_dir(Path::new("/c/p3"), "abc");
        assert_eq!(paths.json, PathBuf::from("/c/p3/abc.json"));
        assert_eq!(paths.gz, PathBuf::from("/c/p3/abc.json.gz"));
        assert_eq!(paths.for_write(true), (paths.gz.as_path(), paths.json.as_path()));
    }

    #[test]
    fn test_scan_usage_counts_entry_files_only() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join("a.json"), "1234").unwrap();
        std::fs::write(temp_dir.path().join("b.json.gz"), "12").unwrap();
        std::fs::write(temp_dir.path().join(".a.json.x.tmp"), "123456").unwrap();

        let usage = scan_usage(temp_dir.path());
        assert_eq!(usage.file_count, 2);
        assert_eq!(usage.total_size, 6);
    }
}
