//! Work units executed on the background pool

use crate::compression::{gunzip, gzip};
use crate::entry::EntryExpiry;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tiercache_core::{Error, Result};
use tiercache_utils::atomic_file::{BACKUP_EXTENSION, TEMP_EXTENSION};
use walkdir::WalkDir;

/// Temp and backup files younger than this may belong to a write in flight
pub const ORPHAN_MIN_AGE: Duration = Duration::from_secs(60);

/// A unit of blocking work submitted to the pool
#[derive(Debug, Clone)]
pub enum BackgroundTask {
    /// Find expired, unreadable and orphaned files in each directory
    ScanDirectories {
        directories: Vec<PathBuf>,
        now_ms: u64,
    },
    Compress {
        data: Arc<[u8]>,
        level: u32,
    },
    Decompress {
        data: Arc<[u8]>,
    },
}

impl BackgroundTask {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ScanDirectories { .. } => "scan",
            Self::Compress { .. } => "compress",
            Self::Decompress { .. } => "decompress",
        }
    }
}

/// Result of a completed [`BackgroundTask`]
#[derive(Debug, Clone)]
pub enum TaskOutput {
    Scanned(ScanResult),
    Compressed(Vec<u8>),
    Decompressed(Vec<u8>),
}

/// Why a scan selected a file for removal
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RemovalReason {
    Expired,
    Corrupted,
    Orphaned,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemovalCandidate {
    pub path: PathBuf,
    pub reason: RemovalReason,
    pub size: u64,
}

/// Files a scan looked at and the ones it wants removed.
///
/// Scanning never deletes anything itself.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanResult {
    pub scanned: u64,
    pub candidates: Vec<RemovalCandidate>,
}

/// What one cleanup pass removed
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CleanupReport {
    pub scanned: u64,
    pub expired_removed: u64,
    pub corrupted_removed: u64,
    pub orphans_removed: u64,
    pub memory_expired: u64,
    pub bytes_freed: u64,
    pub errors: u64,
}

impl CleanupReport {
    pub fn total_removed(&self) -> u64 {
        self.expired_removed + self.corrupted_removed + self.orphans_removed + self.memory_expired
    }

    /// Count a candidate that was actually deleted
    pub fn record_removal(&mut self, candidate: &RemovalCandidate) {
        match candidate.reason {
            RemovalReason::Expired => self.expired_removed += 1,
            RemovalReason::Corrupted => self.corrupted_removed += 1,
            RemovalReason::Orphaned => self.orphans_removed += 1,
        }
        self.bytes_freed += candidate.size;
    }
}

pub(crate) fn run_task(task: BackgroundTask) -> Result<TaskOutput> {
    match task {
        BackgroundTask::ScanDirectories {
            directories,
            now_ms,
        } => scan_directories(&directories, now_ms).map(TaskOutput::Scanned),
        BackgroundTask::Compress { data, level } => gzip(&data, level).map(TaskOutput::Compressed),
        BackgroundTask::Decompress { data } => gunzip(&data).map(TaskOutput::Decompressed),
    }
}

enum FileKind {
    Entry { gzipped: bool },
    Orphan,
    Other,
}

fn classify(path: &Path) -> FileKind {
    let name = match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => name,
        None => return FileKind::Other,
    };

    if name.ends_with(".json.gz") {
        FileKind::Entry { gzipped: true }
    } else if name.ends_with(".json") {
        FileKind::Entry { gzipped: false }
    } else {
        match path.extension().and_then(|e| e.to_str()) {
            Some(TEMP_EXTENSION) | Some(BACKUP_EXTENSION) => FileKind::Orphan,
            _ => FileKind::Other,
        }
    }
}

/// Synchronous scan of the top level of each directory.
///
/// Missing directories are empty; any other listing failure is an error.
pub(crate) fn scan_directories(directories: &[PathBuf], now_ms: u64) -> Result<ScanResult> {
    let mut result = ScanResult::default();

    for dir in directories {
        for entry in WalkDir::new(dir).min_depth(1).max_depth(1) {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    let path = e.path().map_or_else(|| dir.clone(), Path::to_path_buf);
                    match e.into_io_error() {
                        Some(io) if io.kind() == ErrorKind::NotFound => continue,
                        Some(io) => {
                            return Err(Error::file_system(path, "scan cache directory", io))
                        }
                        None => continue,
                    }
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            result.scanned += 1;
            if let Some(candidate) = inspect_file(entry.path(), now_ms) {
                result.candidates.push(candidate);
            }
        }
    }

    Ok(result)
}

fn inspect_file(path: &Path, now_ms: u64) -> Option<RemovalCandidate> {
    let meta = fs::metadata(path).ok()?;

    let reason = match classify(path) {
        FileKind::Entry { gzipped } => {
            // Vanished or unreadable right now: leave it for the next pass
            let bytes = fs::read(path).ok()?;
            match read_expiry(bytes, gzipped) {
                Some(expiry) if expiry.is_expired_at(now_ms) => RemovalReason::Expired,
                Some(_) => return None,
                None => RemovalReason::Corrupted,
            }
        }
        FileKind::Orphan => {
            let age = meta
                .modified()
                .ok()
                .and_then(|modified| SystemTime::now().duration_since(modified).ok())?;
            if age <= ORPHAN_MIN_AGE {
                return None;
            }
            RemovalReason::Orphaned
        }
        FileKind::Other => return None,
    };

    Some(RemovalCandidate {
        path: path.to_path_buf(),
        reason,
        size: meta.len(),
    })
}

fn read_expiry(bytes: Vec<u8>, gzipped: bool) -> Option<EntryExpiry> {
    let bytes = if gzipped { gunzip(&bytes).ok()? } else { bytes };
    serde_json::from_slice(&bytes).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write_entry(dir: &Path, name: &str, timestamp: u64, ttl: u64) -> PathBuf {
        let path = dir.join(name);
        let body = serde_json::json!({
            "data": "x", "timestamp": timestamp, "hash": "h", "size": 3, "ttl": ttl,
            "compressed": false, "access_count": 0, "last_accessed": timestamp,
        });
        fs::write(&path, serde_json::to_vec(&body).unwrap()).unwrap();
        path
    }

    fn reasons(result: &ScanResult) -> Vec<(String, RemovalReason)> {
        let mut found: Vec<_> = result
            .candidates
            .iter()
            .map(|c| {
                let name = c.path.file_name().unwrap().to_string_lossy().into_owned();
                (name, c.reason)
            })
            .collect();
        found.sort();
        found
    }

    #[test]
    fn test_scan_selects_expired_and_corrupted() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        let fresh = write_entry(dir, "fresh.json", 1_000, 10_000);
        let stale = write_entry(dir, "stale.json", 1_000, 10);
        let broken = dir.join("broken.json");
        fs::write(&broken, b"{not json").unwrap();
        fs::write(dir.join("notes.txt"), b"keep me").unwrap();

        let result = scan_directories(&[dir.to_path_buf()], 5_000).unwrap();

        assert_eq!(result.scanned, 4);
        assert_eq!(
            reasons(&result),
            vec![
                ("broken.json".to_string(), RemovalReason::Corrupted),
                ("stale.json".to_string(), RemovalReason::Expired),
            ]
        );
        // Nothing is deleted by the scan itself
        assert!(fresh.exists());
        assert!(stale.exists());
        assert!(broken.exists());
    }

    #[test]
    fn test_scan_reads_gzipped_entries() {
        let temp_dir = TempDir::new().unwrap();
        let dir = temp_dir.path();
        let plain = write_entry(dir, "tmp-source.json", 0, 1);
        let gz_path = dir.join("entry.json.gz");
        fs::write(&gz_path, gzip(&fs::read(&plain).unwrap(), 6).unwrap()).unwrap();
        fs::remove_file(&plain).unwrap();

        let result = scan_directories(&[dir.to_path_buf()], 10).unwrap();
        assert_eq!(
            reasons(&result),
            vec![("entry.json.gz".to_string(), RemovalReason::Expired)]
        );
        assert_eq!(result.candidates[0].size, fs::metadata(&gz_path).unwrap().len());
    }

    #[test]
    fn test_recent_temp_files_are_kept() {
        let temp_dir = TempDir::new().unwrap();
        let temp_file = temp_dir.path().join(".entry.json.1234.tmp");
        fs::write(&temp_file, b"partial").unwrap();

        let result = scan_directories(&[temp_dir.path().to_path_buf()], 0).unwrap();
        assert_eq!(result.scanned, 1);
        assert!(result.candidates.is_empty());
    }

    #[test]
    fn test_missing_directory_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let result = scan_directories(&[temp_dir.path().join("p9")], 0).unwrap();
        assert_eq!(result, ScanResult::default());
    }

    #[test]
    fn test_report_counts_removals_by_reason() {
        let mut report = CleanupReport::default();
        for (reason, size) in [
            (RemovalReason::Expired, 10),
            (RemovalReason::Corrupted, 5),
            (RemovalReason::Orphaned, 1),
        ] {
            report.record_removal(&RemovalCandidate {
                path: PathBuf::from("x"),
                reason,
                size,
            });
        }
        assert_eq!(report.total_removed(), 3);
        assert_eq!(report.bytes_freed, 16);
    }

    #[test]
    fn test_run_task_compress_round_trip() {
        let data: Arc<[u8]> = Arc::from(vec![7u8; 4096]);
        let compressed = match run_task(BackgroundTask::Compress {
            data: Arc::clone(&data),
            level: 6,
        })
        .unwrap()
        {
            TaskOutput::Compressed(bytes) => bytes,
            other => panic!("unexpected output {other:?}"),
        };
        assert!(compressed.len() < data.len());

        match run_task(BackgroundTask::Decompress {
            data: Arc::from(compressed),
        })
        .unwrap()
        {
            TaskOutput::Decompressed(bytes) => assert_eq!(&bytes[..], &data[..]),
            other => panic!("unexpected output {other:?}"),
        }
    }
}
