//! Atomic file operations to prevent corrupted cache files
//!
//! Writes land in a temporary sibling first and are renamed over the target,
//! so a reader observes either the previous file or the new one, never a
//! partially written one.

use async_trait::async_trait;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tiercache_core::{Error, Result};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

/// Extension given to in-flight temporary files
pub const TEMP_EXTENSION: &str = "tmp";

/// Extension given to snapshots of a replaced file
pub const BACKUP_EXTENSION: &str = "bak";

/// Outcome of a successful write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteOutcome {
    pub success: bool,
    /// Snapshot of the file that was replaced, when backups are kept
    pub backup_path: Option<PathBuf>,
}

/// Outcome of a successful delete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeleteOutcome {
    pub success: bool,
    /// Whether the file was present before the call
    pub existed: bool,
}

/// Filesystem primitives used by the persistent cache tier.
///
/// A missing file is never an error: reads yield `None` and deletes report
/// `existed: false`. Every other failure is surfaced so callers can count it.
#[async_trait]
pub trait FileOperations: Send + Sync {
    /// Read a whole file, `None` if it does not exist
    async fn read_file(&self, path: &Path) -> Result<Option<Vec<u8>>>;

    /// Replace the file at `path` with `content`
    async fn write_file(&self, path: &Path, content: &[u8]) -> Result<WriteOutcome>;

    /// Remove a file
    async fn delete_file(&self, path: &Path) -> Result<DeleteOutcome>;

    /// Check whether a file exists
    async fn exists(&self, path: &Path) -> Result<bool>;

    /// Remove a directory tree; a missing directory is not an error
    async fn remove_dir_all(&self, path: &Path) -> Result<()>;
}

/// Crash-safe implementation: temp file, optional backup, then rename
#[derive(Debug, Clone, Default)]
pub struct AtomicFileOperations {
    keep_backups: bool,
}

impl AtomicFileOperations {
    pub fn new(keep_backups: bool) -> Self {
        Self { keep_backups }
    }

    fn temp_path(path: &Path) -> PathBuf {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        path.with_file_name(format!(".{name}.{}.{TEMP_EXTENSION}", Uuid::new_v4()))
    }

    fn backup_path(path: &Path) -> PathBuf {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        path.with_file_name(format!("{name}.{BACKUP_EXTENSION}"))
    }

    async fn write_temp(temp_path: &Path, content: &[u8]) -> std::io::Result<()> {
        let mut file = fs::File::create(temp_path).await?;
        file.write_all(content).await?;
        file.sync_all().await?;
        Ok(())
    }
}

#[async_trait]
impl FileOperations for AtomicFileOperations {
    async fn read_file(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        read_optional(path).await
    }

    async fn write_file(&self, path: &Path, content: &[u8]) -> Result<WriteOutcome> {
        ensure_parent(path).await?;

        let temp_path = Self::temp_path(path);
        if let Err(e) = Self::write_temp(&temp_path, content).await {
            let _ = fs::remove_file(&temp_path).await;
            return Err(Error::atomic_write(path, "write temporary file", None, e));
        }

        // Snapshot the current file so it can be restored if the rename fails
        let backup_path = Self::backup_path(path);
        let backup = match fs::copy(path, &backup_path).await {
            Ok(_) => Some(backup_path),
            Err(e) if e.kind() == ErrorKind::NotFound => None,
            Err(e) => {
                let _ = fs::remove_file(&temp_path).await;
                return Err(Error::atomic_write(path, "snapshot backup", None, e));
            }
        };

        if let Err(e) = fs::rename(&temp_path, path).await {
            let _ = fs::remove_file(&temp_path).await;
            if let Some(backup) = &backup {
                if fs::metadata(path).await.is_err() {
                    if let Err(restore) = fs::rename(backup, path).await {
                        tracing::error!(
                            "Failed to restore {} from backup: {}",
                            path.display(),
                            restore
                        );
                    }
                }
            }
            return Err(Error::atomic_write(path, "rename into place", backup, e));
        }

        let backup_path = match backup {
            Some(backup) if !self.keep_backups => {
                if let Err(e) = fs::remove_file(&backup).await {
                    tracing::debug!("Failed to drop backup {}: {}", backup.display(), e);
                }
                None
            }
            other => other,
        };

        Ok(WriteOutcome {
            success: true,
            backup_path,
        })
    }

    async fn delete_file(&self, path: &Path) -> Result<DeleteOutcome> {
        delete_optional(path).await
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        exists(path).await
    }

    async fn remove_dir_all(&self, path: &Path) -> Result<()> {
        remove_tree(path).await
    }
}

/// Direct writes with no temp file; used when atomic operations are disabled
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectFileOperations;

#[async_trait]
impl FileOperations for DirectFileOperations {
    async fn read_file(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        read_optional(path).await
    }

    async fn write_file(&self, path: &Path, content: &[u8]) -> Result<WriteOutcome> {
        ensure_parent(path).await?;
        match fs::write(path, content).await {
            Ok(()) => Ok(WriteOutcome {
                success: true,
                backup_path: None,
            }),
            Err(e) => Err(Error::file_system(path, "write", e)),
        }
    }

    async fn delete_file(&self, path: &Path) -> Result<DeleteOutcome> {
        delete_optional(path).await
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        exists(path).await
    }

    async fn remove_dir_all(&self, path: &Path) -> Result<()> {
        remove_tree(path).await
    }
}

async fn ensure_parent(path: &Path) -> Result<()> {
    let parent = match path.parent() {
        Some(parent) => parent,
        None => {
            return Err(Error::configuration(format!(
                "Invalid file path '{}': no parent directory",
                path.display()
            )))
        }
    };

    fs::create_dir_all(parent)
        .await
        .map_err(|e| Error::file_system(parent, "create parent directory", e))
}

async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::file_system(path, "read", e)),
    }
}

async fn delete_optional(path: &Path) -> Result<DeleteOutcome> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(DeleteOutcome {
            success: true,
            existed: true,
        }),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(DeleteOutcome {
            success: true,
            existed: false,
        }),
        Err(e) => Err(Error::file_system(path, "delete", e)),
    }
}

async fn exists(path: &Path) -> Result<bool> {
    match fs::metadata(path).await {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
        Err(e) => Err(Error::file_system(path, "stat", e)),
    }
}

async fn remove_tree(path: &Path) -> Result<()> {
    match fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(Error::file_system(path, "remove directory", e)),
    }
}
