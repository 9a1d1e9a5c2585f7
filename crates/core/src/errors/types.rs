use std::path::PathBuf;

/// Result type alias for cache operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for cache operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input rejected before any I/O happened (oversized entry, bad option)
    #[error("validation failed for '{subject}': {message}")]
    Validation { subject: String, message: String },

    /// File system operations
    #[error("file system {operation} operation failed for '{path}': {source}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    /// Entry bytes failed their integrity check
    #[error("checksum mismatch for key '{key}': expected {expected}, got {actual}")]
    Checksum {
        key: String,
        expected: String,
        actual: String,
    },

    /// Temp-file write or rename failed; a backup of the previous file may exist
    #[error("atomic write to '{path}' failed during {stage}: {source}")]
    AtomicWrite {
        path: PathBuf,
        stage: &'static str,
        backup_path: Option<PathBuf>,
        #[source]
        source: std::io::Error,
    },

    /// The circuit breaker rejected the call without attempting any I/O
    #[error("circuit breaker is open, rejected {operation}")]
    CircuitOpen { operation: String },

    /// Compression or decompression failure
    #[error("{operation} failed: {source}")]
    Compression {
        operation: &'static str,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization errors
    #[error("failed to {operation} entry for key '{key}': {source}")]
    Serialization {
        key: String,
        operation: &'static str,
        #[source]
        source: serde_json::Error,
    },

    /// Configuration errors
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// The background worker pool could not run the task
    #[error("worker pool error: {message}")]
    WorkerPool { message: String },
}
