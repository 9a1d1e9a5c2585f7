//! Builder methods for creating errors with context

use super::types::Error;
use std::path::PathBuf;

impl Error {
    /// Create a validation error
    #[must_use]
    pub fn validation(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Validation {
            subject: subject.into(),
            message: message.into(),
        }
    }

    /// Create a file system error
    #[must_use]
    pub fn file_system(
        path: impl Into<PathBuf>,
        operation: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Error::FileSystem {
            path: path.into(),
            operation: operation.into(),
            source,
        }
    }

    /// Create a checksum mismatch error
    #[must_use]
    pub fn checksum(
        key: impl Into<String>,
        expected: impl Into<String>,
        actual: impl Into<String>,
    ) -> Self {
        Error::Checksum {
            key: key.into(),
            expected: expected.into(),
            actual: actual.into(),
        }
    }

    /// Create an atomic write error
    #[must_use]
    pub fn atomic_write(
        path: impl Into<PathBuf>,
        stage: &'static str,
        backup_path: Option<PathBuf>,
        source: std::io::Error,
    ) -> Self {
        Error::AtomicWrite {
            path: path.into(),
            stage,
            backup_path,
            source,
        }
    }

    /// Create a breaker-open rejection
    #[must_use]
    pub fn circuit_open(operation: impl Into<String>) -> Self {
        Error::CircuitOpen {
            operation: operation.into(),
        }
    }

    /// Create a compression error
    #[must_use]
    pub fn compression(operation: &'static str, source: std::io::Error) -> Self {
        Error::Compression { operation, source }
    }

    /// Create a serialization error
    #[must_use]
    pub fn serialization(
        key: impl Into<String>,
        operation: &'static str,
        source: serde_json::Error,
    ) -> Self {
        Error::Serialization {
            key: key.into(),
            operation,
            source,
        }
    }

    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Create a worker pool error
    #[must_use]
    pub fn worker_pool(message: impl Into<String>) -> Self {
        Error::WorkerPool {
            message: message.into(),
        }
    }
}
