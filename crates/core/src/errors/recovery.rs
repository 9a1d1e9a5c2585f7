//! Recovery utilities for cache errors

use super::types::Error;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;

/// What a caller can do about a failure
#[derive(Debug, Clone, PartialEq)]
pub enum RecoveryHint {
    /// Retry the operation after a short delay
    Retry { after: Duration },
    /// Check permissions of the path involved
    CheckPermissions { path: PathBuf },
    /// Drop the cached entry and recompute it
    ClearAndRetry,
    /// Wait for the circuit breaker cooldown before retrying
    WaitForCircuit,
    /// Run the work inline instead of on the worker pool
    UseFallback,
    /// No automated recovery possible
    Manual { instructions: String },
}

impl Error {
    /// Get the recovery hint for this error
    #[must_use]
    pub fn recovery_hint(&self) -> RecoveryHint {
        match self {
            Self::Validation { message, .. } => RecoveryHint::Manual {
                instructions: message.clone(),
            },
            Self::FileSystem { path, source, .. } | Self::AtomicWrite { path, source, .. } => {
                match source.kind() {
                    ErrorKind::PermissionDenied => {
                        RecoveryHint::CheckPermissions { path: path.clone() }
                    }
                    _ => RecoveryHint::Retry {
                        after: Duration::from_millis(100),
                    },
                }
            }
            Self::Checksum { .. } | Self::Compression { .. } | Self::Serialization { .. } => {
                RecoveryHint::ClearAndRetry
            }
            Self::CircuitOpen { .. } => RecoveryHint::WaitForCircuit,
            Self::WorkerPool { .. } => RecoveryHint::UseFallback,
            Self::Configuration { message } => RecoveryHint::Manual {
                instructions: format!("Fix the cache configuration: {message}"),
            },
        }
    }

    /// Check if this error is transient and can be retried
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self.recovery_hint(),
            RecoveryHint::Retry { .. } | RecoveryHint::WaitForCircuit | RecoveryHint::UseFallback
        )
    }

    /// Check if this error indicates data corruption
    #[must_use]
    pub fn is_corruption(&self) -> bool {
        matches!(
            self,
            Self::Checksum { .. } | Self::Compression { .. } | Self::Serialization { .. }
        )
    }

    /// Check if this error is the breaker's fail-fast rejection
    #[must_use]
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, Self::CircuitOpen { .. })
    }
}
