//! Integrity digests over entry data and metadata

use crate::entry::{CacheEntry, EntryMetadata};
use serde_json::Value;
use sha2::{Digest, Sha256};
use tiercache_core::{Error, Result};

/// Outcome of checking an entry against its stored checksum
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub error: Option<String>,
}

impl ValidationResult {
    fn valid() -> Self {
        Self {
            is_valid: true,
            error: None,
        }
    }

    fn invalid(error: String) -> Self {
        Self {
            is_valid: false,
            error: Some(error),
        }
    }
}

/// Computes and verifies SHA-256 digests of cache entries
#[derive(Debug, Clone, Copy, Default)]
pub struct ChecksumValidator;

impl ChecksumValidator {
    /// Digest over the serialized data followed by the entry metadata.
    ///
    /// `data` must be the canonical `serde_json` encoding of the entry's
    /// `Value`, which is what [`validate_entry`](Self::validate_entry) re-derives.
    pub fn calculate_checksum(data: &[u8], metadata: &EntryMetadata<'_>) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data);
        hasher.update(
            format!(
                "|{}|{}|{}|{}",
                metadata.timestamp, metadata.ttl, metadata.hash, metadata.size
            )
            .as_bytes(),
        );
        hex::encode(hasher.finalize())
    }

    /// Check `entry` against its stored checksum, reporting a mismatch as
    /// [`Error::Checksum`] for `key`.
    ///
    /// Entries written without a checksum are accepted as-is.
    pub fn verify(key: &str, entry: &CacheEntry<Value>) -> Result<()> {
        let expected = match &entry.checksum {
            Some(checksum) => checksum,
            None => return Ok(()),
        };

        let data = serde_json::to_vec(&entry.data)
            .map_err(|e| Error::serialization(key, "encode entry data", e))?;

        let actual = Self::calculate_checksum(&data, &entry.metadata());
        if &actual == expected {
            Ok(())
        } else {
            Err(Error::checksum(key, expected.as_str(), actual))
        }
    }

    pub fn validate_entry(entry: &CacheEntry<Value>) -> ValidationResult {
        match Self::verify(&entry.hash, entry) {
            Ok(()) => ValidationResult::valid(),
            Err(e) => ValidationResult::invalid(e.to_string()),
        }
    }
}
