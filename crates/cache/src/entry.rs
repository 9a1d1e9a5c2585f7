//! The record stored in both cache tiers

use serde::{Deserialize, Serialize};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Milliseconds since the Unix epoch
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// A cached value together with its bookkeeping.
///
/// The memory tier and the persistent tier each own an independent copy;
/// updating the access metadata of one never touches the other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry<T> {
    pub data: T,
    /// Creation time, ms since epoch
    pub timestamp: u64,
    /// Fingerprint compared against the caller's input hash
    pub hash: String,
    /// Serialized length of `data` in bytes
    pub size: u64,
    /// Time-to-live in ms
    pub ttl: u64,
    pub compressed: bool,
    pub access_count: u64,
    pub last_accessed: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checksum: Option<String>,
}

/// Metadata folded into an entry's checksum
#[derive(Debug, Clone, Copy)]
pub struct EntryMetadata<'a> {
    pub timestamp: u64,
    pub ttl: u64,
    pub hash: &'a str,
    pub size: u64,
}

impl<T> CacheEntry<T> {
    pub fn new(data: T, hash: String, size: u64, ttl: Duration) -> Self {
        let now = now_millis();
        Self {
            data,
            timestamp: now,
            hash,
            size,
            ttl: ttl.as_millis() as u64,
            compressed: false,
            access_count: 0,
            last_accessed: now,
            checksum: None,
        }
    }

    /// Expired once strictly more than `ttl` ms have passed since creation
    pub fn is_expired_at(&self, now: u64) -> bool {
        now.saturating_sub(self.timestamp) > self.ttl
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_millis())
    }

    /// An absent input hash matches any entry
    pub fn matches_hash(&self, input_hash: Option<&str>) -> bool {
        input_hash.map_or(true, |h| h == self.hash)
    }

    pub fn is_valid(&self, input_hash: Option<&str>) -> bool {
        !self.is_expired() && self.matches_hash(input_hash)
    }

    /// Record a read or existence check
    pub fn touch(&mut self) {
        self.access_count = self.access_count.saturating_add(1);
        self.last_accessed = now_millis();
    }

    pub fn expires_at(&self) -> u64 {
        self.timestamp.saturating_add(self.ttl)
    }

    pub fn metadata(&self) -> EntryMetadata<'_> {
        EntryMetadata {
            timestamp: self.timestamp,
            ttl: self.ttl,
            hash: &self.hash,
            size: self.size,
        }
    }
}

/// The fields needed to decide expiry, read without materializing `data`
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct EntryExpiry {
    pub timestamp: u64,
    pub ttl: u64,
}

impl EntryExpiry {
    pub fn is_expired_at(&self, now: u64) -> bool {
        now.saturating_sub(self.timestamp) > self.ttl
    }
}
