//! Bulk variants of the single-key operations
//!
//! Each batch runs its per-key operations concurrently and returns results
//! in the order the keys were given.

use futures::future::join_all;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tiercache_core::Result;

use crate::core::types::Cache;

impl Cache {
    pub async fn batch_get<T>(&self, keys: &[&str]) -> Vec<Option<T>>
    where
        T: DeserializeOwned,
    {
        join_all(keys.iter().map(|key| self.get::<T>(key, None))).await
    }

    /// Store every `(key, value)` pair with the same `ttl`.
    ///
    /// Failures do not stop the other writes.
    pub async fn batch_set<T>(
        &self,
        entries: &[(&str, T)],
        ttl: Option<Duration>,
    ) -> Vec<Result<()>>
    where
        T: Serialize,
    {
        join_all(entries.iter().map(|(key, value)| self.set(key, value, ttl))).await
    }

    pub async fn batch_delete(&self, keys: &[&str]) -> Vec<bool> {
        join_all(keys.iter().map(|key| self.delete(key))).await
    }

    pub async fn batch_has(&self, keys: &[&str]) -> Vec<bool> {
        join_all(keys.iter().map(|key| self.has(key))).await
    }
}
