//! The two-tier cache engine
//!
//! A [`Cache`] keeps hot entries in an LRU memory tier and every entry in a
//! directory of JSON files, optionally gzip-compressed and sharded into
//! partitions. Disk I/O runs behind a circuit breaker; a cleanup timer and a
//! memory pressure sampler run in the background for the cache's lifetime.

mod builder;
mod cleanup;
mod eviction;
mod internal;
mod operations;
mod paths;
mod types;

pub use builder::CacheBuilder;
pub use types::Cache;

#[cfg(test)]
mod tests;
