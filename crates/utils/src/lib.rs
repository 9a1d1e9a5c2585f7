//! Shared utilities for tiercache
//!
//! This crate holds the building blocks the cache engine wraps around its
//! persistent tier: crash-safe file operations, the circuit breaker that
//! isolates filesystem failures, and tracing setup.

pub mod atomic_file;
pub mod resilience;
pub mod tracing;
pub mod xdg;

pub use atomic_file::*;
pub use resilience::*;
pub use xdg::*;
