//! Circuit breaker guarding operations that can fail systemically
//!
//! ## Architecture
//!
//! - [`types`] - Core types (CircuitState, CircuitBreakerStats)
//! - [`config`] - Thresholds and cooldowns
//! - [`metrics`] - Counters and state shared between the breaker and its transitions
//! - [`transitions`] - State transition logic
//! - [`state`] - The breaker itself and call execution
//!
//! ## Example
//!
//! ```rust,no_run
//! use tiercache_utils::resilience::circuit::{CircuitBreaker, CircuitBreakerConfig};
//!
//! # async fn example() -> tiercache_core::Result<Vec<u8>> {
//! let cb = CircuitBreaker::new(CircuitBreakerConfig::default());
//!
//! cb.call("read entry", || async {
//!     tokio::fs::read("/tmp/entry.json")
//!         .await
//!         .map_err(|e| tiercache_core::Error::file_system("/tmp/entry.json", "read", e))
//! })
//! .await
//! # }
//! ```

pub mod config;
pub mod metrics;
pub mod state;
pub mod transitions;
pub mod types;

// Re-export public API
pub use config::CircuitBreakerConfig;
pub use state::CircuitBreaker;
pub use types::{CircuitBreakerStats, CircuitState};
