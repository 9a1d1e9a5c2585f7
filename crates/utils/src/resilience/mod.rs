//! Resilience patterns like circuit breakers.
//!
//! ## Key Components
//!
//! - **`circuit`**: Implements the circuit breaker pattern to stop hammering a
//!   filesystem that keeps failing, probing it again after a cooldown.

pub mod circuit;

pub use circuit::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStats, CircuitState};
