//! Configuration for circuit breaker behavior.

use std::time::Duration;

/// Configuration for circuit breaker behavior
#[derive(Debug, Clone)]
pub struct CircuitBreakerConfig {
    /// Number of consecutive failures before opening the circuit
    pub failure_threshold: usize,
    /// Successful probes needed to close the circuit from half-open state
    pub success_threshold: usize,
    /// Duration to wait before attempting half-open state
    pub break_duration: Duration,
    /// Maximum number of requests let through in half-open state
    pub half_open_max_calls: usize,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 1,
            break_duration: Duration::from_secs(30),
            half_open_max_calls: 1,
        }
    }
}

impl CircuitBreakerConfig {
    /// Config with the given threshold and cooldown, single-probe half-open state
    pub fn with_threshold(failure_threshold: usize, break_duration: Duration) -> Self {
        Self {
            failure_threshold,
            break_duration,
            ..Default::default()
        }
    }
}
