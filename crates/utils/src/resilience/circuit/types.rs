//! Core types for circuit breaker functionality.

use std::fmt;
use tokio::time::Instant;

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Circuit is closed - requests pass through normally
    Closed,
    /// Circuit is open - requests fail immediately
    Open,
    /// Circuit is half-open - a limited number of probes are let through
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CircuitState::Closed => write!(f, "CLOSED"),
            CircuitState::Open => write!(f, "OPEN"),
            CircuitState::HalfOpen => write!(f, "HALF_OPEN"),
        }
    }
}

/// Statistics about circuit breaker state
#[derive(Debug, Clone)]
pub struct CircuitBreakerStats {
    pub state: CircuitState,
    /// Consecutive failures in the current state
    pub failure_count: usize,
    /// Successes in the current state
    pub success_count: usize,
    pub half_open_calls: usize,
    /// Lifetime counters, never reset by transitions
    pub total_requests: u64,
    pub total_failures: u64,
    pub total_successes: u64,
    pub rejected_requests: u64,
    pub last_failure_time: Option<Instant>,
    pub last_state_change: Instant,
}
