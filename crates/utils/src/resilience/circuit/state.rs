//! Circuit breaker state management and execution logic.

use super::config::CircuitBreakerConfig;
use super::metrics::BreakerMetrics;
use super::transitions::StateTransitions;
use super::types::{CircuitBreakerStats, CircuitState};
use std::future::Future;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tiercache_core::{Error, Result};

/// Circuit breaker implementation
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    metrics: Arc<BreakerMetrics>,
    transitions: StateTransitions,
}

impl CircuitBreaker {
    /// Create a new circuit breaker with the given configuration
    pub fn new(config: CircuitBreakerConfig) -> Self {
        let metrics = Arc::new(BreakerMetrics::new());
        let transitions = StateTransitions::new(config.clone(), Arc::clone(&metrics));

        Self {
            config,
            metrics,
            transitions,
        }
    }

    /// Get the current state of the circuit
    pub async fn state(&self) -> CircuitState {
        let state = *self.metrics.state.read().await;

        // Check if we should transition from Open to HalfOpen
        if state == CircuitState::Open && self.transitions.check_half_open_transition().await {
            return CircuitState::HalfOpen;
        }

        state
    }

    /// Execute an operation through the circuit breaker.
    ///
    /// While the circuit is open the operation is never polled and the call
    /// fails with [`Error::CircuitOpen`].
    pub async fn call<F, Fut, T>(&self, operation: &str, f: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        self.metrics.record_request();

        match self.state().await {
            CircuitState::Open => {
                self.metrics.record_rejection();
                Err(Error::circuit_open(operation))
            }
            CircuitState::HalfOpen => {
                let calls = self.metrics.half_open_calls.fetch_add(1, Ordering::SeqCst);
                if calls >= self.config.half_open_max_calls {
                    self.metrics.record_rejection();
                    return Err(Error::circuit_open(operation));
                }
                self.execute_with_recording(f).await
            }
            CircuitState::Closed => self.execute_with_recording(f).await,
        }
    }

    /// Execute operation and record the result
    async fn execute_with_recording<F, Fut, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let generation = self.metrics.generation();
        let result = f().await;

        match result {
            Ok(_) => self.transitions.record_success(generation).await,
            Err(_) => self.transitions.record_failure(generation).await,
        }

        result
    }

    /// Get current circuit breaker statistics
    pub async fn stats(&self) -> CircuitBreakerStats {
        // Refresh the Open -> HalfOpen transition before reporting
        let _ = self.state().await;
        self.metrics.snapshot().await
    }

    /// The configuration this breaker was built with
    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::time::sleep;

    fn io_failure() -> Error {
        Error::file_system(
            "/tmp/cache/p0/entry.json",
            "read",
            std::io::Error::new(std::io::ErrorKind::Other, "disk gone"),
        )
    }

    #[tokio::test]
    async fn test_circuit_breaker_opens_on_failures() {
        let config = CircuitBreakerConfig {
            failure_threshold: 3,
            ..Default::default()
        };
        let cb = CircuitBreaker::new(config);

        for _ in 0..3 {
            let _: Result<()> = cb.call("read", || async { Err(io_failure()) }).await;
        }

        assert_eq!(cb.state().await, CircuitState::Open);

        // Next call should fail immediately
        let result = cb.call("read", || async { Ok("should not execute") }).await;
        assert!(result.unwrap_err().is_circuit_open());
    }

    #[tokio::test]
    async fn test_circuit_breaker_half_open_recovery() {
        let config = CircuitBreakerConfig {
            failure_threshold: 2,
            break_duration: Duration::from_millis(100),
            ..Default::default()
        };
        let cb = CircuitBreaker::new(config);

        for _ in 0..2 {
            let _: Result<()> = cb.call("write", || async { Err(io_failure()) }).await;
        }
        assert_eq!(cb.state().await, CircuitState::Open);

        sleep(Duration::from_millis(150)).await;
        assert_eq!(cb.state().await, CircuitState::HalfOpen);

        // A single successful probe closes it
        cb.call("write", || async { Ok(()) }).await.unwrap();
        assert_eq!(cb.state().await, CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_circuit_breaker_half_open_failure() {
        let config = CircuitBreakerConfig {
            failure_threshold: 2,
            break_duration: Duration::from_millis(100),
            ..Default::default()
        };
        let cb = CircuitBreaker::new(config);

        for _ in 0..2 {
            let _: Result<()> = cb.call("read", || async { Err(io_failure()) }).await;
        }

        sleep(Duration::from_millis(150)).await;
        assert_eq!(cb.state().await, CircuitState::HalfOpen);

        // Failure in half-open should reopen
        let _: Result<()> = cb.call("read", || async { Err(io_failure()) }).await;

        assert_eq!(cb.state().await, CircuitState::Open);
    }
}
