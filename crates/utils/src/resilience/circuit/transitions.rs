//! State transition logic for circuit breaker.

use super::config::CircuitBreakerConfig;
use super::metrics::BreakerMetrics;
use super::types::CircuitState;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::time::Instant;

/// Handles state transitions for circuit breaker
pub struct StateTransitions {
    config: CircuitBreakerConfig,
    metrics: Arc<BreakerMetrics>,
}

impl StateTransitions {
    /// Create new state transitions handler
    pub fn new(config: CircuitBreakerConfig, metrics: Arc<BreakerMetrics>) -> Self {
        Self { config, metrics }
    }

    async fn transition_to(&self, next: CircuitState) {
        let mut state = self.metrics.state.write().await;
        if *state != next {
            match next {
                CircuitState::Open => log::warn!("Circuit breaker opening"),
                CircuitState::HalfOpen => log::info!("Circuit breaker entering half-open state"),
                CircuitState::Closed => log::info!("Circuit breaker closing"),
            }
            *state = next;
            self.metrics.begin_state().await;
        }
    }

    /// Transition to open state
    pub async fn transition_to_open(&self) {
        self.transition_to(CircuitState::Open).await;
    }

    /// Transition to half-open state
    pub async fn transition_to_half_open(&self) {
        self.transition_to(CircuitState::HalfOpen).await;
    }

    /// Transition to closed state
    pub async fn transition_to_closed(&self) {
        self.transition_to(CircuitState::Closed).await;
    }

    /// Record a successful call and handle state transitions
    pub async fn record_success(&self, generation: u64) {
        self.metrics.totals.successes.fetch_add(1, Ordering::Relaxed);

        // Only record if we're still in the same generation
        if generation != self.metrics.generation() {
            return;
        }

        let state = *self.metrics.state.read().await;

        match state {
            CircuitState::HalfOpen => {
                let count = self.metrics.success_count.fetch_add(1, Ordering::SeqCst) + 1;
                if count >= self.config.success_threshold {
                    self.transition_to_closed().await;
                }
            }
            CircuitState::Closed => {
                // Any success breaks the run of consecutive failures
                self.metrics.failure_count.store(0, Ordering::SeqCst);
                self.metrics.success_count.fetch_add(1, Ordering::SeqCst);
                *self.metrics.last_failure_time.lock().await = None;
            }
            CircuitState::Open => {}
        }
    }

    /// Record a failed call and handle state transitions
    pub async fn record_failure(&self, generation: u64) {
        self.metrics.totals.failures.fetch_add(1, Ordering::Relaxed);

        if generation != self.metrics.generation() {
            return;
        }

        // Only a success breaks a run of failures, however far apart they are
        *self.metrics.last_failure_time.lock().await = Some(Instant::now());

        let state = *self.metrics.state.read().await;

        match state {
            CircuitState::Closed => {
                let count = self.metrics.failure_count.fetch_add(1, Ordering::SeqCst) + 1;
                if count >= self.config.failure_threshold {
                    self.transition_to_open().await;
                }
            }
            CircuitState::HalfOpen => {
                // A failed probe reopens the circuit and restarts the cooldown
                self.transition_to_open().await;
            }
            CircuitState::Open => {}
        }
    }

    /// Check if we should transition from Open to HalfOpen based on break duration
    pub async fn check_half_open_transition(&self) -> bool {
        let state = *self.metrics.state.read().await;
        if state == CircuitState::Open {
            let last_change = *self.metrics.last_state_change.lock().await;
            if last_change.elapsed() >= self.config.break_duration {
                self.transition_to_half_open().await;
                return true;
            }
        }
        false
    }
}
