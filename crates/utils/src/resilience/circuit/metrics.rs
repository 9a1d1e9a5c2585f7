//! State shared between a breaker and its transition logic.
//!
//! Counters come in two groups. Per-state counters (`failure_count`,
//! `success_count`, `half_open_calls`) start from zero on every transition.
//! [`LifetimeTotals`] only ever grow and feed the statistics snapshot.

use super::types::{CircuitBreakerStats, CircuitState};
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use tokio::sync::{Mutex, RwLock};
use tokio::time::Instant;

/// Monotonic counters over the breaker's whole life
#[derive(Debug, Default)]
pub struct LifetimeTotals {
    pub requests: AtomicU64,
    pub failures: AtomicU64,
    pub successes: AtomicU64,
    pub rejected: AtomicU64,
}

#[derive(Debug)]
pub struct BreakerMetrics {
    pub state: RwLock<CircuitState>,
    /// Failures since the last success while closed
    pub failure_count: AtomicUsize,
    /// Successful probes while half-open
    pub success_count: AtomicUsize,
    pub half_open_calls: AtomicUsize,
    pub totals: LifetimeTotals,
    pub last_failure_time: Mutex<Option<Instant>>,
    pub last_state_change: Mutex<Instant>,
    /// Bumped on every transition so late results from an earlier state are ignored
    generation: AtomicU64,
}

impl BreakerMetrics {
    pub fn new() -> Self {
        Self {
            state: RwLock::new(CircuitState::Closed),
            failure_count: AtomicUsize::new(0),
            success_count: AtomicUsize::new(0),
            half_open_calls: AtomicUsize::new(0),
            totals: LifetimeTotals::default(),
            last_failure_time: Mutex::new(None),
            last_state_change: Mutex::new(Instant::now()),
            generation: AtomicU64::new(0),
        }
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    /// Start a new state: fresh per-state counters and a new generation
    pub async fn begin_state(&self) {
        *self.last_state_change.lock().await = Instant::now();
        self.generation.fetch_add(1, Ordering::SeqCst);
        self.failure_count.store(0, Ordering::SeqCst);
        self.success_count.store(0, Ordering::SeqCst);
        self.half_open_calls.store(0, Ordering::SeqCst);
    }

    pub fn record_request(&self) {
        self.totals.requests.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejection(&self) {
        self.totals.rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub async fn snapshot(&self) -> CircuitBreakerStats {
        let totals = &self.totals;
        CircuitBreakerStats {
            state: *self.state.read().await,
            failure_count: self.failure_count.load(Ordering::SeqCst),
            success_count: self.success_count.load(Ordering::SeqCst),
            half_open_calls: self.half_open_calls.load(Ordering::SeqCst),
            total_requests: totals.requests.load(Ordering::Relaxed),
            total_failures: totals.failures.load(Ordering::Relaxed),
            total_successes: totals.successes.load(Ordering::Relaxed),
            rejected_requests: totals.rejected.load(Ordering::Relaxed),
            last_failure_time: *self.last_failure_time.lock().await,
            last_state_change: *self.last_state_change.lock().await,
        }
    }
}

impl Default for BreakerMetrics {
    fn default() -> Self {
        Self::new()
    }
}
