//! Background cleanup and memory sampling timers

use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::core::types::{Cache, CacheInner};

/// Start the periodic cleanup and memory pressure tasks.
///
/// The tasks hold a weak reference, so dropping the last [`Cache`] handle
/// ends them.
pub fn start_background_tasks(cache: &Cache) {
    let options = &cache.inner.options;
    let mut handles = Vec::new();

    // A zero interval disables the timer (useful for tests)
    if options.auto_cleanup && options.cleanup_interval > Duration::ZERO {
        let weak = Arc::downgrade(&cache.inner);
        let period = options.cleanup_interval;
        handles.push(tokio::spawn(async move {
            cleanup_loop(weak, period).await;
        }));
    }

    if cache.inner.pressure.is_some() && options.memory_check_interval > Duration::ZERO {
        let weak = Arc::downgrade(&cache.inner);
        let period = options.memory_check_interval;
        handles.push(tokio::spawn(async move {
            memory_loop(weak, period).await;
        }));
    }

    *cache.inner.background_handles.lock() = handles;
}

async fn cleanup_loop(weak: Weak<CacheInner>, period: Duration) {
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval.tick().await;
        let cache = match weak.upgrade() {
            Some(inner) => Cache { inner },
            None => break,
        };

        match cache.try_cleanup().await {
            Some(Ok(_)) | None => {}
            Some(Err(e)) => {
                tracing::warn!("Cache cleanup error: {}", e);
            }
        }
    }
}

async fn memory_loop(weak: Weak<CacheInner>, period: Duration) {
    let mut interval = interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        interval.tick().await;
        let cache = match weak.upgrade() {
            Some(inner) => Cache { inner },
            None => break,
        };
        cache.check_memory_pressure().await;
    }
}
