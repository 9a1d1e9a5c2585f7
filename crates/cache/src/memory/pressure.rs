//! Classification of memory usage and pressure events

use super::sampler::{MemorySample, MemorySampler};
use crate::events::{CacheEvent, EventBus};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tiercache_core::Result;

/// Memory pressure levels
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemoryPressureLevel {
    Normal,
    Warning,
    Critical,
}

impl fmt::Display for MemoryPressureLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Normal => "normal",
            Self::Warning => "warning",
            Self::Critical => "critical",
        })
    }
}

/// Turns memory samples into pressure levels and publishes them.
///
/// A `MemoryPressure` event goes out for every elevated sample and once
/// when usage drops back to normal.
pub struct MemoryPressureDetector {
    sampler: Arc<dyn MemorySampler>,
    warning_threshold: f64,
    critical_threshold: f64,
    level: RwLock<MemoryPressureLevel>,
    last_sample: RwLock<Option<MemorySample>>,
    events: Arc<EventBus>,
}

impl MemoryPressureDetector {
    pub fn new(
        sampler: Arc<dyn MemorySampler>,
        warning_threshold: f64,
        critical_threshold: f64,
        events: Arc<EventBus>,
    ) -> Self {
        Self {
            sampler,
            warning_threshold,
            critical_threshold,
            level: RwLock::new(MemoryPressureLevel::Normal),
            last_sample: RwLock::new(None),
            events,
        }
    }

    pub fn level(&self) -> MemoryPressureLevel {
        *self.level.read()
    }

    pub fn last_sample(&self) -> Option<MemorySample> {
        *self.last_sample.read()
    }

    pub fn classify(&self, usage_ratio: f64) -> MemoryPressureLevel {
        if usage_ratio >= self.critical_threshold {
            MemoryPressureLevel::Critical
        } else if usage_ratio >= self.warning_threshold {
            MemoryPressureLevel::Warning
        } else {
            MemoryPressureLevel::Normal
        }
    }

    /// Take a sample and evaluate it
    pub fn check(&self) -> Result<MemoryPressureLevel> {
        let sample = self.sampler.sample()?;
        Ok(self.evaluate(sample))
    }

    /// Record `sample`, update the current level and emit if warranted
    pub fn evaluate(&self, sample: MemorySample) -> MemoryPressureLevel {
        let ratio = sample.usage_ratio();
        let level = self.classify(ratio);
        *self.last_sample.write() = Some(sample);

        let previous = std::mem::replace(&mut *self.level.write(), level);

        let message = match level {
            MemoryPressureLevel::Critical => format!(
                "Critical memory pressure: {:.1}% used (threshold {:.1}%)",
                ratio * 100.0,
                self.critical_threshold * 100.0
            ),
            MemoryPressureLevel::Warning => format!(
                "High memory usage: {:.1}% used (threshold {:.1}%)",
                ratio * 100.0,
                self.warning_threshold * 100.0
            ),
            MemoryPressureLevel::Normal if previous != MemoryPressureLevel::Normal => format!(
                "Memory pressure relieved: {:.1}% used",
                ratio * 100.0
            ),
            MemoryPressureLevel::Normal => return level,
        };

        match level {
            MemoryPressureLevel::Normal => tracing::info!("{}", message),
            _ => tracing::warn!("{}", message),
        }

        self.events.emit(&CacheEvent::MemoryPressure {
            level,
            usage_ratio: ratio,
            message,
        });
        level
    }

    /// Publish the outcome of an adaptive eviction pass
    pub fn report_eviction(&self, evicted: usize, remaining: usize) {
        self.events.emit(&CacheEvent::EvictionCompleted { evicted, remaining });
    }
}

impl fmt::Debug for MemoryPressureDetector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryPressureDetector")
            .field("warning_threshold", &self.warning_threshold)
            .field("critical_threshold", &self.critical_threshold)
            .field("level", &self.level())
            .finish()
    }
}
