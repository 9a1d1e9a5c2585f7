//! Sources of memory usage readings

use parking_lot::Mutex;
use serde::Serialize;
use sysinfo::{Pid, System};
use tiercache_core::{Error, Result};

/// One reading of used and total memory, in bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MemorySample {
    pub used: u64,
    pub total: u64,
}

impl MemorySample {
    pub fn usage_ratio(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.used as f64 / self.total as f64
        }
    }
}

/// Something that can report current memory usage
pub trait MemorySampler: Send + Sync {
    fn sample(&self) -> Result<MemorySample>;
}

/// Reads this process's resident memory against host total through `sysinfo`
pub struct SystemMemorySampler {
    system: Mutex<System>,
    pid: Option<Pid>,
}

impl SystemMemorySampler {
    pub fn new() -> Self {
        let pid = match sysinfo::get_current_pid() {
            Ok(pid) => Some(pid),
            Err(e) => {
                tracing::warn!("Cannot identify the current process for memory sampling: {}", e);
                None
            }
        };
        Self {
            system: Mutex::new(System::new()),
            pid,
        }
    }
}

impl Default for SystemMemorySampler {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySampler for SystemMemorySampler {
    fn sample(&self) -> Result<MemorySample> {
        let pid = self.pid.ok_or_else(|| {
            Error::configuration("memory sampling needs the current process id")
        })?;

        let mut system = self.system.lock();
        system.refresh_memory();
        if !system.refresh_process(pid) {
            return Err(Error::configuration(format!(
                "process {pid} is not visible to memory sampling"
            )));
        }

        let used = system.process(pid).map_or(0, |process| process.memory());
        Ok(MemorySample {
            used,
            total: system.total_memory(),
        })
    }
}
