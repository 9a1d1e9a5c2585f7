//! Bounded pool for blocking cache work
//!
//! Cleanup scans and large (de)compressions run on tokio's blocking threads,
//! with a semaphore capping how many run at once. A submission that cannot
//! get a slot within the queue timeout is rejected so the caller can do the
//! work inline instead of waiting.

mod tasks;

pub use tasks::{
    BackgroundTask, CleanupReport, RemovalCandidate, RemovalReason, ScanResult, TaskOutput,
    ORPHAN_MIN_AGE,
};
pub(crate) use tasks::scan_directories;

use serde::Serialize;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tiercache_core::{Error, Result};
use tokio::sync::Semaphore;

/// Counters for the worker pool
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WorkerStats {
    pub worker_count: usize,
    pub submitted: u64,
    pub completed: u64,
    pub failed: u64,
    pub rejected: u64,
    pub active: usize,
}

pub struct BackgroundWorkerManager {
    permits: Arc<Semaphore>,
    worker_count: usize,
    queue_timeout: Duration,
    submitted: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    rejected: AtomicU64,
    shutdown: AtomicBool,
}

impl BackgroundWorkerManager {
    pub fn new(worker_count: usize, queue_timeout: Duration) -> Self {
        let worker_count = worker_count.max(1);
        Self {
            permits: Arc::new(Semaphore::new(worker_count)),
            worker_count,
            queue_timeout,
            submitted: AtomicU64::new(0),
            completed: AtomicU64::new(0),
            failed: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            shutdown: AtomicBool::new(false),
        }
    }

    /// Run `task` on the pool and wait for its output.
    ///
    /// Fails with [`Error::WorkerPool`] when the pool is shut down, saturated
    /// past the queue timeout, or the worker thread dies; task errors are
    /// returned unchanged.
    pub async fn submit_task(&self, task: BackgroundTask) -> Result<TaskOutput> {
        let kind = task.kind();

        if self.shutdown.load(Ordering::Acquire) {
            self.rejected.fetch_add(1, Ordering::Relaxed);
            return Err(Error::worker_pool(format!(
                "pool is shut down, cannot run {kind} task"
            )));
        }

        let permit = match tokio::time::timeout(
            self.queue_timeout,
            Arc::clone(&self.permits).acquire_owned(),
        )
        .await
        {
            Ok(Ok(permit)) => permit,
            Ok(Err(_)) => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                return Err(Error::worker_pool(format!(
                    "pool closed while queueing {kind} task"
                )));
            }
            Err(_) => {
                self.rejected.fetch_add(1, Ordering::Relaxed);
                return Err(Error::worker_pool(format!(
                    "all {} workers busy, {kind} task waited {:?}",
                    self.worker_count, self.queue_timeout
                )));
            }
        };

        self.submitted.fetch_add(1, Ordering::Relaxed);
        tracing::trace!("Running {} task on worker pool", kind);

        let joined = tokio::task::spawn_blocking(move || {
            let _permit = permit;
            tasks::run_task(task)
        })
        .await;

        match joined {
            Ok(Ok(output)) => {
                self.completed.fetch_add(1, Ordering::Relaxed);
                Ok(output)
            }
            Ok(Err(e)) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                Err(e)
            }
            Err(e) => {
                self.failed.fetch_add(1, Ordering::Relaxed);
                Err(Error::worker_pool(format!("{kind} task did not finish: {e}")))
            }
        }
    }

    pub fn stats(&self) -> WorkerStats {
        WorkerStats {
            worker_count: self.worker_count,
            submitted: self.submitted.load(Ordering::Relaxed),
            completed: self.completed.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            active: self
                .worker_count
                .saturating_sub(self.permits.available_permits()),
        }
    }

    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Stop accepting work; tasks already running finish normally
    pub fn shutdown(&self) {
        if !self.shutdown.swap(true, Ordering::AcqRel) {
            self.permits.close();
            tracing::debug!("Background worker pool shut down");
        }
    }
}

impl std::fmt::Debug for BackgroundWorkerManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackgroundWorkerManager")
            .field("worker_count", &self.worker_count)
            .field("queue_timeout", &self.queue_timeout)
            .field("shutdown", &self.is_shutdown())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_submit_compress_task() {
        let pool = BackgroundWorkerManager::new(2, Duration::from_millis(100));
        let data: Arc<[u8]> = Arc::from(vec![b'a'; 10_000]);

        let output = pool
            .submit_task(BackgroundTask::Compress { data, level: 6 })
            .await
            .unwrap();

        assert!(matches!(output, TaskOutput::Compressed(ref bytes) if bytes.len() < 10_000));
        let stats = pool.stats();
        assert_eq!(stats.submitted, 1);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.active, 0);
    }

    #[tokio::test]
    async fn test_task_errors_are_returned() {
        let pool = BackgroundWorkerManager::new(1, Duration::from_millis(100));
        let err = pool
            .submit_task(BackgroundTask::Decompress {
                data: Arc::from(b"definitely not gzip".to_vec()),
            })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Compression { .. }));
        assert_eq!(pool.stats().failed, 1);
    }

    #[tokio::test]
    async fn test_saturated_pool_rejects() {
        let pool = BackgroundWorkerManager::new(1, Duration::from_millis(20));
        // Hold the only slot
        let _held = Arc::clone(&pool.permits).acquire_owned().await.unwrap();

        let temp_dir = TempDir::new().unwrap();
        let err = pool
            .submit_task(BackgroundTask::ScanDirectories {
                directories: vec![temp_dir.path().to_path_buf()],
                now_ms: 0,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, Error::WorkerPool { .. }));
        assert_eq!(pool.stats().rejected, 1);
        assert_eq!(pool.stats().submitted, 0);
    }

    #[tokio::test]
    async fn test_shutdown_rejects_new_work() {
        let pool = BackgroundWorkerManager::new(1, Duration::from_millis(20));
        pool.shutdown();

        let result = pool
            .submit_task(BackgroundTask::Compress {
                data: Arc::from(vec![1u8; 8]),
                level: 1,
            })
            .await;
        assert!(result.is_err());
        assert!(pool.is_shutdown());
    }
}
