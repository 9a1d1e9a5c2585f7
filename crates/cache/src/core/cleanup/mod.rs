//! Cache cleanup operations

mod background;

pub(super) use background::start_background_tasks;

use crate::entry::now_millis;
use crate::events::CacheOperation;
use crate::workers::{
    scan_directories, BackgroundTask, CleanupReport, RemovalReason, ScanResult, TaskOutput,
};
use std::time::Instant;
use tiercache_core::{Error, Result};
use tiercache_utils::tracing::cache_span;
use tracing::Instrument;

use super::types::Cache;

impl Cache {
    /// Remove expired entries from both tiers.
    ///
    /// Also removes unreadable entry files and abandoned temp/backup files.
    /// Disk work goes through the circuit breaker, so an open breaker fails
    /// the pass with [`Error::CircuitOpen`] before anything is read.
    /// The disk scan runs on the worker pool when one is available and on a
    /// plain blocking thread otherwise. Passes never overlap: a caller waits for a pass in
    /// progress to finish before starting its own.
    pub async fn cleanup(&self) -> Result<CleanupReport> {
        let started = Instant::now();
        let _guard = self.inner.cleanup_lock.lock().await;
        let result = self.run_cleanup().await;
        self.emit_operation(CacheOperation::Cleanup, None, started, &result);
        result
    }

    /// Timer entry point: skips instead of queueing behind a running pass
    pub(super) async fn try_cleanup(&self) -> Option<Result<CleanupReport>> {
        let _guard = match self.inner.cleanup_lock.try_lock() {
            Ok(guard) => guard,
            Err(_) => {
                tracing::debug!("Skipping scheduled cleanup, a pass is already running");
                return None;
            }
        };
        Some(self.run_cleanup().await)
    }

    async fn run_cleanup(&self) -> Result<CleanupReport> {
        let span = cache_span(&self.inner.name, "cleanup");
        async {
            let now = now_millis();

            let memory_expired = {
                let mut memory = self.inner.memory.lock();
                let expired: Vec<String> = memory
                    .iter()
                    .filter(|(_, entry)| entry.is_expired_at(now))
                    .map(|(key, _)| key.clone())
                    .collect();
                for key in &expired {
                    memory.pop(key);
                }
                expired.len() as u64
            };

            let mut report = self.scan_disk(now).await?;
            report.memory_expired = memory_expired;

            let stats = &self.inner.stats;
            stats.record_expired(report.expired_removed + report.memory_expired);
            stats.record_corrupted(report.corrupted_removed);
            stats.record_cleanup();

            if report.total_removed() > 0 {
                tracing::info!(
                    "Cleanup of '{}' removed {} expired, {} corrupted, {} orphaned files and {} memory entries",
                    self.inner.name,
                    report.expired_removed,
                    report.corrupted_removed,
                    report.orphans_removed,
                    report.memory_expired
                );
            } else {
                tracing::debug!("Cleanup of '{}' found nothing to remove", self.inner.name);
            }

            Ok(report)
        }
        .instrument(span)
        .await
    }

    /// Scan under the circuit breaker, then delete what it selected through
    /// the file operations seam
    async fn scan_disk(&self, now_ms: u64) -> Result<CleanupReport> {
        let scan = self.guarded("cleanup scan", || self.scan_files(now_ms)).await?;

        let mut report = CleanupReport {
            scanned: scan.scanned,
            ..CleanupReport::default()
        };
        for candidate in &scan.candidates {
            if candidate.reason == RemovalReason::Corrupted {
                tracing::warn!("Removing unreadable cache file {}", candidate.path.display());
            }
            match self.delete_file(&candidate.path).await {
                Ok(outcome) if outcome.existed => report.record_removal(candidate),
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("Failed to remove {}: {}", candidate.path.display(), e);
                    report.errors += 1;
                    if e.is_circuit_open() {
                        break;
                    }
                }
            }
        }
        Ok(report)
    }

    async fn scan_files(&self, now_ms: u64) -> Result<ScanResult> {
        let directories = self.inner.scan_directories().await?;

        if let Some(workers) = &self.inner.workers {
            let task = BackgroundTask::ScanDirectories {
                directories: directories.clone(),
                now_ms,
            };
            match workers.submit_task(task).await {
                Ok(TaskOutput::Scanned(scan)) => return Ok(scan),
                Ok(_) => return Err(Error::worker_pool("scan task returned the wrong output")),
                Err(Error::WorkerPool { message }) => {
                    tracing::debug!("Scanning inline: {}", message);
                }
                Err(e) => return Err(e),
            }
        }

        tokio::task::spawn_blocking(move || scan_directories(&directories, now_ms))
            .await
            .map_err(|e| Error::worker_pool(format!("cleanup scan did not finish: {e}")))?
    }
}
