//! Shared helpers for cache operations

use crate::events::{CacheEvent, CacheOperation, EventKind, OperationEvent};
use std::future::Future;
use std::path::Path;
use std::time::Instant;
use tiercache_core::Result;
use tiercache_utils::{DeleteOutcome, WriteOutcome};

use crate::core::types::Cache;

impl Cache {
    /// Run a filesystem operation through the circuit breaker, if enabled
    pub(in crate::core) async fn guarded<F, Fut, T>(&self, operation: &str, f: F) -> Result<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        match &self.inner.breaker {
            Some(breaker) => breaker.call(operation, f).await,
            None => f().await,
        }
    }

    pub(in crate::core) async fn read_file(&self, path: &Path) -> Result<Option<Vec<u8>>> {
        let ops = &self.inner.file_ops;
        self.guarded("read", || ops.read_file(path)).await
    }

    pub(in crate::core) async fn write_file(
        &self,
        path: &Path,
        content: &[u8],
    ) -> Result<WriteOutcome> {
        let ops = &self.inner.file_ops;
        self.guarded("write", || ops.write_file(path, content)).await
    }

    pub(in crate::core) async fn delete_file(&self, path: &Path) -> Result<DeleteOutcome> {
        let ops = &self.inner.file_ops;
        self.guarded("delete", || ops.delete_file(path)).await
    }

    pub(in crate::core) async fn file_exists(&self, path: &Path) -> Result<bool> {
        let ops = &self.inner.file_ops;
        self.guarded("exists", || ops.exists(path)).await
    }

    pub(in crate::core) async fn remove_dir(&self, path: &Path) -> Result<()> {
        let ops = &self.inner.file_ops;
        self.guarded("remove directory", || ops.remove_dir_all(path)).await
    }

    /// Remove both on-disk variants of `key`, logging failures
    pub(in crate::core) async fn remove_entry_files(&self, key: &str) {
        let paths = self.inner.entry_paths(key);
        for path in [&paths.json, &paths.gz] {
            match self.delete_file(path).await {
                Ok(_) => {}
                Err(e) => {
                    tracing::warn!("Failed to remove cache file {}: {}", path.display(), e);
                    self.inner.stats.record_error();
                }
            }
        }
    }

    /// Publish an [`OperationEvent`] if anyone is listening
    pub(in crate::core) fn emit_operation<T>(
        &self,
        operation: CacheOperation,
        key: Option<&str>,
        started: Instant,
        result: &Result<T>,
    ) {
        self.emit_outcome(
            operation,
            key,
            started,
            result.as_ref().err().map(|e| e.to_string()),
        );
    }

    pub(in crate::core) fn emit_outcome(
        &self,
        operation: CacheOperation,
        key: Option<&str>,
        started: Instant,
        error: Option<String>,
    ) {
        if !self.inner.events.has_subscribers(EventKind::Operation) {
            return;
        }

        self.inner
            .events
            .emit(&CacheEvent::Operation(OperationEvent {
                operation,
                key: key.map(str::to_owned),
                success: error.is_none(),
                duration: started.elapsed(),
                error,
            }));
    }
}
