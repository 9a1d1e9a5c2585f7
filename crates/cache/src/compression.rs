//! Gzip compression of persisted entries
//!
//! Payloads above the worker threshold are compressed on the background
//! pool; everything else, and any payload the pool refuses, is handled inline.

use crate::workers::{BackgroundTask, BackgroundWorkerManager, TaskOutput};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::Serialize;
use std::io::{Read, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tiercache_core::{Error, Result};

const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Compress `data` with gzip at `level` (0-9)
pub fn gzip(data: &[u8], level: u32) -> Result<Vec<u8>> {
    let mut encoder = GzEncoder::new(Vec::with_capacity(data.len() / 2), Compression::new(level));
    encoder
        .write_all(data)
        .map_err(|e| Error::compression("compress", e))?;
    encoder.finish().map_err(|e| Error::compression("compress", e))
}

/// Decompress a gzip stream
pub fn gunzip(data: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = GzDecoder::new(data);
    let mut out = Vec::with_capacity(data.len() * 2);
    decoder
        .read_to_end(&mut out)
        .map_err(|e| Error::compression("decompress", e))?;
    Ok(out)
}

pub fn is_gzip(data: &[u8]) -> bool {
    data.starts_with(&GZIP_MAGIC)
}

#[derive(Debug, Clone, PartialEq)]
pub struct CompressionResult {
    pub data: Vec<u8>,
    /// Compressed size divided by original size
    pub ratio: f64,
}

/// Compression counters
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CompressionStats {
    pub compressions: u64,
    pub decompressions: u64,
    pub bytes_in: u64,
    pub bytes_out: u64,
    /// Total compressed bytes over total original bytes
    pub average_ratio: f64,
    pub offloaded: u64,
}

pub struct CompressionService {
    level: u32,
    worker_threshold: usize,
    workers: Option<Arc<BackgroundWorkerManager>>,
    compressions: AtomicU64,
    decompressions: AtomicU64,
    bytes_in: AtomicU64,
    bytes_out: AtomicU64,
    offloaded: AtomicU64,
}

impl CompressionService {
    pub fn new(
        level: u32,
        worker_threshold: usize,
        workers: Option<Arc<BackgroundWorkerManager>>,
    ) -> Self {
        Self {
            level,
            worker_threshold,
            workers,
            compressions: AtomicU64::new(0),
            decompressions: AtomicU64::new(0),
            bytes_in: AtomicU64::new(0),
            bytes_out: AtomicU64::new(0),
            offloaded: AtomicU64::new(0),
        }
    }

    pub async fn compress(&self, data: Vec<u8>) -> Result<CompressionResult> {
        let original_len = data.len();
        let level = self.level;

        let compressed = match self.offload_pool(original_len) {
            Some(pool) => {
                let shared: Arc<[u8]> = Arc::from(data);
                let task = BackgroundTask::Compress {
                    data: Arc::clone(&shared),
                    level,
                };
                match pool.submit_task(task).await {
                    Ok(TaskOutput::Compressed(bytes)) => {
                        self.offloaded.fetch_add(1, Ordering::Relaxed);
                        bytes
                    }
                    Ok(_) => gzip(&shared, level)?,
                    Err(Error::WorkerPool { message }) => {
                        tracing::debug!("Compressing inline, worker pool unavailable: {}", message);
                        gzip(&shared, level)?
                    }
                    Err(e) => return Err(e),
                }
            }
            None => gzip(&data, level)?,
        };

        self.compressions.fetch_add(1, Ordering::Relaxed);
        self.bytes_in
            .fetch_add(original_len as u64, Ordering::Relaxed);
        self.bytes_out
            .fetch_add(compressed.len() as u64, Ordering::Relaxed);

        let ratio = if original_len == 0 {
            1.0
        } else {
            compressed.len() as f64 / original_len as f64
        };

        Ok(CompressionResult {
            data: compressed,
            ratio,
        })
    }

    pub async fn decompress(&self, data: Vec<u8>) -> Result<Vec<u8>> {
        if !is_gzip(&data) {
            return Err(Error::compression(
                "decompress",
                std::io::Error::new(std::io::ErrorKind::InvalidData, "missing gzip header"),
            ));
        }

        let decompressed = match self.offload_pool(data.len()) {
            Some(pool) => {
                let shared: Arc<[u8]> = Arc::from(data);
                let task = BackgroundTask::Decompress {
                    data: Arc::clone(&shared),
                };
                match pool.submit_task(task).await {
                    Ok(TaskOutput::Decompressed(bytes)) => {
                        self.offloaded.fetch_add(1, Ordering::Relaxed);
                        bytes
                    }
                    Ok(_) => gunzip(&shared)?,
                    Err(Error::WorkerPool { message }) => {
                        tracing::debug!(
                            "Decompressing inline, worker pool unavailable: {}",
                            message
                        );
                        gunzip(&shared)?
                    }
                    Err(e) => return Err(e),
                }
            }
            None => gunzip(&data)?,
        };

        self.decompressions.fetch_add(1, Ordering::Relaxed);
        Ok(decompressed)
    }

    fn offload_pool(&self, len: usize) -> Option<&Arc<BackgroundWorkerManager>> {
        if len > self.worker_threshold {
            self.workers.as_ref().filter(|pool| !pool.is_shutdown())
        } else {
            None
        }
    }

    pub fn stats(&self) -> CompressionStats {
        let bytes_in = self.bytes_in.load(Ordering::Relaxed);
        let bytes_out = self.bytes_out.load(Ordering::Relaxed);
        CompressionStats {
            compressions: self.compressions.load(Ordering::Relaxed),
            decompressions: self.decompressions.load(Ordering::Relaxed),
            bytes_in,
            bytes_out,
            average_ratio: if bytes_in == 0 {
                1.0
            } else {
                bytes_out as f64 / bytes_in as f64
            },
            offloaded: self.offloaded.load(Ordering::Relaxed),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn sample(len: usize) -> Vec<u8> {
        (0..len).map(|i| (i % 7) as u8 + b'a').collect()
    }

    #[tokio::test]
    async fn test_inline_round_trip() {
        let service = CompressionService::new(6, 64 * 1024, None);
        let data = sample(4096);

        let result = service.compress(data.clone()).await.unwrap();
        assert!(result.ratio < 1.0);
        assert!(is_gzip(&result.data));

        let restored = service.decompress(result.data).await.unwrap();
        assert_eq!(restored, data);

        let stats = service.stats();
        assert_eq!(stats.compressions, 1);
        assert_eq!(stats.decompressions, 1);
        assert_eq!(stats.offloaded, 0);
        assert!(stats.average_ratio < 1.0);
    }

    #[tokio::test]
    async fn test_large_payloads_use_worker_pool() {
        let pool = Arc::new(BackgroundWorkerManager::new(2, Duration::from_millis(100)));
        let service = CompressionService::new(6, 1024, Some(Arc::clone(&pool)));
        let data = sample(8 * 1024);

        let result = service.compress(data.clone()).await.unwrap();
        let restored = service.decompress(result.data).await.unwrap();

        assert_eq!(restored, data);
        assert_eq!(service.stats().offloaded, 2);
        assert_eq!(pool.stats().completed, 2);
    }

    #[tokio::test]
    async fn test_falls_back_inline_when_pool_is_down() {
        let pool = Arc::new(BackgroundWorkerManager::new(1, Duration::from_millis(10)));
        pool.shutdown();
        let service = CompressionService::new(6, 16, Some(pool));
        let data = sample(2048);

        let result = service.compress(data.clone()).await.unwrap();
        assert_eq!(service.decompress(result.data).await.unwrap(), data);
        assert_eq!(service.stats().offloaded, 0);
    }

    #[tokio::test]
    async fn test_rejects_non_gzip_input() {
        let service = CompressionService::new(6, 1024, None);
        let err = service.decompress(b"{\"plain\": true}".to_vec()).await.unwrap_err();
        assert!(err.is_corruption());
    }
}
