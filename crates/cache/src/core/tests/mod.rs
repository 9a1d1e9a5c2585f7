mod basic;

use crate::config::CacheOptions;
use crate::core::Cache;
use std::path::Path;

/// Defaults with both background timers off, so tests drive every pass
pub(super) fn quiet_options() -> CacheOptions {
    CacheOptions {
        auto_cleanup: false,
        enable_memory_pressure_detection: false,
        ..CacheOptions::default()
    }
}

pub(super) async fn cache_at(dir: &Path, options: CacheOptions) -> Cache {
    Cache::new(dir.to_path_buf(), options).await.unwrap()
}
