//! Registry of named cache instances

mod statistics;

pub use statistics::GlobalCacheStats;

use crate::config::{CacheConfiguration, CacheOptions};
use crate::core::Cache;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tiercache_core::{Error, Result};
use tokio::sync::RwLock;

/// Name of the cache every manager creates up front
pub const CONFIG_CACHE_NAME: &str = "config";

/// Owns the caches of one process, each in its own directory under a shared root.
///
/// Construct one at startup and hand out references; dropping or
/// [`destroy`](Self::destroy)ing it stops every cache's background work.
pub struct CacheManager {
    root: PathBuf,
    default_options: CacheOptions,
    config_cache: Cache,
    caches: RwLock<HashMap<String, Cache>>,
}

impl CacheManager {
    /// Create a manager rooted at `root` and build its `config` cache
    pub async fn new(root: impl Into<PathBuf>, default_options: CacheOptions) -> Result<Self> {
        let root = root.into();
        default_options.validate()?;

        let config_cache = Cache::builder(root.join(CONFIG_CACHE_NAME))
            .name(CONFIG_CACHE_NAME)
            .options(default_options.clone())
            .build()
            .await?;

        log::info!("Cache manager initialised at {}", root.display());

        Ok(Self {
            root,
            default_options,
            config_cache,
            caches: RwLock::new(HashMap::new()),
        })
    }

    /// Create a manager from loaded configuration
    pub async fn from_configuration(config: CacheConfiguration) -> Result<Self> {
        log::debug!("Using cache configuration from {:?}", config.source);
        Self::new(config.base_dir, config.options).await
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn default_options(&self) -> &CacheOptions {
        &self.default_options
    }

    pub fn config_cache(&self) -> &Cache {
        &self.config_cache
    }

    /// The cache called `name`, created with the default options on first use
    pub async fn get_cache(&self, name: &str) -> Result<Cache> {
        validate_name(name)?;
        if name == CONFIG_CACHE_NAME {
            return Ok(self.config_cache.clone());
        }

        if let Some(cache) = self.caches.read().await.get(name) {
            return Ok(cache.clone());
        }

        let mut caches = self.caches.write().await;
        // Another caller may have created it while we waited for the lock
        if let Some(cache) = caches.get(name) {
            return Ok(cache.clone());
        }

        let cache = self.build_cache(name, self.default_options.clone()).await?;
        caches.insert(name.to_string(), cache.clone());
        Ok(cache)
    }

    /// Build `name` with explicit options, replacing any cache of that name
    pub async fn create_cache(&self, name: &str, options: CacheOptions) -> Result<Cache> {
        validate_name(name)?;
        if name == CONFIG_CACHE_NAME {
            return Err(Error::validation(
                name,
                "the config cache is created by the manager",
            ));
        }

        let cache = self.build_cache(name, options).await?;
        let previous = self
            .caches
            .write()
            .await
            .insert(name.to_string(), cache.clone());

        if let Some(previous) = previous {
            log::info!("Replacing cache '{}'", name);
            previous.destroy();
        }
        Ok(cache)
    }

    /// Clear and destroy `name`. Returns false if no such cache exists.
    pub async fn remove_cache(&self, name: &str) -> Result<bool> {
        let removed = self.caches.write().await.remove(name);
        let cache = match removed {
            Some(cache) => cache,
            None => return Ok(false),
        };

        let cleared = cache.clear().await;
        cache.destroy();
        cleared?;

        log::info!("Removed cache '{}'", name);
        Ok(true)
    }

    /// Names of all managed caches, the config cache included, sorted
    pub async fn cache_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.caches.read().await.keys().cloned().collect();
        names.push(CONFIG_CACHE_NAME.to_string());
        names.sort();
        names
    }

    pub async fn get_global_stats(&self) -> GlobalCacheStats {
        let mut stats = Vec::new();
        for cache in self.all_caches().await {
            stats.push(cache.stats().await);
        }
        GlobalCacheStats::from_caches(stats)
    }

    pub async fn get_global_stats_summary(&self) -> String {
        self.get_global_stats().await.summary()
    }

    /// Clear every cache, returning the first failure after trying them all
    pub async fn clear_all(&self) -> Result<()> {
        let mut first_error = None;
        for cache in self.all_caches().await {
            if let Err(e) = cache.clear().await {
                tracing::warn!("Failed to clear cache '{}': {}", cache.name(), e);
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }

    /// Run a cleanup pass on every cache.
    ///
    /// Returns the number of entries and files removed in total.
    pub async fn cleanup_all(&self) -> Result<u64> {
        let mut removed = 0;
        let mut first_error = None;
        for cache in self.all_caches().await {
            match cache.cleanup().await {
                Ok(report) => removed += report.total_removed(),
                Err(e) => {
                    tracing::warn!("Cleanup of cache '{}' failed: {}", cache.name(), e);
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e),
            None => {
                log::debug!("Cleanup of all caches removed {} items", removed);
                Ok(removed)
            }
        }
    }

    /// Destroy every cache. The config cache is destroyed too.
    pub async fn destroy(&self) {
        let caches: Vec<Cache> = self.caches.write().await.drain().map(|(_, c)| c).collect();
        for cache in &caches {
            cache.destroy();
        }
        self.config_cache.destroy();
        log::info!("Cache manager destroyed {} caches", caches.len() + 1);
    }

    async fn build_cache(&self, name: &str, options: CacheOptions) -> Result<Cache> {
        Cache::builder(self.root.join(name))
            .name(name)
            .options(options)
            .build()
            .await
    }

    async fn all_caches(&self) -> Vec<Cache> {
        let mut caches: Vec<Cache> = self.caches.read().await.values().cloned().collect();
        caches.push(self.config_cache.clone());
        caches
    }
}

impl std::fmt::Debug for CacheManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheManager")
            .field("root", &self.root)
            .finish_non_exhaustive()
    }
}

/// Cache names become directory names
fn validate_name(name: &str) -> Result<()> {
    let valid = !name.is_empty()
        && name != "."
        && name != ".."
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
    if valid {
        Ok(())
    } else {
        Err(Error::validation(
            name,
            "cache names may only use ASCII letters, digits, '-', '_' and '.'",
        ))
    }
}
