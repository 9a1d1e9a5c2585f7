//! Cache configuration management with precedence and validation
//!
//! Options resolve in this order, later layers winning:
//! built-in defaults, the `cache` object of `$XDG_CONFIG_HOME/tiercache/config.json`,
//! then `TIERCACHE_*` environment variables.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tiercache_core::{Error, Result};
use tiercache_utils::xdg::XdgPaths;

/// Every tunable of a single cache instance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheOptions {
    /// Default time-to-live for entries stored without an explicit one
    #[serde(with = "duration_ms")]
    pub ttl: Duration,
    /// Largest serialized entry accepted by `set`, in bytes
    pub max_size: usize,
    /// Capacity of the in-memory LRU tier
    pub max_memory_entries: usize,
    pub compression: bool,
    /// Serialized size above which entries are gzipped on disk
    pub compression_threshold: usize,
    pub compression_level: u32,
    pub enable_checksum: bool,
    pub enable_atomic_ops: bool,
    /// Keep `.bak` snapshots of replaced entry files
    pub keep_backups: bool,
    pub enable_circuit_breaker: bool,
    pub circuit_breaker_threshold: usize,
    /// Cooldown before an open breaker lets a probe through
    #[serde(with = "duration_ms")]
    pub circuit_breaker_timeout: Duration,
    pub half_open_max_calls: usize,
    pub enable_partitioning: bool,
    pub partition_count: u32,
    pub enable_background_workers: bool,
    pub worker_count: usize,
    /// Payload size above which compression runs on the worker pool
    pub worker_threshold: usize,
    /// How long a submission waits for a free worker before running inline
    #[serde(with = "duration_ms")]
    pub worker_queue_timeout: Duration,
    pub enable_memory_pressure_detection: bool,
    pub memory_warning_threshold: f64,
    pub memory_critical_threshold: f64,
    #[serde(with = "duration_ms")]
    pub memory_check_interval: Duration,
    pub auto_cleanup: bool,
    #[serde(with = "duration_ms")]
    pub cleanup_interval: Duration,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(5 * 60),
            max_size: 10 * 1024 * 1024, // 10MB
            max_memory_entries: 100,
            compression: true,
            compression_threshold: 1024, // 1KB
            compression_level: 6,
            enable_checksum: true,
            enable_atomic_ops: true,
            keep_backups: false,
            enable_circuit_breaker: true,
            circuit_breaker_threshold: 5,
            circuit_breaker_timeout: Duration::from_secs(30),
            half_open_max_calls: 1,
            enable_partitioning: true,
            partition_count: 256,
            enable_background_workers: true,
            worker_count: default_worker_count(),
            worker_threshold: 64 * 1024, // 64KB
            worker_queue_timeout: Duration::from_millis(100),
            enable_memory_pressure_detection: true,
            memory_warning_threshold: 0.75,
            memory_critical_threshold: 0.90,
            memory_check_interval: Duration::from_secs(30),
            auto_cleanup: true,
            cleanup_interval: Duration::from_secs(5 * 60),
        }
    }
}

/// Half of the available cores, at least one
pub fn default_worker_count() -> usize {
    let cpus = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(2);
    (cpus / 2).max(1)
}

impl CacheOptions {
    pub fn builder() -> CacheOptionsBuilder {
        CacheOptionsBuilder::new()
    }

    /// Reject option combinations the engine cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.max_memory_entries == 0 {
            return Err(Error::validation(
                "max_memory_entries",
                "the memory tier needs room for at least one entry",
            ));
        }
        if self.max_size == 0 {
            return Err(Error::validation("max_size", "must be greater than zero"));
        }
        if self.enable_partitioning && self.partition_count == 0 {
            return Err(Error::validation(
                "partition_count",
                "partitioning is enabled but the partition count is zero",
            ));
        }
        if self.compression_level > 9 {
            return Err(Error::validation(
                "compression_level",
                format!("{} is outside the gzip range 0-9", self.compression_level),
            ));
        }
        if self.enable_circuit_breaker && self.circuit_breaker_threshold == 0 {
            return Err(Error::validation(
                "circuit_breaker_threshold",
                "must be greater than zero",
            ));
        }
        if self.enable_background_workers && self.worker_count == 0 {
            return Err(Error::validation("worker_count", "must be greater than zero"));
        }
        for (name, value) in [
            ("memory_warning_threshold", self.memory_warning_threshold),
            ("memory_critical_threshold", self.memory_critical_threshold),
        ] {
            if !(value > 0.0 && value <= 1.0) {
                return Err(Error::validation(
                    name,
                    format!("{value} is not a fraction in (0, 1]"),
                ));
            }
        }
        if self.memory_warning_threshold >= self.memory_critical_threshold {
            return Err(Error::validation(
                "memory_warning_threshold",
                "must be lower than memory_critical_threshold",
            ));
        }
        Ok(())
    }
}

/// Serde adapter storing durations as integer milliseconds
pub mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Builder for creating cache options
#[derive(Debug, Clone, Default)]
pub struct CacheOptionsBuilder {
    options: CacheOptions,
}

impl CacheOptionsBuilder {
    /// Create a new builder seeded with the defaults
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.options.ttl = ttl;
        self
    }

    pub fn with_max_size(mut self, max_size: usize) -> Self {
        self.options.max_size = max_size;
        self
    }

    pub fn with_max_memory_entries(mut self, entries: usize) -> Self {
        self.options.max_memory_entries = entries;
        self
    }

    /// Enable or disable compression, setting the size threshold
    pub fn with_compression(mut self, enabled: bool, threshold: usize) -> Self {
        self.options.compression = enabled;
        self.options.compression_threshold = threshold;
        self
    }

    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.options.compression_level = level;
        self
    }

    pub fn with_checksum(mut self, enabled: bool) -> Self {
        self.options.enable_checksum = enabled;
        self
    }

    pub fn with_atomic_ops(mut self, enabled: bool, keep_backups: bool) -> Self {
        self.options.enable_atomic_ops = enabled;
        self.options.keep_backups = keep_backups;
        self
    }

    /// Configure the circuit breaker guarding disk I/O
    pub fn with_circuit_breaker(mut self, enabled: bool, threshold: usize, timeout: Duration) -> Self {
        self.options.enable_circuit_breaker = enabled;
        self.options.circuit_breaker_threshold = threshold;
        self.options.circuit_breaker_timeout = timeout;
        self
    }

    pub fn with_partitioning(mut self, enabled: bool, partition_count: u32) -> Self {
        self.options.enable_partitioning = enabled;
        self.options.partition_count = partition_count;
        self
    }

    pub fn with_background_workers(mut self, enabled: bool, worker_count: usize) -> Self {
        self.options.enable_background_workers = enabled;
        self.options.worker_count = worker_count;
        self
    }

    pub fn with_worker_threshold(mut self, threshold: usize) -> Self {
        self.options.worker_threshold = threshold;
        self
    }

    /// Configure memory pressure sampling
    pub fn with_memory_pressure(
        mut self,
        enabled: bool,
        warning_threshold: f64,
        critical_threshold: f64,
    ) -> Self {
        self.options.enable_memory_pressure_detection = enabled;
        self.options.memory_warning_threshold = warning_threshold;
        self.options.memory_critical_threshold = critical_threshold;
        self
    }

    pub fn with_memory_check_interval(mut self, interval: Duration) -> Self {
        self.options.memory_check_interval = interval;
        self
    }

    /// Enable or disable the periodic cleanup timer
    pub fn with_auto_cleanup(mut self, enabled: bool, interval: Duration) -> Self {
        self.options.auto_cleanup = enabled;
        self.options.cleanup_interval = interval;
        self
    }

    /// Validate and return the options
    pub fn build(self) -> Result<CacheOptions> {
        self.options.validate()?;
        Ok(self.options)
    }
}

/// Source of configuration for debugging and precedence tracking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Built-in defaults
    Default,
    /// Configuration file
    ConfigFile(PathBuf),
    /// Environment variables
    EnvironmentVariable(String),
}

/// Fully resolved configuration for a cache root
#[derive(Debug, Clone)]
pub struct CacheConfiguration {
    /// Directory holding every cache managed from this configuration
    pub base_dir: PathBuf,
    pub options: CacheOptions,
    /// Highest-precedence layer that contributed a value
    pub source: ConfigSource,
}

impl Default for CacheConfiguration {
    fn default() -> Self {
        Self {
            base_dir: XdgPaths::cache_dir(),
            options: CacheOptions::default(),
            source: ConfigSource::Default,
        }
    }
}

const ENV_PREFIX: &str = "TIERCACHE_";

/// Configuration loader that handles precedence
pub struct CacheOptionsLoader;

impl CacheOptionsLoader {
    /// Load configuration from the default config file and the environment
    pub fn load() -> Result<CacheConfiguration> {
        let path = Self::config_file_path()?;
        Self::load_from(&path)
    }

    /// Load configuration using `path` as the config file
    pub fn load_from(path: &Path) -> Result<CacheConfiguration> {
        let mut config = CacheConfiguration::default();

        if let Some(cache_obj) = Self::read_config_file(path)? {
            config = Self::merge_file_config(config, cache_obj)?;
            config.source = ConfigSource::ConfigFile(path.to_path_buf());
        }

        if Self::apply_env(&mut config) {
            config.source = ConfigSource::EnvironmentVariable(format!("{ENV_PREFIX}*"));
        }

        config.options.validate()?;
        Ok(config)
    }

    /// `$XDG_CONFIG_HOME/tiercache/config.json`
    pub fn config_file_path() -> Result<PathBuf> {
        let config_dir = if let Ok(xdg_config_home) = std::env::var("XDG_CONFIG_HOME") {
            PathBuf::from(xdg_config_home)
        } else {
            dirs::config_dir().ok_or_else(|| {
                Error::configuration("could not determine config directory; set XDG_CONFIG_HOME")
            })?
        };

        Ok(config_dir.join("tiercache").join("config.json"))
    }

    fn read_config_file(path: &Path) -> Result<Option<serde_json::Map<String, serde_json::Value>>> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(Error::file_system(path, "read config file", e)),
        };

        let file_config: serde_json::Value = serde_json::from_str(&content)
            .map_err(|e| Error::configuration(format!("{}: {e}", path.display())))?;

        Ok(file_config
            .get("cache")
            .and_then(|v| v.as_object())
            .cloned())
    }

    /// Overlay the file's keys onto the current options
    fn merge_file_config(
        mut config: CacheConfiguration,
        mut cache_obj: serde_json::Map<String, serde_json::Value>,
    ) -> Result<CacheConfiguration> {
        if let Some(base_dir) = cache_obj.remove("base_dir") {
            match base_dir.as_str() {
                Some(dir) => config.base_dir = PathBuf::from(dir),
                None => return Err(Error::configuration("cache.base_dir must be a string")),
            }
        }

        let mut merged = serde_json::to_value(&config.options)
            .map_err(|e| Error::configuration(format!("cannot encode options: {e}")))?;
        if let Some(target) = merged.as_object_mut() {
            for (key, value) in cache_obj {
                if target.contains_key(&key) {
                    target.insert(key, value);
                } else {
                    tracing::warn!("Ignoring unknown cache option '{}' in config file", key);
                }
            }
        }

        config.options = serde_json::from_value(merged)
            .map_err(|e| Error::configuration(format!("invalid cache option: {e}")))?;
        Ok(config)
    }

    /// Apply `TIERCACHE_*` overrides, returning whether any were present
    fn apply_env(config: &mut CacheConfiguration) -> bool {
        let mut applied = false;
        let options = &mut config.options;

        if let Ok(dir) = std::env::var(format!("{ENV_PREFIX}DIR")) {
            config.base_dir = PathBuf::from(dir);
            applied = true;
        }

        applied |= env_duration_ms("TTL", &mut options.ttl);
        applied |= env_parse("MAX_SIZE", &mut options.max_size);
        applied |= env_parse("MAX_MEMORY_ENTRIES", &mut options.max_memory_entries);
        applied |= env_bool("COMPRESSION", &mut options.compression);
        applied |= env_parse("COMPRESSION_THRESHOLD", &mut options.compression_threshold);
        applied |= env_bool("CHECKSUM", &mut options.enable_checksum);
        applied |= env_bool("ATOMIC_OPS", &mut options.enable_atomic_ops);
        applied |= env_bool("CIRCUIT_BREAKER", &mut options.enable_circuit_breaker);
        applied |= env_parse("CIRCUIT_BREAKER_THRESHOLD", &mut options.circuit_breaker_threshold);
        applied |= env_duration_ms("CIRCUIT_BREAKER_TIMEOUT", &mut options.circuit_breaker_timeout);
        applied |= env_bool("PARTITIONING", &mut options.enable_partitioning);
        applied |= env_parse("PARTITION_COUNT", &mut options.partition_count);
        applied |= env_bool("BACKGROUND_WORKERS", &mut options.enable_background_workers);
        applied |= env_parse("WORKER_COUNT", &mut options.worker_count);
        applied |= env_bool("MEMORY_PRESSURE", &mut options.enable_memory_pressure_detection);
        applied |= env_bool("AUTO_CLEANUP", &mut options.auto_cleanup);
        applied |= env_duration_ms("CLEANUP_INTERVAL", &mut options.cleanup_interval);

        applied
    }
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(format!("{ENV_PREFIX}{name}")).ok()
}

fn env_parse<T: FromStr>(name: &str, target: &mut T) -> bool {
    match env_value(name) {
        Some(raw) => match raw.trim().parse::<T>() {
            Ok(value) => {
                *target = value;
                true
            }
            Err(_) => {
                tracing::warn!("Ignoring invalid value '{}' for {}{}", raw, ENV_PREFIX, name);
                false
            }
        },
        None => false,
    }
}

fn env_bool(name: &str, target: &mut bool) -> bool {
    match env_value(name) {
        Some(raw) => match raw.trim().to_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => {
                *target = true;
                true
            }
            "0" | "false" | "no" | "off" => {
                *target = false;
                true
            }
            _ => {
                tracing::warn!("Ignoring invalid value '{}' for {}{}", raw, ENV_PREFIX, name);
                false
            }
        },
        None => false,
    }
}

fn env_duration_ms(name: &str, target: &mut Duration) -> bool {
    let mut millis = target.as_millis() as u64;
    if env_parse(name, &mut millis) {
        *target = Duration::from_millis(millis);
        true
    } else {
        false
    }
}
