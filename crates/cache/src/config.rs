//! Cache configuration management with precedence and validation
//!
//! Effective configuration is assembled from defaults, an optional JSON file
//! and `PINCACHE_*` environment variables, in increasing precedence. Builder
//! calls made by embedding code win over all of them.

use crate::errors::{CacheError, Result};
use pincache_utils::XdgPaths;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Public gateways in order of preference
pub const DEFAULT_GATEWAYS: [&str; 6] = [
    "https://cloudflare-ipfs.com/ipfs/",
    "https://ipfs.io/ipfs/",
    "https://gateway.pinata.cloud/ipfs/",
    "https://gateway.ipfs.io/ipfs/",
    "https://dweb.link/ipfs/",
    "https://ipfs.fleek.co/ipfs/",
];

/// Well-known CID used to measure gateway health
pub const DEFAULT_HEALTH_CHECK_CID: &str = "QmYgtfMBZW5B5bWgwHXvDyDwHXxG8yf6xgULYANpBnz7Kf";

const ENV_PREFIX: &str = "PINCACHE_";

/// Configuration for the retrieval cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct CacheConfig {
    /// Directory holding one file per cached CID
    pub cache_dir: PathBuf,
    /// SQLite database holding per-CID metadata
    pub database_path: PathBuf,
    /// Gateway base endpoints in configured order
    pub gateways: Vec<String>,
    /// Upper bound for on-disk content, in mebibytes
    #[serde(rename = "maxCacheSizeMB")]
    pub max_cache_size_mb: u64,
    /// Capacity of the in-memory metadata LRU
    pub memory_metadata_capacity: usize,
    /// Capacity of the in-memory validated URL LRU
    #[serde(rename = "memoryURLCapacity")]
    pub memory_url_capacity: usize,
    pub connect_probe_timeout_ms: u64,
    pub download_connect_timeout_ms: u64,
    /// Bounds the wait for response headers and for each body chunk
    pub download_read_timeout_ms: u64,
    pub preload_requires_unmetered_network: bool,
    /// CID requested from every gateway by the health check
    pub health_check_cid: String,
    /// Probes at or above this latency mark a gateway as slow
    pub slow_gateway_threshold_ms: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            cache_dir: XdgPaths::content_dir(),
            database_path: XdgPaths::metadata_db(),
            gateways: DEFAULT_GATEWAYS.iter().map(|g| (*g).to_string()).collect(),
            max_cache_size_mb: 100,
            memory_metadata_capacity: 20,
            memory_url_capacity: 50,
            connect_probe_timeout_ms: 5_000,
            download_connect_timeout_ms: 10_000,
            download_read_timeout_ms: 30_000,
            preload_requires_unmetered_network: true,
            health_check_cid: DEFAULT_HEALTH_CHECK_CID.to_string(),
            slow_gateway_threshold_ms: 1_000,
        }
    }
}

impl CacheConfig {
    /// Start a builder from default values
    pub fn builder() -> CacheConfigBuilder {
        CacheConfigBuilder::new()
    }

    /// Configured disk limit in bytes
    pub fn max_cache_bytes(&self) -> u64 {
        self.max_cache_size_mb.saturating_mul(1024 * 1024)
    }

    pub fn connect_probe_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_probe_timeout_ms)
    }

    pub fn download_connect_timeout(&self) -> Duration {
        Duration::from_millis(self.download_connect_timeout_ms)
    }

    pub fn download_read_timeout(&self) -> Duration {
        Duration::from_millis(self.download_read_timeout_ms)
    }

    pub fn slow_gateway_threshold(&self) -> Duration {
        Duration::from_millis(self.slow_gateway_threshold_ms)
    }

    /// Parse a configuration from JSON, filling omitted fields with defaults
    pub fn from_json_str(content: &str) -> Result<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Read a JSON configuration file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| CacheError::filesystem(path, "read config file", e))?;
        Self::from_json_str(&content)
    }

    /// Check every option for values the cache cannot operate with
    pub fn validate(&self) -> Result<()> {
        if self.gateways.is_empty() {
            return Err(CacheError::configuration(
                "at least one gateway must be configured",
            ));
        }
        for gateway in &self.gateways {
            let parsed = url::Url::parse(gateway).map_err(|e| {
                CacheError::configuration(format!("invalid gateway URL '{gateway}': {e}"))
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(CacheError::configuration(format!(
                    "gateway '{gateway}' must use http or https"
                )));
            }
        }
        if self.memory_metadata_capacity == 0 || self.memory_url_capacity == 0 {
            return Err(CacheError::configuration(
                "memory cache capacities must be greater than zero",
            ));
        }
        let timeouts = [
            ("connectProbeTimeoutMs", self.connect_probe_timeout_ms),
            ("downloadConnectTimeoutMs", self.download_connect_timeout_ms),
            ("downloadReadTimeoutMs", self.download_read_timeout_ms),
        ];
        for (name, value) in timeouts {
            if value == 0 {
                return Err(CacheError::configuration(format!(
                    "{name} must be greater than zero"
                )));
            }
        }
        if self.health_check_cid.trim().is_empty() {
            return Err(CacheError::configuration("healthCheckCid must not be empty"));
        }
        Ok(())
    }

    /// Apply `PINCACHE_*` overrides from the process environment
    pub fn apply_env(&mut self) -> Result<bool> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    /// Apply `PINCACHE_*` overrides from an arbitrary lookup
    ///
    /// Returns whether any variable was present.
    pub fn apply_env_with<F>(&mut self, lookup: F) -> Result<bool>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |name: &str| lookup(&format!("{ENV_PREFIX}{name}"));
        let mut applied = false;

        if let Some(dir) = var("CACHE_DIR") {
            self.cache_dir = PathBuf::from(dir);
            applied = true;
        }
        if let Some(path) = var("DATABASE_PATH") {
            self.database_path = PathBuf::from(path);
            applied = true;
        }
        if let Some(list) = var("GATEWAYS") {
            self.gateways = list
                .split(',')
                .map(str::trim)
                .filter(|g| !g.is_empty())
                .map(str::to_string)
                .collect();
            applied = true;
        }
        if let Some(value) = var("MAX_CACHE_SIZE_MB") {
            self.max_cache_size_mb = parse_env("MAX_CACHE_SIZE_MB", &value)?;
            applied = true;
        }
        if let Some(value) = var("MEMORY_METADATA_CAPACITY") {
            self.memory_metadata_capacity = parse_env("MEMORY_METADATA_CAPACITY", &value)?;
            applied = true;
        }
        if let Some(value) = var("MEMORY_URL_CAPACITY") {
            self.memory_url_capacity = parse_env("MEMORY_URL_CAPACITY", &value)?;
            applied = true;
        }
        if let Some(value) = var("CONNECT_PROBE_TIMEOUT_MS") {
            self.connect_probe_timeout_ms = parse_env("CONNECT_PROBE_TIMEOUT_MS", &value)?;
            applied = true;
        }
        if let Some(value) = var("DOWNLOAD_CONNECT_TIMEOUT_MS") {
            self.download_connect_timeout_ms = parse_env("DOWNLOAD_CONNECT_TIMEOUT_MS", &value)?;
            applied = true;
        }
        if let Some(value) = var("DOWNLOAD_READ_TIMEOUT_MS") {
            self.download_read_timeout_ms = parse_env("DOWNLOAD_READ_TIMEOUT_MS", &value)?;
            applied = true;
        }
        if let Some(value) = var("PRELOAD_REQUIRES_UNMETERED") {
            self.preload_requires_unmetered_network =
                parse_env("PRELOAD_REQUIRES_UNMETERED", &value.to_lowercase())?;
            applied = true;
        }

        Ok(applied)
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value.trim().parse().map_err(|_| {
        CacheError::configuration(format!("{ENV_PREFIX}{name} has invalid value '{value}'"))
    })
}

/// Source of configuration for debugging and precedence tracking
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Default configuration
    Default,
    /// Configuration file
    ConfigFile(PathBuf),
    /// Environment variables
    EnvironmentVariable(String),
}

/// Configuration loader that handles precedence
pub struct CacheConfigLoader;

impl CacheConfigLoader {
    /// Load configuration: defaults, then the config file, then environment
    ///
    /// `explicit_file` must exist when given; the XDG default file is only
    /// read when present.
    pub fn load(explicit_file: Option<&Path>) -> Result<(CacheConfig, ConfigSource)> {
        let mut config = CacheConfig::default();
        let mut source = ConfigSource::Default;

        let file = match explicit_file {
            Some(path) => Some(path.to_path_buf()),
            None => {
                let default_path = XdgPaths::config_file();
                default_path.exists().then_some(default_path)
            }
        };

        if let Some(path) = file {
            config = CacheConfig::from_file(&path)?;
            tracing::debug!(path = %path.display(), "loaded cache configuration file");
            source = ConfigSource::ConfigFile(path);
        }

        if config.apply_env()? {
            source = ConfigSource::EnvironmentVariable(format!("{ENV_PREFIX}*"));
        }

        config.validate()?;
        Ok((config, source))
    }
}

/// Builder for creating cache configurations
#[derive(Debug, Clone, Default)]
pub struct CacheConfigBuilder {
    config: CacheConfig,
}

impl CacheConfigBuilder {
    /// Create a new builder with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from an already loaded configuration
    pub fn from_config(config: CacheConfig) -> Self {
        Self { config }
    }

    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.cache_dir = dir.into();
        self
    }

    pub fn with_database_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.database_path = path.into();
        self
    }

    pub fn with_gateways<I, S>(mut self, gateways: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.gateways = gateways.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_max_cache_size_mb(mut self, mb: u64) -> Self {
        self.config.max_cache_size_mb = mb;
        self
    }

    pub fn with_memory_capacities(mut self, metadata: usize, urls: usize) -> Self {
        self.config.memory_metadata_capacity = metadata;
        self.config.memory_url_capacity = urls;
        self
    }

    pub fn with_connect_probe_timeout(mut self, timeout: Duration) -> Self {
        self.config.connect_probe_timeout_ms = duration_ms(timeout);
        self
    }

    pub fn with_download_timeouts(mut self, connect: Duration, read: Duration) -> Self {
        self.config.download_connect_timeout_ms = duration_ms(connect);
        self.config.download_read_timeout_ms = duration_ms(read);
        self
    }

    pub fn with_preload_requires_unmetered_network(mut self, required: bool) -> Self {
        self.config.preload_requires_unmetered_network = required;
        self
    }

    pub fn with_health_check_cid(mut self, cid: impl Into<String>) -> Self {
        self.config.health_check_cid = cid.into();
        self
    }

    pub fn with_slow_gateway_threshold(mut self, threshold: Duration) -> Self {
        self.config.slow_gateway_threshold_ms = duration_ms(threshold);
        self
    }

    /// Validate and build the configuration
    pub fn build(self) -> Result<CacheConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}

fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
