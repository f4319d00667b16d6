//! Cache configuration with precedence: defaults < environment < builder.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default TTL applied when a caller does not specify one (5 minutes)
pub const DEFAULT_TTL: Duration = Duration::from_secs(5 * 60);

/// Connection settings for the remote durable tier.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RemoteConfig {
    /// Base URL of the REST table API
    pub endpoint: String,
    /// Table holding cache rows
    pub table: String,
    /// Service key sent as both apikey and bearer token
    pub service_key: String,
}

/// Source of configuration for debugging and precedence tracking
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    /// Built-in defaults
    Default,
    /// Environment variable overrides
    EnvironmentVariable(String),
    /// Explicit builder calls
    Builder,
}

/// Top-level configuration for the unified cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Capacity of the memory tier
    pub memory_capacity: usize,
    /// Base directory for the local tier; `None` selects the no-op store
    pub local_dir: Option<PathBuf>,
    /// Namespace subdirectory for local entries
    pub local_namespace: String,
    /// Remote tier settings; `None` leaves that tier unconfigured
    pub remote: Option<RemoteConfig>,
    /// TTL used when a write specifies none
    pub default_ttl: Duration,
    /// Where the effective values came from
    pub source: ConfigSource,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            memory_capacity: crate::memory::DEFAULT_CAPACITY,
            local_dir: dirs::cache_dir().map(|d| d.join("contaflux")),
            local_namespace: crate::local::DEFAULT_NAMESPACE.to_string(),
            remote: None,
            default_ttl: DEFAULT_TTL,
            source: ConfigSource::Default,
        }
    }
}

impl CacheConfig {
    /// Defaults overridden by `CONTAFLUX_CACHE_*` environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        let mut overridden = false;

        if let Ok(enabled) = std::env::var("CONTAFLUX_CACHE_ENABLED") {
            if enabled.to_lowercase() == "false" {
                log::debug!("local cache tier disabled via CONTAFLUX_CACHE_ENABLED");
                config.local_dir = None;
            }
            overridden = true;
        }

        if let Ok(dir) = std::env::var("CONTAFLUX_CACHE_DIR") {
            config.local_dir = Some(PathBuf::from(dir));
            overridden = true;
        }

        if let Ok(capacity) = std::env::var("CONTAFLUX_CACHE_MEMORY_CAPACITY") {
            match capacity.parse::<usize>() {
                Ok(parsed) => {
                    config.memory_capacity = parsed;
                    overridden = true;
                }
                Err(_) => {
                    log::warn!("ignoring unparsable CONTAFLUX_CACHE_MEMORY_CAPACITY='{capacity}'");
                }
            }
        }

        if let (Ok(url), Ok(key)) = (
            std::env::var("CONTAFLUX_CACHE_REMOTE_URL"),
            std::env::var("CONTAFLUX_CACHE_REMOTE_KEY"),
        ) {
            let table = std::env::var("CONTAFLUX_CACHE_REMOTE_TABLE")
                .unwrap_or_else(|_| "cache_entries".to_string());
            config.remote = Some(RemoteConfig {
                endpoint: url,
                table,
                service_key: key,
            });
            overridden = true;
        }

        if overridden {
            config.source = ConfigSource::EnvironmentVariable("CONTAFLUX_CACHE*".to_string());
        }
        config
    }
}

/// Builder for creating cache configurations
pub struct CacheConfigBuilder {
    config: CacheConfig,
}

impl CacheConfigBuilder {
    /// Start from defaults (not from the environment).
    pub fn new() -> Self {
        Self {
            config: CacheConfig::default(),
        }
    }

    /// Start from environment-resolved values.
    pub fn from_env() -> Self {
        Self {
            config: CacheConfig::from_env(),
        }
    }

    pub fn with_memory_capacity(mut self, capacity: usize) -> Self {
        self.config.memory_capacity = capacity;
        self
    }

    pub fn with_local_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.local_dir = Some(dir.into());
        self
    }

    /// Disable the local tier entirely (no-op store).
    pub fn without_local_store(mut self) -> Self {
        self.config.local_dir = None;
        self
    }

    pub fn with_local_namespace(mut self, namespace: impl Into<String>) -> Self {
        self.config.local_namespace = namespace.into();
        self
    }

    pub fn with_remote(mut self, remote: RemoteConfig) -> Self {
        self.config.remote = Some(remote);
        self
    }

    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.config.default_ttl = ttl;
        self
    }

    pub fn build(mut self) -> CacheConfig {
        self.config.source = ConfigSource::Builder;
        self.config
    }
}

impl Default for CacheConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
