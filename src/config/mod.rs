pub mod loader;
pub mod validator;
pub mod watcher;

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::server::ServerConfig;

/// Complete application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    /// Listener configuration (environment variables only)
    pub server: ServerConfig,

    /// Storage collaborator configuration (environment variables only)
    pub storage: StorageConfig,

    /// Limiter and pagination policy (loaded from file, supports hot reload)
    pub api: ApiConfig,
}

/// Storage collaborator configuration (loaded from environment variables)
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Upper bound on every storage round trip, in seconds
    pub query_timeout_secs: u64,
}

impl StorageConfig {
    pub fn from_env() -> Self {
        Self {
            query_timeout_secs: std::env::var("STORAGE_QUERY_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(3),
        }
    }

    pub fn query_timeout(&self) -> Duration {
        Duration::from_secs(self.query_timeout_secs)
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            query_timeout_secs: 3,
        }
    }
}

/// Policy configuration (loaded from JSON file)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default)]
    pub limiter: LimiterConfig,

    #[serde(default)]
    pub pagination: PaginationConfig,
}

/// Per-client token bucket settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimiterConfig {
    /// When false every request is admitted without touching the registry
    pub enabled: bool,

    /// Sustained refill rate (tokens per second)
    pub requests_per_second: f64,

    /// Bucket capacity (burst size)
    pub burst: u32,

    /// How often idle clients are swept, in seconds
    pub sweep_interval_secs: u64,

    /// How long a client may stay idle before its bucket is evicted, in seconds
    pub retention_secs: u64,
}

impl LimiterConfig {
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    pub fn retention(&self) -> Duration {
        Duration::from_secs(self.retention_secs)
    }
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            requests_per_second: 2.0,
            burst: 4,
            sweep_interval_secs: 60,
            retention_secs: 180,
        }
    }
}

/// Highest page number any configuration may allow
pub const PAGE_CEILING: i64 = 10_000_000;

/// Largest page size any configuration may allow
pub const PAGE_SIZE_CEILING: i64 = 100;

/// Bounds applied to list queries
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PaginationConfig {
    pub max_page: i64,
    pub max_page_size: i64,
    pub default_page_size: i64,

    /// Sortable values; a leading '-' means descending
    pub sort_safelist: Vec<String>,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            max_page: PAGE_CEILING,
            max_page_size: PAGE_SIZE_CEILING,
            default_page_size: 20,
            sort_safelist: ["id", "title", "year", "runtime", "-id", "-title", "-year", "-runtime"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}
