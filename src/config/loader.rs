use crate::config::validator::{validate_api_config, validate_config};
use crate::config::{ApiConfig, AppConfig, StorageConfig};
use crate::errors::{AppError, Result};
use crate::server::ServerConfig;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Load limiter and pagination policy from a JSON file
pub async fn load_api_config_from_file<P: AsRef<Path>>(path: P) -> Result<ApiConfig> {
    let path = path.as_ref();
    info!("Loading API configuration from: {}", path.display());

    let contents = tokio::fs::read_to_string(path)
        .await
        .map_err(AppError::FileSystemError)?;

    let config: ApiConfig = serde_json::from_str(&contents).map_err(AppError::JsonError)?;

    validate_api_config(&config)?;

    info!("API configuration loaded and validated successfully");
    log_api_config_summary(&config);

    Ok(config)
}

/// Path of the policy file, from `API_CONFIG`
pub fn config_path() -> PathBuf {
    std::env::var("API_CONFIG")
        .unwrap_or_else(|_| "config/api.json".to_string())
        .into()
}

/// Load complete application configuration
/// - Server and storage settings from environment variables
/// - Limiter and pagination policy from the JSON file at `path`
pub async fn load_config(path: &Path) -> Result<AppConfig> {
    info!("Loading application configuration...");

    let server = ServerConfig::from_env();
    let storage = StorageConfig::from_env();

    debug!("API config path: {}", path.display());

    let api = match load_api_config_from_file(path).await {
        Ok(config) => config,
        Err(AppError::FileSystemError(e)) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(
                "Config file '{}' not found, using built-in defaults",
                path.display()
            );
            ApiConfig::default()
        }
        Err(e) => return Err(e),
    };

    let app_config = AppConfig {
        server,
        storage,
        api,
    };

    validate_config(&app_config)?;

    info!("Application configuration loaded and validated successfully");
    log_config_summary(&app_config);

    Ok(app_config)
}

/// Log a summary of the loaded configuration (AppConfig)
fn log_config_summary(config: &AppConfig) {
    info!("=== Configuration Summary ===");
    info!("Listen address: {}", config.server.addr());
    info!("Environment: {}", config.server.env);
    info!("Storage query timeout: {}s", config.storage.query_timeout_secs);

    let limiter = &config.api.limiter;
    info!(
        "Limiter: enabled={}, {:.2} req/sec, burst: {}, sweep every {}s, retention {}s",
        limiter.enabled,
        limiter.requests_per_second,
        limiter.burst,
        limiter.sweep_interval_secs,
        limiter.retention_secs
    );

    let pagination = &config.api.pagination;
    info!(
        "Pagination: max_page={}, max_page_size={}, default_page_size={}",
        pagination.max_page, pagination.max_page_size, pagination.default_page_size
    );
    info!("Sortable values: {}", pagination.sort_safelist.join(", "));
    info!("=============================");
}

/// Log only the file-backed part (used by the reload path)
fn log_api_config_summary(config: &ApiConfig) {
    debug!("=== ApiConfig Summary ===");
    debug!(
        "Limiter: enabled={}, {:.2} req/sec, burst: {}",
        config.limiter.enabled, config.limiter.requests_per_second, config.limiter.burst
    );
    debug!(
        "Pagination: max_page_size={}, sortable={}",
        config.pagination.max_page_size,
        config.pagination.sort_safelist.len()
    );
    debug!("=========================");
}
