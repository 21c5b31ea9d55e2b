use crate::config::{
    ApiConfig, AppConfig, LimiterConfig, PaginationConfig, StorageConfig, PAGE_CEILING,
    PAGE_SIZE_CEILING,
};
use crate::data::movie::SORTABLE_COLUMNS;
use crate::errors::{AppError, Result};
use tracing::{debug, warn};

/// Validate the entire application configuration
pub fn validate_config(config: &AppConfig) -> Result<()> {
    debug!("Validating configuration...");

    validate_storage_config(&config.storage)?;
    validate_api_config(&config.api)?;

    debug!("Configuration validation successful");
    Ok(())
}

/// Validate the file-backed part of the configuration (also used on reload)
pub fn validate_api_config(config: &ApiConfig) -> Result<()> {
    validate_limiter_config(&config.limiter)?;
    validate_pagination_config(&config.pagination)?;
    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<()> {
    if config.query_timeout_secs == 0 {
        return Err(AppError::ConfigurationError(
            "query_timeout_secs must be greater than 0".to_string(),
        ));
    }

    if config.query_timeout_secs > 9 {
        return Err(AppError::ConfigurationError(format!(
            "query_timeout_secs must be a single-digit number of seconds (got {})",
            config.query_timeout_secs
        )));
    }

    debug!("Storage configuration valid");
    Ok(())
}

/// Validate limiter settings. Disabled limiters are still checked so that
/// enabling them by reload cannot produce a zero-capacity bucket.
fn validate_limiter_config(config: &LimiterConfig) -> Result<()> {
    if !config.requests_per_second.is_finite() || config.requests_per_second <= 0.0 {
        return Err(AppError::InvalidRate(format!(
            "requests_per_second must be positive (got {})",
            config.requests_per_second
        )));
    }

    if config.burst == 0 {
        return Err(AppError::InvalidRate(
            "burst must be greater than 0".to_string(),
        ));
    }

    if config.requests_per_second > 1_000_000.0 {
        warn!(
            "Very high requests_per_second ({}) configured for the limiter",
            config.requests_per_second
        );
    }

    if config.sweep_interval_secs == 0 {
        return Err(AppError::ConfigurationError(
            "sweep_interval_secs must be greater than 0".to_string(),
        ));
    }

    if config.retention_secs == 0 {
        return Err(AppError::ConfigurationError(
            "retention_secs must be greater than 0".to_string(),
        ));
    }

    // A bucket evicted before it refills hands the client a fresh burst early.
    let seconds_to_fill = config.burst as f64 / config.requests_per_second;
    if (config.retention_secs as f64) < seconds_to_fill {
        warn!(
            "retention_secs ({}) is shorter than the bucket refill time ({:.2}s)",
            config.retention_secs, seconds_to_fill
        );
    }

    Ok(())
}

fn validate_pagination_config(config: &PaginationConfig) -> Result<()> {
    if config.max_page < 1 || config.max_page > PAGE_CEILING {
        return Err(AppError::ConfigurationError(format!(
            "max_page must be between 1 and {} (got {})",
            PAGE_CEILING, config.max_page
        )));
    }

    if config.max_page_size < 1 || config.max_page_size > PAGE_SIZE_CEILING {
        return Err(AppError::ConfigurationError(format!(
            "max_page_size must be between 1 and {} (got {})",
            PAGE_SIZE_CEILING, config.max_page_size
        )));
    }

    if config.default_page_size < 1 || config.default_page_size > config.max_page_size {
        return Err(AppError::ConfigurationError(format!(
            "default_page_size must be between 1 and {} (got {})",
            config.max_page_size, config.default_page_size
        )));
    }

    if config.sort_safelist.is_empty() {
        return Err(AppError::ConfigurationError(
            "sort_safelist must contain at least one entry".to_string(),
        ));
    }

    for entry in &config.sort_safelist {
        let column = entry.strip_prefix('-').unwrap_or(entry);
        if !SORTABLE_COLUMNS.contains(&column) {
            return Err(AppError::ConfigurationError(format!(
                "sort_safelist entry '{}' does not name a sortable column",
                entry
            )));
        }
    }

    Ok(())
}
