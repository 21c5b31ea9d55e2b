//! Notify-based configuration hot-reload watcher.
//!
//! - Watches the policy JSON file using notify::RecommendedWatcher.
//! - On create/modify events, reloads and validates the file, then pushes the
//!   limiter section into the live registry and swaps the pagination section.
//! - A file that fails to load or validate leaves the running policy alone.

use crate::config::loader::load_api_config_from_file;
use crate::config::{ApiConfig, PaginationConfig};
use crate::errors::AppError;
use crate::limiter::LimiterRegistry;
use arc_swap::ArcSwap;
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Live targets of a reload.
#[derive(Clone)]
pub struct ReloadTargets {
    pub registry: Arc<LimiterRegistry>,
    pub pagination: Arc<ArcSwap<PaginationConfig>>,
}

/// Watch the policy file until `cancel` fires.
pub async fn watch_config_file(
    path: PathBuf,
    targets: ReloadTargets,
    cancel: CancellationToken,
) -> Result<(), notify::Error> {
    // Bridge the watcher's sync callback thread into this task.
    let (tx, mut rx) = mpsc::channel(1);

    let mut watcher = RecommendedWatcher::new(
        move |res: Result<Event, notify::Error>| {
            if let Err(e) = tx.blocking_send(res) {
                // Receiver gone: the watch task has ended.
                debug!("Failed to send config file event: {}", e);
            }
        },
        notify::Config::default(),
    )?;

    watcher.watch(&path, RecursiveMode::NonRecursive)?;
    info!("Watching config file for changes: {}", path.display());

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            res = rx.recv() => match res {
                Some(Ok(event)) => {
                    if should_reload(&event) {
                        info!(
                            "Config file change detected. Event: {:?}. Triggering reload.",
                            event.kind
                        );
                        reload_config(&path, &targets).await;
                    } else {
                        debug!("Ignoring irrelevant filesystem event: {:?}", event.kind);
                    }
                }
                Some(Err(e)) => {
                    crate::metrics::record_config_reload(false);
                    error!("Error watching config file: {}", e);
                }
                None => break,
            }
        }
    }

    warn!("Configuration watcher task is shutting down.");
    Ok(())
}

fn should_reload(event: &Event) -> bool {
    matches!(
        event.kind,
        notify::EventKind::Modify(_) | notify::EventKind::Create(_)
    )
}

/// Reload the file and apply it; keeps the old policy on any failure.
pub async fn reload_config(path: &Path, targets: &ReloadTargets) {
    let new_config = match load_api_config_from_file(path).await {
        Ok(config) => config,
        Err(e) => {
            crate::metrics::record_config_reload(false);
            match e {
                AppError::FileSystemError(io_err) => {
                    error!(
                        "Failed to read config file '{}': {}. Keeping old config.",
                        path.display(),
                        io_err
                    );
                }
                AppError::JsonError(json_err) => {
                    error!(
                        "Failed to parse JSON from '{}': {}. Keeping old config.",
                        path.display(),
                        json_err
                    );
                }
                other => {
                    error!(
                        "New configuration in '{}' is invalid: {}. Keeping old config.",
                        path.display(),
                        other
                    );
                }
            }
            return;
        }
    };

    apply(new_config, targets);
    crate::metrics::record_config_reload(true);
    info!("Configuration hot-reloaded successfully. Service is now using the new settings.");
}

fn apply(config: ApiConfig, targets: &ReloadTargets) {
    let current_interval = targets.registry.settings().sweep_interval_secs;
    if config.limiter.sweep_interval_secs != current_interval {
        warn!(
            "sweep_interval_secs changed to {}; the new interval applies after a restart",
            config.limiter.sweep_interval_secs
        );
    }
    targets.registry.apply_settings(config.limiter);
    targets.pagination.store(Arc::new(config.pagination));
}
