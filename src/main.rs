use arc_swap::ArcSwap;
use greenlight::config::loader::{config_path, load_config};
use greenlight::config::watcher::{watch_config_file, ReloadTargets};
use greenlight::data::MovieModel;
use greenlight::limiter::spawn_sweep_task;
use greenlight::{router, start_server, AppState, InMemoryMovieStore, LimiterRegistry, RequestGate};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "greenlight=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Greenlight API starting...");

    // Zero rate or burst fails here, before anything is served.
    let path = config_path();
    let config = load_config(&path).await?;

    let registry = Arc::new(LimiterRegistry::new(config.api.limiter.clone()));
    let pagination = Arc::new(ArcSwap::from_pointee(config.api.pagination.clone()));
    let shutdown = CancellationToken::new();

    let sweeper = spawn_sweep_task(Arc::clone(&registry), config.api.limiter.sweep_interval());

    if path.exists() {
        let targets = ReloadTargets {
            registry: Arc::clone(&registry),
            pagination: Arc::clone(&pagination),
        };
        let cancel = shutdown.child_token();
        let watch_path = path.clone();
        tokio::spawn(async move {
            if let Err(e) = watch_config_file(watch_path, targets, cancel).await {
                tracing::error!("Config watcher failed: {}", e);
            }
        });
    }

    let store = Arc::new(InMemoryMovieStore::new());
    let state = AppState {
        movies: MovieModel::new(store, config.storage.query_timeout()),
        pagination,
        env: config.server.env.clone(),
    };
    let app = router(state, RequestGate::new(registry));

    let signal = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Shutdown signal received");
        }
        signal.cancel();
    });

    let served = start_server(&config.server, app, shutdown.clone()).await;

    sweeper.cancel();
    shutdown.cancel();
    served?;
    tracing::info!("Greenlight API stopped");

    Ok(())
}
