pub mod handler;
pub mod middleware;

use arc_swap::ArcSwap;
use axum::extract::DefaultBodyLimit;
use axum::routing::get;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::config::PaginationConfig;
use crate::data::MovieModel;
use crate::errors::{AppError, Result};
use crate::limiter::{LimiterRegistry, RequestGate};
use crate::store::MovieStore;

/// Largest accepted request body
pub const MAX_BODY_BYTES: usize = 1_048_576;

/// HTTP listener configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Deployment environment label (development|staging|production)
    pub env: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 4000,
            env: "development".to_string(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: std::env::var("API_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(4000),
            env: std::env::var("API_ENV").unwrap_or_else(|_| "development".to_string()),
        }
    }

    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Shared handler state
pub struct AppState<S: MovieStore> {
    pub movies: MovieModel<S>,
    pub pagination: Arc<ArcSwap<PaginationConfig>>,
    pub env: String,
}

impl<S: MovieStore> Clone for AppState<S> {
    fn clone(&self) -> Self {
        Self {
            movies: self.movies.clone(),
            pagination: Arc::clone(&self.pagination),
            env: self.env.clone(),
        }
    }
}

/// Route table for the movie API, without middleware or state.
pub fn routes<S: MovieStore + 'static>() -> Router<AppState<S>> {
    Router::new()
        .route("/v1/healthcheck", get(handler::healthcheck::<S>))
        .route(
            "/v1/movies",
            get(handler::list_movies::<S>).post(handler::create_movie::<S>),
        )
        .route(
            "/v1/movies/:id",
            get(handler::show_movie::<S>)
                .patch(handler::update_movie::<S>)
                .delete(handler::delete_movie::<S>),
        )
        .route("/debug/metrics", get(handler::metrics))
        .fallback(handler::not_found)
}

/// Wrap `routes` in the request pipeline. From the outside in: metrics,
/// panic recovery, CORS, rate limiting, body limit.
pub fn with_middleware<T>(routes: Router<T>, gate: RequestGate<LimiterRegistry>) -> Router<T>
where
    T: Clone + Send + Sync + 'static,
{
    routes
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(axum::middleware::from_fn_with_state(
            gate,
            middleware::rate_limit,
        ))
        .layer(CorsLayer::permissive())
        .layer(CatchPanicLayer::custom(middleware::recover_panic))
        .layer(axum::middleware::from_fn(middleware::track_metrics))
}

/// Build the full route table with metrics and rate limiting applied to
/// every route.
pub fn router<S: MovieStore + 'static>(
    state: AppState<S>,
    gate: RequestGate<LimiterRegistry>,
) -> Router {
    with_middleware(routes::<S>(), gate).with_state(state)
}

/// Bind the configured address and serve until `shutdown` is cancelled
pub async fn start_server(
    config: &ServerConfig,
    app: Router,
    shutdown: CancellationToken,
) -> Result<()> {
    let listener = TcpListener::bind(config.addr())
        .await
        .map_err(|e| AppError::InternalError(format!("Failed to bind {}: {}", config.addr(), e)))?;

    info!("Starting HTTP server on {}", config.addr());
    serve(listener, app, shutdown).await
}

/// Serve on an already bound listener. Peer addresses are exposed to the
/// rate-limit middleware as `ConnectInfo<SocketAddr>`.
pub async fn serve(listener: TcpListener, app: Router, shutdown: CancellationToken) -> Result<()> {
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move { shutdown.cancelled().await })
    .await
    .map_err(|e| AppError::InternalError(format!("Server error: {}", e)))?;

    info!("HTTP server stopped");
    Ok(())
}
