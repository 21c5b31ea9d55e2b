pub mod config;
pub mod data;
pub mod errors;
pub mod limiter;
pub mod metrics;
pub mod server;
pub mod store;

// Re-export commonly used types
pub use config::{ApiConfig, AppConfig, LimiterConfig, PaginationConfig};
pub use errors::{AppError, Result};
pub use limiter::{LimiterRegistry, RequestGate};
pub use server::{router, routes, serve, start_server, with_middleware, AppState, ServerConfig};
pub use store::{InMemoryMovieStore, MovieStore};
