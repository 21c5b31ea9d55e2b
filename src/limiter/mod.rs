pub mod gate;
pub mod registry;
pub mod token_bucket;

pub use gate::{GateDecision, RequestGate};
pub use registry::{spawn_sweep_task, LimiterRegistry};
pub use token_bucket::TokenBucket;

/// Trait for per-client admission algorithms.
///
/// Implementations are purely in-memory and never suspend, so they are
/// called directly from request middleware.
pub trait RateLimiter: Send + Sync {
    /// Consume one unit of `client_key`'s allowance; false when exhausted.
    fn allow(&self, client_key: &str) -> bool;

    /// Whether limiting is switched on at all.
    fn enabled(&self) -> bool;
}
