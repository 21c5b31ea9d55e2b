use std::sync::Arc;
use tracing::debug;

use crate::errors::AppError;
use crate::limiter::RateLimiter;

/// Outcome of admitting one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Proceed,
    Rejected,
}

impl GateDecision {
    /// `Rejected` becomes the rate-limit signal the HTTP layer renders as 429.
    pub fn into_result(self) -> Result<(), AppError> {
        match self {
            GateDecision::Proceed => Ok(()),
            GateDecision::Rejected => Err(AppError::RateLimitExceeded),
        }
    }
}

/// Applies the limiter to each inbound request before any handler runs.
pub struct RequestGate<L: RateLimiter> {
    limiter: Arc<L>,
}

impl<L: RateLimiter> Clone for RequestGate<L> {
    fn clone(&self) -> Self {
        Self {
            limiter: Arc::clone(&self.limiter),
        }
    }
}

impl<L: RateLimiter> RequestGate<L> {
    pub fn new(limiter: Arc<L>) -> Self {
        Self { limiter }
    }

    /// Decide one request attempt. Calls `allow` exactly once when limiting
    /// is enabled and not at all otherwise. Never retries.
    pub fn admit(&self, client_key: &str) -> GateDecision {
        if !self.limiter.enabled() {
            return GateDecision::Proceed;
        }

        let allowed = self.limiter.allow(client_key);
        crate::metrics::record_limiter_decision(allowed);

        if allowed {
            GateDecision::Proceed
        } else {
            debug!(client = %client_key, "Rate limit exceeded");
            GateDecision::Rejected
        }
    }
}
