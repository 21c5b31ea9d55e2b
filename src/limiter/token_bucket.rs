use tokio::time::Instant;

/// Token bucket for a single client.
///
/// Holds up to `capacity` tokens and refills continuously at
/// `refill_rate_per_second`. Every observation keeps
/// `0 <= tokens <= capacity`.
#[derive(Debug, Clone)]
pub struct TokenBucket {
    capacity: f64,
    tokens: f64,
    refill_rate_per_second: f64,
    last_refill: Instant,
}

impl TokenBucket {
    /// Create a full bucket. Callers pass validated, positive settings.
    pub fn new(capacity: f64, refill_rate_per_second: f64, now: Instant) -> Self {
        Self {
            capacity,
            tokens: capacity,
            refill_rate_per_second,
            last_refill: now,
        }
    }

    pub fn capacity(&self) -> f64 {
        self.capacity
    }

    pub fn refill_rate(&self) -> f64 {
        self.refill_rate_per_second
    }

    pub fn tokens(&self) -> f64 {
        self.tokens
    }

    /// Add `elapsed * rate` tokens since the last refill, capped at capacity.
    fn refill(&mut self, now: Instant) {
        // Monotonic clock, but an instant older than `last_refill` can still
        // be passed in; saturate instead of going negative.
        let elapsed = now.saturating_duration_since(self.last_refill);
        if elapsed.is_zero() {
            return;
        }
        self.tokens = (self.tokens + elapsed.as_secs_f64() * self.refill_rate_per_second)
            .min(self.capacity);
        self.last_refill = now;
    }

    /// Refill, then take one token if available.
    pub fn try_acquire(&mut self, now: Instant) -> bool {
        self.refill(now);
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Apply new settings after a config reload, keeping the current level
    /// within the new capacity.
    pub fn reconfigure(&mut self, capacity: f64, refill_rate_per_second: f64, now: Instant) {
        self.refill(now);
        self.capacity = capacity;
        self.refill_rate_per_second = refill_rate_per_second;
        self.tokens = self.tokens.min(capacity);
    }
}
