//! Per-client limiter registry and its idle-entry sweeper.
//!
//! The registry maps a client key (normally the peer IP) to a token bucket.
//! Every lookup, bucket mutation and sweep happens under a single mutex, and
//! each critical section is O(1) apart from the sweep's linear pass.
//!
//! The sweeper follows the same shape as the other background tasks in this
//! service: a `tokio::time::interval` ticker raced against a
//! `CancellationToken` that the server cancels on shutdown.

use arc_swap::ArcSwap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::config::LimiterConfig;
use crate::limiter::token_bucket::TokenBucket;
use crate::limiter::RateLimiter;

/// Bucket and last-seen time for one client.
#[derive(Debug)]
struct ClientLimiterEntry {
    bucket: TokenBucket,
    last_seen: Instant,
}

pub struct LimiterRegistry {
    clients: Mutex<HashMap<String, ClientLimiterEntry>>,
    settings: ArcSwap<LimiterConfig>,
}

impl LimiterRegistry {
    /// Create a registry. `settings` must already have passed config validation.
    pub fn new(settings: LimiterConfig) -> Self {
        Self {
            clients: Mutex::new(HashMap::new()),
            settings: ArcSwap::from_pointee(settings),
        }
    }

    pub fn settings(&self) -> Arc<LimiterConfig> {
        self.settings.load_full()
    }

    /// Swap in reloaded settings. Existing buckets pick up the new capacity
    /// and rate on their next request.
    pub fn apply_settings(&self, settings: LimiterConfig) {
        info!(
            enabled = settings.enabled,
            rps = settings.requests_per_second,
            burst = settings.burst,
            "Applying new limiter settings"
        );
        self.settings.store(Arc::new(settings));
    }

    /// Number of clients currently tracked.
    pub fn len(&self) -> usize {
        self.clients.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Decide one request for `client_key` as of `now`.
    pub fn allow_at(&self, client_key: &str, now: Instant) -> bool {
        let settings = self.settings.load();
        let capacity = settings.burst as f64;
        let rate = settings.requests_per_second;

        let mut clients = self.clients.lock();
        let entry = clients
            .entry(client_key.to_string())
            .or_insert_with(|| {
                debug!(client = %client_key, "Tracking new client");
                ClientLimiterEntry {
                    bucket: TokenBucket::new(capacity, rate, now),
                    last_seen: now,
                }
            });

        if entry.bucket.capacity() != capacity || entry.bucket.refill_rate() != rate {
            entry.bucket.reconfigure(capacity, rate, now);
        }

        entry.last_seen = now;
        entry.bucket.try_acquire(now)
    }

    /// Evict every client idle for longer than the retention window as of
    /// `now`. Returns the number of evicted entries.
    pub fn sweep_at(&self, now: Instant) -> usize {
        let retention = self.settings.load().retention();

        let mut clients = self.clients.lock();
        let before = clients.len();
        clients.retain(|_, entry| now.saturating_duration_since(entry.last_seen) <= retention);
        let evicted = before - clients.len();
        let remaining = clients.len();
        drop(clients);

        crate::metrics::record_sweep(evicted, remaining);
        if evicted > 0 {
            debug!(evicted, remaining, "Swept idle limiter entries");
        }
        evicted
    }

    pub fn sweep(&self) -> usize {
        self.sweep_at(Instant::now())
    }
}

impl RateLimiter for LimiterRegistry {
    fn allow(&self, client_key: &str) -> bool {
        self.allow_at(client_key, Instant::now())
    }

    fn enabled(&self) -> bool {
        self.settings.load().enabled
    }
}

/// Start the periodic sweep. Cancel the returned token to stop it.
pub fn spawn_sweep_task(registry: Arc<LimiterRegistry>, every: Duration) -> CancellationToken {
    let cancel = CancellationToken::new();
    let cancel_clone = cancel.clone();

    tokio::spawn(async move {
        run_sweep_loop(registry, every, cancel_clone).await;
    });

    cancel
}

async fn run_sweep_loop(registry: Arc<LimiterRegistry>, every: Duration, cancel: CancellationToken) {
    let mut ticker = interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    // The first tick completes immediately; nothing is stale yet.
    ticker.tick().await;

    info!(interval_secs = every.as_secs(), "Limiter sweep task started");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("Limiter sweep task shutting down");
                break;
            }
            _ = ticker.tick() => {
                registry.sweep();
            }
        }
    }
}
