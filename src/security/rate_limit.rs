//! Per-client admission control.
//!
//! Every client key gets its own token bucket the first time it is seen.
//! Buckets live in a single registry behind one mutex; a background sweeper
//! forgets clients that have been idle longer than the configured timeout,
//! after which they start over with a full burst.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use axum::{
    body::Body,
    extract::State,
    http::{Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tokio::sync::broadcast;
use tokio::time::{self, Instant};

use crate::config::{RateLimitConfig, MAX_SWEEP_INTERVAL_SECS};
use crate::identity::client::{client_address, peer_address};
use crate::observability::metrics;

/// A token bucket refilled continuously at `rate` tokens per second.
///
/// Safe to share between requests; each `allow` is atomic.
#[derive(Debug)]
pub struct TokenBucket {
    rate: f64,
    burst: f64,
    state: Mutex<BucketState>,
}

#[derive(Debug)]
struct BucketState {
    tokens: f64,
    last_update: Instant,
}

impl TokenBucket {
    /// Create a full bucket.
    pub fn new(rate: f64, burst: u32) -> Self {
        Self {
            rate,
            burst: burst as f64,
            state: Mutex::new(BucketState {
                tokens: burst as f64,
                last_update: Instant::now(),
            }),
        }
    }

    /// Take one token if available.
    pub fn allow(&self) -> bool {
        self.allow_at(Instant::now())
    }

    fn allow_at(&self, now: Instant) -> bool {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let elapsed = now.saturating_duration_since(state.last_update).as_secs_f64();

        state.tokens = (state.tokens + elapsed * self.rate).min(self.burst);
        state.last_update = now;

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Tokens currently available, after refill.
    pub fn available(&self) -> f64 {
        let state = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        let elapsed = Instant::now()
            .saturating_duration_since(state.last_update)
            .as_secs_f64();
        (state.tokens + elapsed * self.rate).min(self.burst)
    }
}

struct Visitor {
    limiter: Arc<TokenBucket>,
    last_seen: Instant,
}

/// Bucket parameters and eviction timing.
#[derive(Debug, Clone, Copy)]
pub struct AdmissionSettings {
    pub rate: f64,
    pub burst: u32,
    pub sweep_interval: Duration,
    pub idle_timeout: Duration,
}

impl Default for AdmissionSettings {
    fn default() -> Self {
        Self::from(&RateLimitConfig::default())
    }
}

impl From<&RateLimitConfig> for AdmissionSettings {
    fn from(config: &RateLimitConfig) -> Self {
        Self {
            rate: config.requests_per_second,
            burst: config.burst_size,
            sweep_interval: Duration::from_secs(config.sweep_interval_secs),
            idle_timeout: Duration::from_secs(config.idle_timeout_secs),
        }
    }
}

/// Registry of visitors keyed by client address.
pub struct AdmissionController {
    visitors: Mutex<HashMap<String, Visitor>>,
    settings: AdmissionSettings,
}

impl AdmissionController {
    pub fn new(settings: AdmissionSettings) -> Self {
        Self {
            visitors: Mutex::new(HashMap::new()),
            settings,
        }
    }

    /// Decide whether `key` may make a request now.
    pub fn allow(&self, key: &str) -> bool {
        self.limiter_for(key).allow()
    }

    /// Fetch (or create) the bucket for `key` and mark it as seen.
    ///
    /// The registry lock is released before the caller consults the bucket.
    fn limiter_for(&self, key: &str) -> Arc<TokenBucket> {
        let now = Instant::now();
        let mut visitors = self.visitors.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(visitor) = visitors.get_mut(key) {
            visitor.last_seen = now;
            return visitor.limiter.clone();
        }

        let limiter = Arc::new(TokenBucket::new(self.settings.rate, self.settings.burst));
        visitors.insert(
            key.to_string(),
            Visitor {
                limiter: limiter.clone(),
                last_seen: now,
            },
        );
        tracing::trace!(client = %key, "Tracking new visitor");
        limiter
    }

    /// Drop visitors idle for longer than the idle timeout. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let idle_timeout = self.settings.idle_timeout;
        let mut visitors = self.visitors.lock().unwrap_or_else(PoisonError::into_inner);

        let before = visitors.len();
        visitors.retain(|_, v| now.saturating_duration_since(v.last_seen) <= idle_timeout);
        let evicted = before - visitors.len();

        metrics::record_visitor_sweep(visitors.len(), evicted);
        evicted
    }

    /// Number of visitors currently tracked.
    pub fn len(&self) -> usize {
        self.visitors.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, key: &str) -> bool {
        self.visitors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }

    /// Sweep periodically until shutdown is signalled.
    ///
    /// The interval is clamped to between 1ms and one day.
    pub async fn run_sweeper(self: Arc<Self>, mut shutdown: broadcast::Receiver<()>) {
        let period = self.settings.sweep_interval.clamp(
            Duration::from_millis(1),
            Duration::from_secs(MAX_SWEEP_INTERVAL_SECS),
        );
        tracing::info!(
            interval_secs = period.as_secs(),
            idle_timeout_secs = self.settings.idle_timeout.as_secs(),
            "Visitor sweeper starting"
        );

        let mut ticker = time::interval_at(Instant::now() + period, period);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let evicted = self.sweep();
                    if evicted > 0 {
                        tracing::debug!(evicted, remaining = self.len(), "Evicted idle visitors");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Visitor sweeper received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }
}

impl Default for AdmissionController {
    fn default() -> Self {
        Self::new(AdmissionSettings::default())
    }
}

/// Rejects clients that have exhausted their bucket with 429.
pub async fn rate_limit_middleware(
    State(controller): State<Arc<AdmissionController>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let peer = peer_address(request.extensions());
    let key = client_address(request.headers(), &peer);

    if controller.allow(&key) {
        next.run(request).await
    } else {
        tracing::warn!(client = %key, "Rate limit exceeded");
        metrics::record_rate_limited();
        (
            StatusCode::TOO_MANY_REQUESTS,
            "Rate limit exceeded. Please try again later.",
        )
            .into_response()
    }
}
