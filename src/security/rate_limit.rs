//! Sliding Window Rate Limiting
//!
//! Implements a per-client rate limiter with:
//! - A trailing window of request timestamps per key (not fixed buckets)
//! - Lazy pruning of expired timestamps on each check
//! - Per-key atomic check-and-record without a global lock
//! - An optional sweep that drops keys with no live timestamps

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use axum::http::{HeaderMap, HeaderValue};
use axum::response::IntoResponse;
use chrono::{DateTime, TimeDelta, Utc};
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::config::RateLimitConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::pipeline::{ClientKey, Next, Rejection, Request, Response, Stage};

/// Source of "now" for rate accounting
pub trait Clock: Send + Sync + fmt::Debug {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Outcome of one rate-limit check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Admission {
    pub allowed: bool,
    /// Slots left in the current window after this check
    pub remaining: u32,
    /// When a client that stops now would have a full window again
    pub reset_at: DateTime<Utc>,
    pub limit: u32,
}

impl Admission {
    /// Write the `X-RateLimit-*` headers for this outcome
    pub fn apply_headers(&self, headers: &mut HeaderMap) {
        headers.insert("x-ratelimit-limit", HeaderValue::from(self.limit));
        headers.insert("x-ratelimit-remaining", HeaderValue::from(self.remaining));
        headers.insert(
            "x-ratelimit-reset",
            HeaderValue::from(self.reset_at.timestamp()),
        );
    }
}

/// Per-key sliding window counter.
///
/// Each key maps to its request timestamps in ascending order. The map is
/// sharded; a check holds the write lock of one shard for the duration of
/// prune, compare and append, so two checks on the same key never interleave
/// while checks on keys in other shards proceed in parallel.
pub struct RateLimiter {
    windows: DashMap<ClientKey, VecDeque<DateTime<Utc>>>,
    requests_per_minute: u32,
    window_seconds: u64,
    window: TimeDelta,
}

impl RateLimiter {
    /// Create a new rate limiter
    pub fn new(requests_per_minute: u32, window_size_seconds: u64) -> Self {
        let window = i64::try_from(window_size_seconds)
            .ok()
            .and_then(TimeDelta::try_seconds)
            .unwrap_or(TimeDelta::MAX);

        Self {
            windows: DashMap::new(),
            requests_per_minute,
            window_seconds: window_size_seconds,
            window,
        }
    }

    pub fn from_config(config: &RateLimitConfig) -> Self {
        Self::new(config.requests_per_minute, config.window_size_seconds)
    }

    /// Admit or reject one request from `key` at `now`, recording it if admitted
    pub fn check_and_record(&self, key: &ClientKey, now: DateTime<Utc>) -> Admission {
        let limit = self.requests_per_minute;
        let reset_at = now
            .checked_add_signed(self.window)
            .unwrap_or(DateTime::<Utc>::MAX_UTC);

        let mut entry = self.windows.entry(key.clone()).or_default();
        let timestamps = entry.value_mut();
        self.prune(timestamps, now);

        if timestamps.len() >= limit as usize {
            return Admission {
                allowed: false,
                remaining: 0,
                reset_at,
                limit,
            };
        }

        // Clock reads race with the shard lock; keep the sequence sorted
        let position = timestamps.partition_point(|&t| t <= now);
        timestamps.insert(position, now);

        Admission {
            allowed: true,
            remaining: limit - timestamps.len() as u32,
            reset_at,
            limit,
        }
    }

    fn prune(&self, timestamps: &mut VecDeque<DateTime<Utc>>, now: DateTime<Utc>) {
        let Some(cutoff) = now.checked_sub_signed(self.window) else {
            return;
        };
        // A timestamp exactly one window old has expired
        while timestamps.front().is_some_and(|&t| t <= cutoff) {
            timestamps.pop_front();
        }
    }

    /// Drop keys whose timestamps have all expired, returning how many went
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, timestamps| {
            self.prune(timestamps, now);
            !timestamps.is_empty()
        });
        before.saturating_sub(self.windows.len())
    }

    /// Timestamps currently retained for `key`, without pruning
    pub fn recorded(&self, key: &ClientKey) -> usize {
        self.windows.get(key).map(|t| t.len()).unwrap_or(0)
    }

    /// Number of keys with an entry
    pub fn tracked_keys(&self) -> usize {
        self.windows.len()
    }

    pub fn limit(&self) -> u32 {
        self.requests_per_minute
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds)
    }
}

impl fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimiter")
            .field("requests_per_minute", &self.requests_per_minute)
            .field("window_seconds", &self.window_seconds)
            .field("tracked_keys", &self.windows.len())
            .finish()
    }
}

/// Run `sweep` on a fixed interval until the returned task is aborted
pub fn spawn_sweeper(
    limiter: Arc<RateLimiter>,
    clock: Arc<dyn Clock>,
    every: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let removed = limiter.sweep(clock.now());
            debug!(
                removed,
                tracked = limiter.tracked_keys(),
                "Swept idle rate limit windows"
            );
        }
    })
}

/// Pipeline stage admitting requests against the shared [`RateLimiter`]
#[derive(Debug, Clone)]
pub struct RateLimitStage {
    limiter: Arc<RateLimiter>,
    clock: Arc<dyn Clock>,
}

impl RateLimitStage {
    pub fn new(limiter: Arc<RateLimiter>, clock: Arc<dyn Clock>) -> Self {
        Self { limiter, clock }
    }
}

#[async_trait]
impl Stage for RateLimitStage {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    async fn process(&self, request: Request, next: Next<'_>) -> GatewayResult<Response> {
        let key = request
            .extensions()
            .get::<ClientKey>()
            .cloned()
            .unwrap_or_else(|| ClientKey::from_request(&request));

        let admission = self.limiter.check_and_record(&key, self.clock.now());

        if !admission.allowed {
            let mut response = GatewayError::RateLimited {
                limit: admission.limit,
                retry_after: self.limiter.window(),
            }
            .into_response();
            admission.apply_headers(response.headers_mut());
            response.extensions_mut().insert(Rejection::RateLimited);
            return Ok(response);
        }

        let mut response = next.run(request).await?;
        admission.apply_headers(response.headers_mut());
        Ok(response)
    }
}
