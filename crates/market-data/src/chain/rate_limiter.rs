//! Token bucket rate limiter for price sources.
//!
//! Replaces the ad hoc per-call random sleep the upstream endpoints
//! otherwise require: each source gets its own bucket, sized for what
//! the endpoint tolerates, and every chain call acquires a token before
//! touching the network.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use log::{debug, warn};

/// Conservative default for unconfigured sources: one request per
/// second with a small burst allowance.
const DEFAULT_REQUESTS_PER_MINUTE: u32 = 60;
const DEFAULT_BURST_CAPACITY: f64 = 2.0;

#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_update: Instant,
    /// Refill rate in tokens per second.
    rate: f64,
    capacity: f64,
}

impl TokenBucket {
    fn new(requests_per_minute: u32, capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_update: Instant::now(),
            rate: f64::from(requests_per_minute) / 60.0,
            capacity,
        }
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.rate).min(self.capacity);
        self.last_update = now;
    }

    fn try_acquire(&mut self) -> bool {
        self.refill();
        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    fn time_until_available(&mut self) -> Duration {
        self.refill();
        if self.tokens >= 1.0 {
            Duration::ZERO
        } else {
            Duration::from_secs_f64((1.0 - self.tokens) / self.rate)
        }
    }
}

/// Rate limit settings for one source.
#[derive(Clone, Debug)]
pub struct RateLimitConfig {
    pub requests_per_minute: u32,
    pub burst_capacity: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: DEFAULT_REQUESTS_PER_MINUTE,
            burst_capacity: DEFAULT_BURST_CAPACITY,
        }
    }
}

/// Per-source token bucket limiter.
///
/// Buckets are created on demand with defaults, or pre-configured via
/// [`configure`](Self::configure).
pub struct RateLimiter {
    buckets: Mutex<HashMap<String, TokenBucket>>,
    configs: Mutex<HashMap<String, RateLimitConfig>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            configs: Mutex::new(HashMap::new()),
        }
    }

    /// Lock a map, recovering from poison; slightly wrong limiting beats
    /// panicking mid-resolution.
    fn lock_buckets(&self) -> MutexGuard<'_, HashMap<String, TokenBucket>> {
        self.buckets.lock().unwrap_or_else(|poisoned| {
            warn!("Rate limiter buckets mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    fn lock_configs(&self) -> MutexGuard<'_, HashMap<String, RateLimitConfig>> {
        self.configs.lock().unwrap_or_else(|poisoned| {
            warn!("Rate limiter configs mutex was poisoned, recovering");
            poisoned.into_inner()
        })
    }

    /// Set limits for a source; an existing bucket is reset.
    pub fn configure(&self, source: &str, config: RateLimitConfig) {
        self.lock_configs().insert(source.to_string(), config);
        self.lock_buckets().remove(source);
    }

    /// Wait until a token is available for `source`, then consume it.
    pub async fn acquire(&self, source: &str) {
        loop {
            let wait = {
                let mut buckets = self.lock_buckets();
                let bucket = buckets
                    .entry(source.to_string())
                    .or_insert_with(|| self.bucket_for(source));
                if bucket.try_acquire() {
                    debug!("Rate limiter: acquired token for '{}'", source);
                    return;
                }
                bucket.time_until_available()
            };

            if wait > Duration::ZERO {
                debug!("Rate limiter: waiting {:?} for '{}'", wait, source);
                tokio::time::sleep(wait).await;
            }
        }
    }

    /// Consume a token if one is available right now.
    pub fn try_acquire(&self, source: &str) -> bool {
        let mut buckets = self.lock_buckets();
        buckets
            .entry(source.to_string())
            .or_insert_with(|| self.bucket_for(source))
            .try_acquire()
    }

    fn bucket_for(&self, source: &str) -> TokenBucket {
        match self.lock_configs().get(source) {
            Some(config) => TokenBucket::new(config.requests_per_minute, config.burst_capacity),
            None => TokenBucket::new(DEFAULT_REQUESTS_PER_MINUTE, DEFAULT_BURST_CAPACITY),
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}
