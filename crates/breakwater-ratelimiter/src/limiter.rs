use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::config::RateLimiterConfig;
use crate::error::RateLimiterError;
use crate::events::RateLimiterEvent;

/// Point-in-time view of the bucket, with refill accrued up to the moment
/// of the snapshot.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct RateLimiterSnapshot {
    /// Tokens currently available.
    pub available_tokens: f64,
    /// Maximum tokens the bucket holds.
    pub capacity: f64,
    /// Continuous refill rate.
    pub refill_per_second: f64,
}

/// Mutable bucket state, guarded by the limiter's mutex.
#[derive(Debug)]
struct TokenBucket {
    tokens: f64,
    last_refill: Instant,
}

impl TokenBucket {
    fn new(capacity: f64) -> Self {
        Self {
            tokens: capacity,
            last_refill: Instant::now(),
        }
    }

    /// Accrues tokens for the time elapsed since the last refill, capped at
    /// capacity. `Instant::duration_since` saturates to zero for an earlier
    /// instant, so refill never runs backward.
    fn refill(&mut self, now: Instant, capacity: f64, rate: f64) {
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        if elapsed > 0.0 {
            self.tokens = (self.tokens + elapsed * rate).min(capacity);
            self.last_refill = now;
        }
    }
}

/// Token-bucket rate limiter.
///
/// Tokens accrue continuously at `refill_per_second` up to `capacity`; each
/// admitted call consumes one. The admission decision is non-blocking and
/// O(1) under a per-limiter mutex. Cloning shares the same bucket.
#[derive(Clone)]
pub struct RateLimiter {
    bucket: Arc<Mutex<TokenBucket>>,
    config: Arc<RateLimiterConfig>,
}

impl RateLimiter {
    /// Builds a limiter from a validated config.
    pub fn new(config: RateLimiterConfig) -> Self {
        let capacity = config.capacity;
        Self {
            bucket: Arc::new(Mutex::new(TokenBucket::new(capacity))),
            config: Arc::new(config),
        }
    }

    /// Builds a limiter for a specific key from a shared config template,
    /// overriding the configured name with the key.
    pub fn for_key(config: &RateLimiterConfig, key: &str) -> Self {
        let mut config = config.clone();
        config.name = key.to_string();
        Self::new(config)
    }

    /// Attempts to consume one token without blocking.
    ///
    /// On rejection the error carries an estimated wait until one token
    /// accrues. Rejection has no side effect beyond bookkeeping.
    pub fn try_acquire(&self) -> Result<(), RateLimiterError> {
        self.try_acquire_at(Instant::now())
    }

    fn try_acquire_at(&self, now: Instant) -> Result<(), RateLimiterError> {
        let mut bucket = self.bucket.lock().unwrap();
        bucket.refill(now, self.config.capacity, self.config.refill_per_second);

        if bucket.tokens >= 1.0 {
            bucket.tokens -= 1.0;
            let tokens_remaining = bucket.tokens;
            drop(bucket);

            #[cfg(feature = "metrics")]
            {
                metrics::counter!(
                    "breakwater_ratelimiter_admitted_total",
                    "name" => self.config.name.clone()
                )
                .increment(1);
                metrics::gauge!(
                    "breakwater_ratelimiter_tokens",
                    "name" => self.config.name.clone()
                )
                .set(tokens_remaining);
            }

            self.config
                .event_listeners
                .emit(&RateLimiterEvent::TokenAcquired {
                    key: self.config.name.clone(),
                    timestamp: now,
                    tokens_remaining,
                });
            Ok(())
        } else {
            let deficit = 1.0 - bucket.tokens;
            let retry_after = Duration::from_secs_f64(deficit / self.config.refill_per_second);
            drop(bucket);

            #[cfg(feature = "tracing")]
            tracing::debug!(
                name = %self.config.name,
                retry_after_ms = retry_after.as_millis() as u64,
                "rate limit exceeded"
            );
            #[cfg(feature = "metrics")]
            metrics::counter!(
                "breakwater_ratelimiter_rejected_total",
                "name" => self.config.name.clone()
            )
            .increment(1);

            self.config
                .event_listeners
                .emit(&RateLimiterEvent::CallRejected {
                    key: self.config.name.clone(),
                    timestamp: now,
                    retry_after,
                });
            Err(RateLimiterError::RateLimitExceeded { retry_after })
        }
    }

    /// Refills the bucket to capacity. Administrative operation, not part
    /// of the normal call path.
    pub fn reset(&self) {
        let now = Instant::now();
        let mut bucket = self.bucket.lock().unwrap();
        bucket.tokens = self.config.capacity;
        bucket.last_refill = now;
        drop(bucket);

        self.config
            .event_listeners
            .emit(&RateLimiterEvent::LimiterReset {
                key: self.config.name.clone(),
                timestamp: now,
            });
    }

    /// Current bucket contents, with refill accrued to now.
    pub fn snapshot(&self) -> RateLimiterSnapshot {
        let mut bucket = self.bucket.lock().unwrap();
        bucket.refill(
            Instant::now(),
            self.config.capacity,
            self.config.refill_per_second,
        );
        RateLimiterSnapshot {
            available_tokens: bucket.tokens,
            capacity: self.config.capacity,
            refill_per_second: self.config.refill_per_second,
        }
    }

    /// Configured name (the guarded key, when registry-managed).
    pub fn name(&self) -> &str {
        &self.config.name
    }
}
