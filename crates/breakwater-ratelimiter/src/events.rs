use std::time::{Duration, Instant};
use breakwater_core::GuardEvent;

/// Events emitted by the rate limiter.
#[derive(Debug, Clone)]
pub enum RateLimiterEvent {
    /// A token was consumed and the call admitted.
    TokenAcquired {
        key: String,
        timestamp: Instant,
        /// Tokens remaining after this admission.
        tokens_remaining: f64,
    },
    /// No token was available; the call was rejected.
    CallRejected {
        key: String,
        timestamp: Instant,
        /// Estimated wait until one token accrues.
        retry_after: Duration,
    },
    /// The bucket was administratively refilled to capacity.
    LimiterReset { key: String, timestamp: Instant },
}

impl GuardEvent for RateLimiterEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RateLimiterEvent::TokenAcquired { .. } => "token_acquired",
            RateLimiterEvent::CallRejected { .. } => "call_rejected",
            RateLimiterEvent::LimiterReset { .. } => "limiter_reset",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RateLimiterEvent::TokenAcquired { timestamp, .. }
            | RateLimiterEvent::CallRejected { timestamp, .. }
            | RateLimiterEvent::LimiterReset { timestamp, .. } => *timestamp,
        }
    }

    fn key(&self) -> &str {
        match self {
            RateLimiterEvent::TokenAcquired { key, .. }
            | RateLimiterEvent::CallRejected { key, .. }
            | RateLimiterEvent::LimiterReset { key, .. } => key,
        }
    }
}
