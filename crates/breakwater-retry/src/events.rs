use std::time::{Duration, Instant};

use breakwater_core::GuardEvent;

/// Events emitted by the retry executor.
#[derive(Debug, Clone)]
pub enum RetryEvent {
    /// An attempt failed and a retry is scheduled after `delay`.
    Retry {
        key: String,
        timestamp: Instant,
        /// The attempt that just failed (numbered from 1).
        attempt: usize,
        /// Backoff delay before the next attempt, jitter already applied.
        delay: Duration,
    },
    /// The operation succeeded, on the first attempt or after retries.
    Success {
        key: String,
        timestamp: Instant,
        /// Total attempts made, including the successful one.
        attempts: usize,
    },
    /// Every permitted attempt failed.
    Exhausted {
        key: String,
        timestamp: Instant,
        /// Total attempts made.
        attempts: usize,
    },
    /// An error was classified as not retryable and propagated immediately.
    NotRetryable {
        key: String,
        timestamp: Instant,
        /// The attempt on which the non-retryable error surfaced.
        attempt: usize,
    },
}

impl GuardEvent for RetryEvent {
    fn event_type(&self) -> &'static str {
        match self {
            RetryEvent::Retry { .. } => "retry",
            RetryEvent::Success { .. } => "success",
            RetryEvent::Exhausted { .. } => "exhausted",
            RetryEvent::NotRetryable { .. } => "not_retryable",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            RetryEvent::Retry { timestamp, .. }
            | RetryEvent::Success { timestamp, .. }
            | RetryEvent::Exhausted { timestamp, .. }
            | RetryEvent::NotRetryable { timestamp, .. } => *timestamp,
        }
    }

    fn key(&self) -> &str {
        match self {
            RetryEvent::Retry { key, .. }
            | RetryEvent::Success { key, .. }
            | RetryEvent::Exhausted { key, .. }
            | RetryEvent::NotRetryable { key, .. } => key,
        }
    }
}
