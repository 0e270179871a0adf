//! Retry executor guard.
//!
//! A [`RetryExecutor`] re-runs a failed async operation against a backoff
//! schedule until it succeeds, the error is classified as permanent, or the
//! attempt budget is spent. Delays grow exponentially by default and can be
//! perturbed with bounded jitter so callers that failed together do not
//! re-converge on the recovering dependency in lockstep.
//!
//! # Example
//!
//! ```rust
//! use breakwater_retry::{RetryConfig, RetryExecutor};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let executor: RetryExecutor<std::io::Error> = RetryExecutor::new(
//!     RetryConfig::builder()
//!         .max_attempts(3)
//!         .exponential_backoff(Duration::from_millis(100))
//!         .jitter(true)
//!         .retry_on(|e: &std::io::Error| e.kind() == std::io::ErrorKind::TimedOut)
//!         .name("inventory")
//!         .build(),
//! );
//!
//! let result = executor
//!     .execute(|| async { Ok::<_, std::io::Error>("fresh") })
//!     .await;
//! # let _ = result;
//! # }
//! ```
//!
//! # Guarded execution
//!
//! [`RetryExecutor::execute_guarded`] threads a gate and a recorder through
//! the attempt loop so an outer guard observes every individual attempt. A
//! composed stack points both at a circuit breaker: the gate short-circuits
//! further attempts once the breaker opens mid-sequence, and the recorder
//! feeds each attempt's outcome into the breaker's window.

use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};

pub use backoff::{ExponentialBackoff, FixedInterval, FnInterval, IntervalFunction};
pub use config::{RetryConfig, RetryConfigBuilder};
pub use error::RetryError;
pub use events::RetryEvent;

pub mod backoff;
pub mod config;
pub mod error;
pub mod events;

/// Retry executor for one class of operation.
///
/// Holds no per-call state; cloning shares the config template.
///
/// # Type Parameters
///
/// - `E`: the error type of the retried operation
pub struct RetryExecutor<E> {
    config: Arc<RetryConfig<E>>,
}

impl<E> RetryExecutor<E> {
    /// Builds an executor from a validated config.
    pub fn new(config: RetryConfig<E>) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Builds an executor for a specific key from a shared config template,
    /// overriding the configured name with the key.
    pub fn for_key(config: &RetryConfig<E>, key: &str) -> Self {
        let mut config = config.clone();
        config.name = key.to_string();
        Self::new(config)
    }

    /// Configured name (the guarded key, when registry-managed).
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Runs the operation until it succeeds, the retryable predicate rejects
    /// an error, or `max_attempts` is reached.
    pub async fn execute<T, F, Fut>(&self, op: F) -> Result<T, RetryError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.execute_guarded(
            |_attempt| Ok(()),
            |_attempt, _result: &Result<T, E>, _elapsed| {},
            op,
        )
        .await
    }

    /// Runs the operation with per-attempt hooks for an outer guard.
    ///
    /// `gate(attempt)` runs before each attempt; an error aborts the whole
    /// sequence and is returned as-is. `record(attempt, result, elapsed)`
    /// runs after each attempt with that attempt's outcome and duration.
    /// Attempts are numbered from 1.
    ///
    /// The error type `X` only needs a conversion from [`RetryError`], so an
    /// outer guard can abort with its own error while exhaustion and
    /// non-retryable errors convert into the same type.
    pub async fn execute_guarded<T, X, G, R, F, Fut>(
        &self,
        mut gate: G,
        mut record: R,
        mut op: F,
    ) -> Result<T, X>
    where
        X: From<RetryError<E>>,
        G: FnMut(usize) -> Result<(), X>,
        R: FnMut(usize, &Result<T, E>, Duration),
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let mut attempt = 1;
        loop {
            gate(attempt)?;

            let started = Instant::now();
            let result = op().await;
            record(attempt, &result, started.elapsed());

            match result {
                Ok(value) => {
                    self.notify_success(attempt);
                    return Ok(value);
                }
                Err(error) => {
                    if !(self.config.retryable)(&error) {
                        self.notify_not_retryable(attempt);
                        return Err(RetryError::NotRetryable(error).into());
                    }
                    if attempt >= self.config.max_attempts {
                        self.notify_exhausted(attempt);
                        return Err(RetryError::Exhausted {
                            attempts: attempt,
                            source: error,
                        }
                        .into());
                    }

                    let delay = self.next_delay(attempt);
                    self.notify_retry(attempt, delay);
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }

    fn next_delay(&self, attempt: usize) -> Duration {
        let delay = self.config.interval_fn.next_interval(attempt);
        if self.config.jitter {
            backoff::apply_jitter(delay)
        } else {
            delay
        }
    }

    fn notify_retry(&self, attempt: usize, delay: Duration) {
        #[cfg(feature = "tracing")]
        tracing::debug!(
            name = %self.config.name,
            attempt,
            delay_ms = delay.as_millis() as u64,
            "retrying after backoff"
        );
        #[cfg(feature = "metrics")]
        metrics::counter!(
            "breakwater_retry_retries_total",
            "retry" => self.config.name.clone()
        )
        .increment(1);

        self.config.event_listeners.emit(&RetryEvent::Retry {
            key: self.config.name.clone(),
            timestamp: Instant::now(),
            attempt,
            delay,
        });
    }

    fn notify_success(&self, attempts: usize) {
        #[cfg(feature = "metrics")]
        metrics::counter!(
            "breakwater_retry_calls_total",
            "retry" => self.config.name.clone(),
            "outcome" => "success"
        )
        .increment(1);

        self.config.event_listeners.emit(&RetryEvent::Success {
            key: self.config.name.clone(),
            timestamp: Instant::now(),
            attempts,
        });
    }

    fn notify_exhausted(&self, attempts: usize) {
        #[cfg(feature = "tracing")]
        tracing::warn!(name = %self.config.name, attempts, "retries exhausted");
        #[cfg(feature = "metrics")]
        metrics::counter!(
            "breakwater_retry_calls_total",
            "retry" => self.config.name.clone(),
            "outcome" => "exhausted"
        )
        .increment(1);

        self.config.event_listeners.emit(&RetryEvent::Exhausted {
            key: self.config.name.clone(),
            timestamp: Instant::now(),
            attempts,
        });
    }

    fn notify_not_retryable(&self, attempt: usize) {
        #[cfg(feature = "metrics")]
        metrics::counter!(
            "breakwater_retry_calls_total",
            "retry" => self.config.name.clone(),
            "outcome" => "not_retryable"
        )
        .increment(1);

        self.config.event_listeners.emit(&RetryEvent::NotRetryable {
            key: self.config.name.clone(),
            timestamp: Instant::now(),
            attempt,
        });
    }
}

impl<E> Clone for RetryExecutor<E> {
    fn clone(&self) -> Self {
        Self {
            config: Arc::clone(&self.config),
        }
    }
}
