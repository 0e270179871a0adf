use std::sync::Arc;
use std::time::Duration;

use breakwater_core::{EventListener, EventListeners, FnListener};

use crate::backoff::{ExponentialBackoff, FixedInterval, IntervalFunction};
use crate::events::RetryEvent;

/// Decides whether an operation error is worth another attempt.
pub(crate) type RetryPredicate<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Validated retry configuration.
///
/// A config is a reusable template: `RetryExecutor::new` consumes one for a
/// standalone executor, `RetryExecutor::for_key` stamps per-key executors out
/// of a shared template (cloning is cheap, listeners and the predicate are
/// shared).
///
/// # Type Parameters
///
/// - `E`: the error type of the retried operation
pub struct RetryConfig<E> {
    pub(crate) max_attempts: usize,
    pub(crate) interval_fn: Arc<dyn IntervalFunction>,
    pub(crate) jitter: bool,
    pub(crate) retryable: RetryPredicate<E>,
    pub(crate) event_listeners: EventListeners<RetryEvent>,
    pub(crate) name: String,
}

impl<E> RetryConfig<E> {
    /// Creates a new configuration builder.
    pub fn builder() -> RetryConfigBuilder<E> {
        RetryConfigBuilder::new()
    }

    /// Attaches an extra event listener to this config template.
    ///
    /// Executors already stamped from the template keep their existing
    /// listener set; executors materialized afterwards also emit to
    /// `listener`.
    pub fn subscribe<L>(&mut self, listener: L)
    where
        L: EventListener<RetryEvent> + 'static,
    {
        self.event_listeners.add(listener);
    }
}

impl<E> Clone for RetryConfig<E> {
    fn clone(&self) -> Self {
        Self {
            max_attempts: self.max_attempts,
            interval_fn: Arc::clone(&self.interval_fn),
            jitter: self.jitter,
            retryable: Arc::clone(&self.retryable),
            event_listeners: self.event_listeners.clone(),
            name: self.name.clone(),
        }
    }
}

/// Builder for [`RetryConfig`].
pub struct RetryConfigBuilder<E> {
    max_attempts: usize,
    interval_fn: Option<Arc<dyn IntervalFunction>>,
    jitter: bool,
    retryable: RetryPredicate<E>,
    event_listeners: EventListeners<RetryEvent>,
    name: String,
}

impl<E> RetryConfigBuilder<E> {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            max_attempts: 3,
            interval_fn: None,
            jitter: false,
            retryable: Arc::new(|_| true),
            event_listeners: EventListeners::new(),
            name: String::from("<unnamed>"),
        }
    }

    /// Sets the maximum number of attempts, including the initial one.
    ///
    /// Default: 3
    pub fn max_attempts(mut self, n: usize) -> Self {
        self.max_attempts = n;
        self
    }

    /// Waits the same fixed delay between attempts.
    pub fn fixed_backoff(mut self, interval: Duration) -> Self {
        self.interval_fn = Some(Arc::new(FixedInterval::new(interval)));
        self
    }

    /// Waits exponentially growing delays starting at `initial_delay`, with
    /// the default multiplier of 2.0 and no cap. Pass a hand-built
    /// [`ExponentialBackoff`] to [`backoff`](Self::backoff) to tune the
    /// multiplier or set `max_delay`.
    pub fn exponential_backoff(mut self, initial_delay: Duration) -> Self {
        self.interval_fn = Some(Arc::new(ExponentialBackoff::new(initial_delay)));
        self
    }

    /// Uses a custom backoff schedule.
    pub fn backoff<I>(mut self, interval_fn: I) -> Self
    where
        I: IntervalFunction + 'static,
    {
        self.interval_fn = Some(Arc::new(interval_fn));
        self
    }

    /// Perturbs every computed delay to a uniformly random value in
    /// `[delay/2, delay]`, spreading out the retries of callers that failed
    /// at the same moment.
    ///
    /// Default: off
    pub fn jitter(mut self, enabled: bool) -> Self {
        self.jitter = enabled;
        self
    }

    /// Retries only errors for which the predicate returns `true`; other
    /// errors propagate immediately.
    ///
    /// Default: every error is retried
    pub fn retry_on<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.retryable = Arc::new(predicate);
        self
    }

    /// Give this executor a human-readable name for observability.
    ///
    /// Default: `<unnamed>`
    pub fn name<N: Into<String>>(mut self, n: N) -> Self {
        self.name = n.into();
        self
    }

    /// Registers a callback before each backoff sleep.
    ///
    /// The callback receives the failed attempt number and the chosen delay.
    pub fn on_retry<F>(mut self, f: F) -> Self
    where
        F: Fn(usize, Duration) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &RetryEvent| {
                if let RetryEvent::Retry { attempt, delay, .. } = event {
                    f(*attempt, *delay);
                }
            }));
        self
    }

    /// Registers a callback on success.
    ///
    /// The callback receives the total attempts made, including the
    /// successful one.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &RetryEvent| {
                if let RetryEvent::Success { attempts, .. } = event {
                    f(*attempts);
                }
            }));
        self
    }

    /// Registers a callback when every permitted attempt has failed.
    ///
    /// The callback receives the total attempts made.
    pub fn on_exhausted<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &RetryEvent| {
                if let RetryEvent::Exhausted { attempts, .. } = event {
                    f(*attempts);
                }
            }));
        self
    }

    /// Registers a callback when an error is classified as not retryable.
    pub fn on_not_retryable<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &RetryEvent| {
                if matches!(event, RetryEvent::NotRetryable { .. }) {
                    f();
                }
            }));
        self
    }

    /// Builds the validated configuration.
    ///
    /// An unset backoff schedule defaults to [`ExponentialBackoff`] with a
    /// 100ms initial delay.
    ///
    /// # Panics
    ///
    /// Panics if `max_attempts` is zero.
    pub fn build(self) -> RetryConfig<E> {
        if self.max_attempts == 0 {
            panic!("max_attempts must be at least 1");
        }

        RetryConfig {
            max_attempts: self.max_attempts,
            interval_fn: self
                .interval_fn
                .unwrap_or_else(|| Arc::new(ExponentialBackoff::new(Duration::from_millis(100)))),
            jitter: self.jitter,
            retryable: self.retryable,
            event_listeners: self.event_listeners,
            name: self.name,
        }
    }
}

impl<E> Default for RetryConfigBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}
