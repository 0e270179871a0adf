use std::sync::Arc;
use std::time::Duration;

use breakwater_core::{EventListener, EventListeners, FnListener};

use crate::circuit::CircuitState;
use crate::events::CircuitBreakerEvent;

/// Decides whether an operation error counts as a failure.
pub(crate) type SharedClassifier<E> = Arc<dyn Fn(&E) -> bool + Send + Sync>;

/// Validated circuit breaker configuration.
///
/// A config is a reusable template: `CircuitBreaker::new` consumes one for a
/// standalone breaker, `CircuitBreaker::for_key` stamps per-key breakers out
/// of a shared template (cloning is cheap, listeners and the classifier are
/// shared).
///
/// # Type Parameters
///
/// - `E`: the error type of the guarded operation
pub struct CircuitBreakerConfig<E> {
    pub(crate) failure_count_threshold: u32,
    pub(crate) minimum_requests_threshold: u32,
    pub(crate) failure_rate_threshold: f64,
    pub(crate) open_timeout: Duration,
    pub(crate) success_threshold: u32,
    pub(crate) failure_classifier: SharedClassifier<E>,
    pub(crate) event_listeners: EventListeners<CircuitBreakerEvent>,
    pub(crate) name: String,
}

impl<E> CircuitBreakerConfig<E> {
    /// Creates a new configuration builder.
    pub fn builder() -> CircuitBreakerConfigBuilder<E> {
        CircuitBreakerConfigBuilder::new()
    }

    /// Attaches an extra event listener to this config template.
    ///
    /// Breakers already stamped from the template keep their existing
    /// listener set; breakers materialized afterwards also emit to
    /// `listener`.
    pub fn subscribe<L>(&mut self, listener: L)
    where
        L: EventListener<CircuitBreakerEvent> + 'static,
    {
        self.event_listeners.add(listener);
    }
}

impl<E> Clone for CircuitBreakerConfig<E> {
    fn clone(&self) -> Self {
        Self {
            failure_count_threshold: self.failure_count_threshold,
            minimum_requests_threshold: self.minimum_requests_threshold,
            failure_rate_threshold: self.failure_rate_threshold,
            open_timeout: self.open_timeout,
            success_threshold: self.success_threshold,
            failure_classifier: Arc::clone(&self.failure_classifier),
            event_listeners: self.event_listeners.clone(),
            name: self.name.clone(),
        }
    }
}

/// Builder for [`CircuitBreakerConfig`].
pub struct CircuitBreakerConfigBuilder<E> {
    failure_count_threshold: u32,
    minimum_requests_threshold: u32,
    failure_rate_threshold: f64,
    open_timeout: Duration,
    success_threshold: u32,
    failure_classifier: SharedClassifier<E>,
    event_listeners: EventListeners<CircuitBreakerEvent>,
    name: String,
}

impl<E> CircuitBreakerConfigBuilder<E> {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            failure_count_threshold: 5,
            minimum_requests_threshold: 10,
            failure_rate_threshold: 0.5,
            open_timeout: Duration::from_secs(30),
            success_threshold: 1,
            failure_classifier: Arc::new(|_| true),
            event_listeners: EventListeners::new(),
            name: String::from("<unnamed>"),
        }
    }

    /// Sets the absolute number of window failures that opens the circuit.
    ///
    /// Default: 5
    pub fn failure_count_threshold(mut self, n: u32) -> Self {
        self.failure_count_threshold = n;
        self
    }

    /// Sets the number of recorded calls required before either threshold is
    /// evaluated.
    ///
    /// Default: 10
    pub fn minimum_requests_threshold(mut self, n: u32) -> Self {
        self.minimum_requests_threshold = n;
        self
    }

    /// Sets the window failure rate that opens the circuit. Either this or
    /// the absolute count opens it; both wait for the minimum request count.
    ///
    /// Default: 0.5 (50%)
    pub fn failure_rate_threshold(mut self, rate: f64) -> Self {
        self.failure_rate_threshold = rate;
        self
    }

    /// Sets how long the circuit stays open after the most recent failure
    /// before a probe is admitted.
    ///
    /// Default: 30 seconds
    pub fn open_timeout(mut self, timeout: Duration) -> Self {
        self.open_timeout = timeout;
        self
    }

    /// Sets the number of consecutive probe successes required to close a
    /// half-open circuit. Also caps how many probes are admitted at once.
    ///
    /// Default: 1
    pub fn success_threshold(mut self, n: u32) -> Self {
        self.success_threshold = n;
        self
    }

    /// Sets a custom failure classifier.
    ///
    /// Operation errors for which the classifier returns `false` are counted
    /// as successes.
    ///
    /// Default: every error is a failure
    pub fn failure_classifier<F>(mut self, classifier: F) -> Self
    where
        F: Fn(&E) -> bool + Send + Sync + 'static,
    {
        self.failure_classifier = Arc::new(classifier);
        self
    }

    /// Give this breaker a human-readable name for observability.
    ///
    /// Default: `<unnamed>`
    pub fn name<N: Into<String>>(mut self, n: N) -> Self {
        self.name = n.into();
        self
    }

    /// Registers a callback when the circuit transitions between states.
    ///
    /// The callback receives the state transitioned from and the state
    /// transitioned to.
    pub fn on_state_transition<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState, CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::StateTransition {
                    from_state,
                    to_state,
                    ..
                } = event
                {
                    f(*from_state, *to_state);
                }
            }));
        self
    }

    /// Registers a callback when a call is admitted through the circuit.
    ///
    /// The callback receives the state the circuit was in.
    pub fn on_call_permitted<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::CallPermitted { state, .. } = event {
                    f(*state);
                }
            }));
        self
    }

    /// Registers a callback when a call is short-circuited.
    pub fn on_call_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if matches!(event, CircuitBreakerEvent::CallRejected { .. }) {
                    f();
                }
            }));
        self
    }

    /// Registers a callback when a success is recorded.
    ///
    /// The callback receives the state the circuit was in when the outcome
    /// was recorded.
    pub fn on_success<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::SuccessRecorded { state, .. } = event {
                    f(*state);
                }
            }));
        self
    }

    /// Registers a callback when a failure is recorded.
    ///
    /// The callback receives the state the circuit was in when the outcome
    /// was recorded.
    pub fn on_failure<F>(mut self, f: F) -> Self
    where
        F: Fn(CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &CircuitBreakerEvent| {
                if let CircuitBreakerEvent::FailureRecorded { state, .. } = event {
                    f(*state);
                }
            }));
        self
    }

    /// Builds the validated configuration.
    ///
    /// # Panics
    ///
    /// Panics if `failure_count_threshold`, `minimum_requests_threshold`, or
    /// `success_threshold` is zero, or if `failure_rate_threshold` is outside
    /// `(0, 1]`.
    pub fn build(self) -> CircuitBreakerConfig<E> {
        if self.failure_count_threshold == 0 {
            panic!("failure_count_threshold must be at least 1");
        }
        if self.minimum_requests_threshold == 0 {
            panic!("minimum_requests_threshold must be at least 1");
        }
        if !self.failure_rate_threshold.is_finite()
            || self.failure_rate_threshold <= 0.0
            || self.failure_rate_threshold > 1.0
        {
            panic!("failure_rate_threshold must be a finite value in (0, 1]");
        }
        if self.success_threshold == 0 {
            panic!("success_threshold must be at least 1");
        }

        CircuitBreakerConfig {
            failure_count_threshold: self.failure_count_threshold,
            minimum_requests_threshold: self.minimum_requests_threshold,
            failure_rate_threshold: self.failure_rate_threshold,
            open_timeout: self.open_timeout,
            success_threshold: self.success_threshold,
            failure_classifier: self.failure_classifier,
            event_listeners: self.event_listeners,
            name: self.name,
        }
    }
}

impl<E> Default for CircuitBreakerConfigBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}
