use std::time::Duration;

use breakwater_core::{EventListener, EventListeners, FnListener};

use crate::events::RateLimiterEvent;

/// Validated rate limiter configuration.
///
/// A config is a reusable template: `RateLimiter::new` consumes one for a
/// standalone limiter, `RateLimiter::for_key` stamps per-key limiters out of
/// a shared template (cloning is cheap, listeners are shared).
#[derive(Clone)]
pub struct RateLimiterConfig {
    pub(crate) capacity: f64,
    pub(crate) refill_per_second: f64,
    pub(crate) name: String,
    pub(crate) event_listeners: EventListeners<RateLimiterEvent>,
}

impl RateLimiterConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> RateLimiterConfigBuilder {
        RateLimiterConfigBuilder::new()
    }

    /// Attaches an extra event listener to this config template.
    ///
    /// Limiters already stamped from the template keep their existing
    /// listener set; limiters materialized afterwards also emit to
    /// `listener`.
    pub fn subscribe<L>(&mut self, listener: L)
    where
        L: EventListener<RateLimiterEvent> + 'static,
    {
        self.event_listeners.add(listener);
    }
}

/// Builder for [`RateLimiterConfig`].
#[derive(Clone)]
pub struct RateLimiterConfigBuilder {
    capacity: f64,
    refill_per_second: f64,
    name: String,
    event_listeners: EventListeners<RateLimiterEvent>,
}

impl RateLimiterConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            capacity: 50.0,
            refill_per_second: 50.0,
            name: String::from("<unnamed>"),
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets the maximum number of tokens the bucket holds.
    ///
    /// Default: 50
    pub fn capacity(mut self, capacity: f64) -> Self {
        self.capacity = capacity;
        self
    }

    /// Sets the continuous refill rate in tokens per second.
    ///
    /// Default: 50
    pub fn refill_per_second(mut self, rate: f64) -> Self {
        self.refill_per_second = rate;
        self
    }

    /// Give this limiter a human-readable name for observability.
    ///
    /// Default: `<unnamed>`
    pub fn name<N: Into<String>>(mut self, n: N) -> Self {
        self.name = n.into();
        self
    }

    /// Registers a callback when a call is admitted.
    ///
    /// The callback receives the number of tokens remaining after the
    /// admission.
    pub fn on_token_acquired<F>(mut self, f: F) -> Self
    where
        F: Fn(f64) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &RateLimiterEvent| {
                if let RateLimiterEvent::TokenAcquired {
                    tokens_remaining, ..
                } = event
                {
                    f(*tokens_remaining);
                }
            }));
        self
    }

    /// Registers a callback when a call is rejected.
    ///
    /// The callback receives the estimated wait until one token accrues.
    pub fn on_call_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners
            .add(FnListener::new(move |event: &RateLimiterEvent| {
                if let RateLimiterEvent::CallRejected { retry_after, .. } = event {
                    f(*retry_after);
                }
            }));
        self
    }

    /// Builds the validated configuration.
    ///
    /// # Panics
    ///
    /// Panics if `capacity` is below 1 or `refill_per_second` is not a
    /// positive finite number.
    pub fn build(self) -> RateLimiterConfig {
        if !self.capacity.is_finite() || self.capacity < 1.0 {
            panic!("capacity must be a finite value >= 1");
        }
        if !self.refill_per_second.is_finite() || self.refill_per_second <= 0.0 {
            panic!("refill_per_second must be a finite value > 0");
        }

        RateLimiterConfig {
            capacity: self.capacity,
            refill_per_second: self.refill_per_second,
            name: self.name,
            event_listeners: self.event_listeners,
        }
    }
}

impl Default for RateLimiterConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
