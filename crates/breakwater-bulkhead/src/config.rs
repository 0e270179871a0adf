//! Configuration for the bulkhead guard.

use crate::events::{BulkheadEvent, RejectReason};
use std::time::Duration;
use breakwater_core::{EventListener, EventListeners, FnListener};

/// Validated bulkhead configuration.
///
/// A config is a reusable template: `Bulkhead::new` consumes one for a
/// standalone guard, `Bulkhead::for_key` stamps per-key guards out of a
/// shared template.
#[derive(Clone)]
pub struct BulkheadConfig {
    /// Maximum number of concurrent executions.
    pub(crate) max_concurrency: usize,
    /// Bounded wait queue for callers willing to wait, if any.
    pub(crate) queue_capacity: Option<usize>,
    /// Maximum time a queued caller waits for a slot.
    pub(crate) acquire_timeout: Option<Duration>,
    /// Name of this bulkhead instance.
    pub(crate) name: String,
    /// Event listeners.
    pub(crate) event_listeners: EventListeners<BulkheadEvent>,
}

impl BulkheadConfig {
    /// Creates a new configuration builder.
    pub fn builder() -> BulkheadConfigBuilder {
        BulkheadConfigBuilder::new()
    }

    /// Attaches an extra event listener to this config template.
    ///
    /// Bulkheads already stamped from the template keep their existing
    /// listener set; bulkheads materialized afterwards also emit to
    /// `listener`.
    pub fn subscribe<L>(&mut self, listener: L)
    where
        L: EventListener<BulkheadEvent> + 'static,
    {
        self.event_listeners.add(listener);
    }
}

/// Builder for bulkhead configuration.
#[derive(Clone)]
pub struct BulkheadConfigBuilder {
    max_concurrency: usize,
    queue_capacity: Option<usize>,
    acquire_timeout: Option<Duration>,
    name: String,
    event_listeners: EventListeners<BulkheadEvent>,
}

impl BulkheadConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self {
            max_concurrency: 25,
            queue_capacity: None,
            acquire_timeout: None,
            name: "bulkhead".to_string(),
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets the maximum number of concurrent executions.
    ///
    /// Default: 25
    pub fn max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max;
        self
    }

    /// Allows up to `capacity` callers to wait for a slot instead of being
    /// rejected immediately.
    ///
    /// Default: no queue (immediate accept/reject)
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = Some(capacity);
        self
    }

    /// Bounds how long a queued caller waits for a slot. Only meaningful
    /// together with [`queue_capacity`](Self::queue_capacity).
    ///
    /// Default: wait indefinitely
    pub fn acquire_timeout(mut self, timeout: Duration) -> Self {
        self.acquire_timeout = Some(timeout);
        self
    }

    /// Sets the name of this bulkhead instance.
    ///
    /// Default: "bulkhead"
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Registers a callback when a call acquires a slot.
    ///
    /// The callback receives the number of in-flight executions after the
    /// grant, between 1 and `max_concurrency` inclusive.
    pub fn on_call_permitted<F>(mut self, f: F) -> Self
    where
        F: Fn(usize) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let BulkheadEvent::CallPermitted { active, .. } = event {
                f(*active);
            }
        }));
        self
    }

    /// Registers a callback when a call is turned away.
    ///
    /// The callback receives the rejection reason: saturated, queue full,
    /// or wait timeout.
    pub fn on_call_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn(RejectReason) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let BulkheadEvent::CallRejected { reason, .. } = event {
                f(*reason);
            }
        }));
        self
    }

    /// Registers a callback when a slot is released.
    ///
    /// The callback receives how long the slot was held.
    pub fn on_permit_released<F>(mut self, f: F) -> Self
    where
        F: Fn(Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event| {
            if let BulkheadEvent::PermitReleased { held, .. } = event {
                f(*held);
            }
        }));
        self
    }

    /// Builds the validated configuration.
    ///
    /// # Panics
    ///
    /// Panics if `max_concurrency` is zero, if a configured queue capacity
    /// is zero, or if `acquire_timeout` is set without a queue.
    pub fn build(self) -> BulkheadConfig {
        if self.max_concurrency == 0 {
            panic!("max_concurrency must be at least 1");
        }
        if let Some(capacity) = self.queue_capacity {
            if capacity == 0 {
                panic!("queue_capacity must be at least 1 when set");
            }
        }
        if self.acquire_timeout.is_some() && self.queue_capacity.is_none() {
            panic!("acquire_timeout requires queue_capacity to be set");
        }

        BulkheadConfig {
            max_concurrency: self.max_concurrency,
            queue_capacity: self.queue_capacity,
            acquire_timeout: self.acquire_timeout,
            name: self.name,
            event_listeners: self.event_listeners,
        }
    }
}

impl Default for BulkheadConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
