//! Composable resilience guards for async Rust.
//!
//! `breakwater` wires four guards into one keyed pipeline. Every call names
//! the downstream dependency it is about to touch, and the stack runs it
//! through that key's guards in a fixed order:
//!
//! ```text
//! rate limiter → bulkhead → circuit breaker → retry → operation
//! ```
//!
//! Load shedding happens before capacity isolation, capacity isolation
//! before failure detection, and retries sit innermost so every attempt is
//! re-examined by the circuit breaker. Stages are optional per policy; an
//! empty policy admits everything.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::time::Duration;
//!
//! use breakwater::{
//!     CircuitBreakerConfig, GuardPolicy, RateLimiterConfig, ResilienceStack, RetryConfig,
//! };
//!
//! # async fn example() -> Result<(), breakwater::ResilienceError<std::io::Error>> {
//! let policy = GuardPolicy::builder()
//!     .rate_limiter(
//!         RateLimiterConfig::builder()
//!             .capacity(100.0)
//!             .refill_per_second(50.0)
//!             .build(),
//!     )
//!     .circuit_breaker(
//!         CircuitBreakerConfig::builder()
//!             .failure_rate_threshold(0.5)
//!             .open_timeout(Duration::from_secs(30))
//!             .build(),
//!     )
//!     .retry(
//!         RetryConfig::builder()
//!             .max_attempts(3)
//!             .exponential_backoff(Duration::from_millis(100))
//!             .jitter(true)
//!             .build(),
//!     )
//!     .build();
//!
//! let stack = ResilienceStack::new(policy);
//!
//! let payment = stack
//!     .call("payments")
//!     .timeout(Duration::from_secs(2))
//!     .run(|| async { fetch_payment().await })
//!     .await?;
//! # let _ = payment;
//! # Ok(())
//! # }
//! # async fn fetch_payment() -> Result<String, std::io::Error> { Ok(String::new()) }
//! ```
//!
//! # Keys and key classes
//!
//! Guards materialize lazily per key and keys never share state: an open
//! circuit for `"payments"` says nothing about `"inventory"`. Key classes
//! route families of keys (say, every per-tenant key) to a shared policy
//! template via [`ResilienceStackBuilder::key_classifier`], and
//! [`GuardRegistry::reset_key`] puts a single key back to a clean slate.
//!
//! # Errors
//!
//! Every call resolves to `Result<T, ResilienceError<E>>` where `E` is the
//! operation's own error type. Guard rejections, retry exhaustion, deadline
//! expiry, and plain operation failure are separate variants, so callers can
//! tell "the dependency is failing" apart from "the stack refused to try".
//!
//! # Feature flags
//!
//! - `tower`: a [`Layer`]/[`Service`] adapter running every request of a
//!   wrapped service through the stack under one key.
//! - `metrics`: Prometheus metrics in every guard.
//! - `tracing`: structured logs from the stack and every guard.
//! - `serde`: serialization for guard snapshots.
//!
//! [`Layer`]: https://docs.rs/tower/latest/tower/trait.Layer.html
//! [`Service`]: https://docs.rs/tower/latest/tower/trait.Service.html
//!
//! # Individual crates
//!
//! Each guard also ships standalone for minimal dependency trees:
//! `breakwater-ratelimiter`, `breakwater-bulkhead`,
//! `breakwater-circuitbreaker`, `breakwater-retry`, and `breakwater-core`
//! (shared error taxonomy and event plumbing). This crate re-exports their
//! public types.

pub mod events;
pub mod policy;
pub mod registry;
pub mod stack;

#[cfg(feature = "tower")]
pub mod layer;

pub use breakwater_core::{
    EventListener, EventListeners, FnListener, GuardEvent, ResilienceError, SharedEventListener,
};

pub use breakwater_bulkhead::{
    Bulkhead, BulkheadConfig, BulkheadError, BulkheadEvent, BulkheadPermit, BulkheadSnapshot,
};
pub use breakwater_circuitbreaker::{
    CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError, CircuitBreakerEvent, CircuitMetrics,
    CircuitState,
};
pub use breakwater_ratelimiter::{
    RateLimiter, RateLimiterConfig, RateLimiterError, RateLimiterEvent, RateLimiterSnapshot,
};
pub use breakwater_retry::{
    ExponentialBackoff, FixedInterval, FnInterval, IntervalFunction, RetryConfig, RetryError,
    RetryEvent, RetryExecutor,
};

pub use events::StackEvent;
pub use policy::{GuardPolicy, GuardPolicyBuilder};
pub use registry::{GuardRegistry, KeyClassifier, KeyGuards};
pub use stack::{ResilienceStack, ResilienceStackBuilder, StackCall, StackCallWithFallback};

#[cfg(feature = "tower")]
pub use layer::{ResilienceLayer, ResilienceService};
