//! Token-bucket rate limiting guard.
//!
//! A [`RateLimiter`] admits or rejects a call attempt before any other
//! resource is committed. Tokens refill continuously at a configured rate up
//! to a capacity; each admitted call consumes one token. The decision is
//! non-blocking: a caller that cannot be admitted is told immediately, with
//! an estimate of when a token will be available.
//!
//! # Example
//!
//! ```rust
//! use breakwater_ratelimiter::{RateLimiter, RateLimiterConfig};
//!
//! // 10-call burst, sustained 1 call/sec.
//! let limiter = RateLimiter::new(
//!     RateLimiterConfig::builder()
//!         .capacity(10.0)
//!         .refill_per_second(1.0)
//!         .name("payments-api")
//!         .build(),
//! );
//!
//! match limiter.try_acquire() {
//!     Ok(()) => { /* proceed with the call */ }
//!     Err(e) => {
//!         // rejected; e.retry_after() estimates the wait
//!         let _ = e.retry_after();
//!     }
//! }
//! ```
//!
//! # Behavior
//!
//! - Refill is computed lazily on each decision from the elapsed time since
//!   the last refill, capped at `capacity`; there is no background task.
//! - Rejection has no side effect beyond bookkeeping — no token is consumed
//!   and no state is perturbed.
//! - [`RateLimiter::reset`] refills the bucket to capacity; an operational
//!   recovery hook, not part of the normal call path.
//!
//! # Observability
//!
//! Admissions, rejections, and resets are emitted as
//! [`RateLimiterEvent`]s to listeners registered on the config builder
//! (`on_token_acquired`, `on_call_rejected`). With the `metrics` feature,
//! admission/rejection counters and a token gauge are recorded per limiter
//! name.

pub mod config;
pub mod error;
pub mod events;
mod limiter;

pub use config::{RateLimiterConfig, RateLimiterConfigBuilder};
pub use error::RateLimiterError;
pub use events::RateLimiterEvent;
pub use limiter::{RateLimiter, RateLimiterSnapshot};
