//! Unified error taxonomy for composed guards.
//!
//! [`ResilienceError`] is the single error type callers see from a composed
//! stack. Every guard rejection maps onto one closed variant, so callers can
//! branch on kind instead of downcasting through layer-specific types:
//!
//! ```rust
//! use breakwater_core::ResilienceError;
//!
//! #[derive(Debug)]
//! enum AppError {
//!     Unavailable,
//! }
//!
//! fn handle(err: ResilienceError<AppError>) {
//!     if err.is_circuit_open() {
//!         // serve cached data
//!     } else if let Some(app) = err.operation_error() {
//!         // inspect the dependency's own failure
//!         let _ = app;
//!     }
//! }
//! ```
//!
//! Individual guard crates define their own small error enums and provide
//! `From` conversions into this type, so a composed stack never leaks an
//! unclassified error from its own logic.

use std::fmt;
use std::time::Duration;

/// Unified error returned by a composed resilience stack.
///
/// # Type Parameters
///
/// - `E`: the error type of the guarded operation
#[derive(Debug, Clone)]
pub enum ResilienceError<E> {
    /// The rate limiter had no token available; the call was never started.
    RateLimitExceeded {
        /// Estimated wait until one token accrues, if the limiter can tell.
        retry_after: Option<Duration>,
    },

    /// The bulkhead was at capacity (and its wait queue, if any, was
    /// unavailable or timed out).
    BulkheadFull {
        /// In-flight executions at rejection time.
        active: usize,
        /// Configured concurrency limit.
        limit: usize,
    },

    /// The circuit breaker is open; the call was short-circuited.
    CircuitOpen {
        /// Key of the guarded dependency, if known.
        key: Option<String>,
    },

    /// Every permitted attempt failed with a retryable error.
    RetriesExhausted {
        /// Number of attempts actually made.
        attempts: usize,
        /// The error from the final attempt.
        source: E,
    },

    /// The caller-supplied deadline fired before the call finished.
    DeadlineExceeded {
        /// Pipeline stage that was executing when the deadline fired
        /// (e.g. "bulkhead", "retry").
        stage: &'static str,
    },

    /// The operation failed with a non-retryable error; passed through
    /// unmodified.
    Operation(E),
}

impl<E> fmt::Display for ResilienceError<E>
where
    E: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResilienceError::RateLimitExceeded { retry_after } => match retry_after {
                Some(d) => write!(f, "rate limit exceeded, retry after {:?}", d),
                None => write!(f, "rate limit exceeded"),
            },
            ResilienceError::BulkheadFull { active, limit } => {
                write!(f, "bulkhead full ({}/{})", active, limit)
            }
            ResilienceError::CircuitOpen { key } => match key {
                Some(k) => write!(f, "circuit breaker '{}' is open", k),
                None => write!(f, "circuit breaker is open"),
            },
            ResilienceError::RetriesExhausted { attempts, source } => {
                write!(f, "retries exhausted after {} attempts: {}", attempts, source)
            }
            ResilienceError::DeadlineExceeded { stage } => {
                write!(f, "deadline exceeded in {}", stage)
            }
            ResilienceError::Operation(e) => write!(f, "operation error: {}", e),
        }
    }
}

impl<E> std::error::Error for ResilienceError<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResilienceError::RetriesExhausted { source, .. } => Some(source),
            ResilienceError::Operation(e) => Some(e),
            _ => None,
        }
    }
}

impl<E> ResilienceError<E> {
    /// Returns `true` if this is a rate limiter rejection.
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ResilienceError::RateLimitExceeded { .. })
    }

    /// Returns `true` if this is a bulkhead rejection.
    pub fn is_bulkhead_full(&self) -> bool {
        matches!(self, ResilienceError::BulkheadFull { .. })
    }

    /// Returns `true` if this is a circuit breaker rejection.
    pub fn is_circuit_open(&self) -> bool {
        matches!(self, ResilienceError::CircuitOpen { .. })
    }

    /// Returns `true` if retry attempts were exhausted.
    pub fn is_retries_exhausted(&self) -> bool {
        matches!(self, ResilienceError::RetriesExhausted { .. })
    }

    /// Returns `true` if the caller's deadline fired.
    pub fn is_deadline_exceeded(&self) -> bool {
        matches!(self, ResilienceError::DeadlineExceeded { .. })
    }

    /// Returns `true` if this wraps a non-retryable operation error.
    pub fn is_operation(&self) -> bool {
        matches!(self, ResilienceError::Operation(_))
    }

    /// Returns `true` for any guard-level rejection or retry exhaustion —
    /// the kinds a fallback is allowed to consume.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            ResilienceError::RateLimitExceeded { .. }
                | ResilienceError::BulkheadFull { .. }
                | ResilienceError::CircuitOpen { .. }
                | ResilienceError::RetriesExhausted { .. }
        )
    }

    /// Extracts the operation's own error, whether it was passed through
    /// directly or wrapped by retry exhaustion.
    pub fn operation_error(self) -> Option<E> {
        match self {
            ResilienceError::Operation(e) => Some(e),
            ResilienceError::RetriesExhausted { source, .. } => Some(source),
            _ => None,
        }
    }

    /// Maps the operation error type, preserving every other variant.
    ///
    /// # Examples
    ///
    /// ```
    /// use breakwater_core::ResilienceError;
    ///
    /// let err: ResilienceError<String> = ResilienceError::Operation("boom".to_string());
    /// let mapped: ResilienceError<usize> = err.map_operation(|s| s.len());
    /// assert_eq!(mapped.operation_error(), Some(4));
    /// ```
    pub fn map_operation<F, T>(self, f: F) -> ResilienceError<T>
    where
        F: FnOnce(E) -> T,
    {
        match self {
            ResilienceError::RateLimitExceeded { retry_after } => {
                ResilienceError::RateLimitExceeded { retry_after }
            }
            ResilienceError::BulkheadFull { active, limit } => {
                ResilienceError::BulkheadFull { active, limit }
            }
            ResilienceError::CircuitOpen { key } => ResilienceError::CircuitOpen { key },
            ResilienceError::RetriesExhausted { attempts, source } => {
                ResilienceError::RetriesExhausted {
                    attempts,
                    source: f(source),
                }
            }
            ResilienceError::DeadlineExceeded { stage } => {
                ResilienceError::DeadlineExceeded { stage }
            }
            ResilienceError::Operation(e) => ResilienceError::Operation(f(e)),
        }
    }
}
