use std::fmt;
use std::time::Duration;
use breakwater_core::ResilienceError;

/// Errors that can occur when using the rate limiter.
#[derive(Debug, Clone)]
pub enum RateLimiterError {
    /// No token was available for this call.
    RateLimitExceeded {
        /// Estimated wait until one token accrues.
        retry_after: Duration,
    },
}

impl RateLimiterError {
    /// Estimated wait until a token would be available.
    pub fn retry_after(&self) -> Duration {
        match self {
            RateLimiterError::RateLimitExceeded { retry_after } => *retry_after,
        }
    }
}

impl fmt::Display for RateLimiterError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RateLimiterError::RateLimitExceeded { retry_after } => {
                write!(f, "rate limit exceeded, retry after {:?}", retry_after)
            }
        }
    }
}

impl std::error::Error for RateLimiterError {}

impl<E> From<RateLimiterError> for ResilienceError<E> {
    fn from(err: RateLimiterError) -> Self {
        match err {
            RateLimiterError::RateLimitExceeded { retry_after } => {
                ResilienceError::RateLimitExceeded {
                    retry_after: Some(retry_after),
                }
            }
        }
    }
}
