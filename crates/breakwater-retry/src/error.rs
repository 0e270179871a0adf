use std::fmt;

use breakwater_core::ResilienceError;

/// Errors returned by the [`RetryExecutor`](crate::RetryExecutor) guard.
///
/// The operation's own error type is carried through, so the impls here are
/// written by hand the way [`ResilienceError`] writes them: `Display` needs
/// `E: Display`, `Error::source` needs `E: Error + 'static`, and nothing
/// forces either bound on construction.
#[derive(Debug, Clone)]
pub enum RetryError<E> {
    /// Every permitted attempt failed.
    Exhausted {
        /// Number of attempts actually made.
        attempts: usize,
        /// The error from the final attempt.
        source: E,
    },

    /// The retryable predicate rejected the error; no further attempts were
    /// made.
    NotRetryable(E),
}

impl<E> RetryError<E> {
    /// Returns `true` if every permitted attempt failed.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, RetryError::Exhausted { .. })
    }

    /// Returns the underlying operation error.
    pub fn into_source(self) -> E {
        match self {
            RetryError::Exhausted { source, .. } => source,
            RetryError::NotRetryable(e) => e,
        }
    }
}

impl<E> fmt::Display for RetryError<E>
where
    E: fmt::Display,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryError::Exhausted { attempts, source } => {
                write!(f, "retries exhausted after {} attempts: {}", attempts, source)
            }
            RetryError::NotRetryable(e) => write!(f, "error is not retryable: {}", e),
        }
    }
}

impl<E> std::error::Error for RetryError<E>
where
    E: std::error::Error + 'static,
{
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RetryError::Exhausted { source, .. } => Some(source),
            RetryError::NotRetryable(e) => Some(e),
        }
    }
}

impl<E> From<RetryError<E>> for ResilienceError<E> {
    fn from(err: RetryError<E>) -> Self {
        match err {
            RetryError::Exhausted { attempts, source } => {
                ResilienceError::RetriesExhausted { attempts, source }
            }
            RetryError::NotRetryable(e) => ResilienceError::Operation(e),
        }
    }
}
