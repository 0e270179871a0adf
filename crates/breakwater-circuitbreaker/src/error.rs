use breakwater_core::ResilienceError;
use thiserror::Error;

/// Errors returned by the [`CircuitBreaker`](crate::CircuitBreaker) guard.
#[derive(Debug, Error)]
pub enum CircuitBreakerError<E> {
    /// The circuit is open; the call was not permitted.
    #[error("circuit breaker '{key}' is open; call not permitted")]
    Open {
        /// Name of the breaker (the guarded key, when registry-managed).
        key: String,
    },

    /// The operation itself failed.
    #[error("operation error: {0}")]
    Operation(E),
}

impl<E> CircuitBreakerError<E> {
    /// Returns `true` if the error indicates the circuit is open.
    pub fn is_open(&self) -> bool {
        matches!(self, CircuitBreakerError::Open { .. })
    }

    /// Returns the operation's own error if present.
    pub fn into_operation(self) -> Option<E> {
        match self {
            CircuitBreakerError::Operation(e) => Some(e),
            _ => None,
        }
    }
}

impl<E> From<CircuitBreakerError<E>> for ResilienceError<E> {
    fn from(err: CircuitBreakerError<E>) -> Self {
        match err {
            CircuitBreakerError::Open { key } => ResilienceError::CircuitOpen { key: Some(key) },
            CircuitBreakerError::Operation(e) => ResilienceError::Operation(e),
        }
    }
}
