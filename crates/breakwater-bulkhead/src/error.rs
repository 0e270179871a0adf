//! Error types for the bulkhead guard.

use breakwater_core::ResilienceError;

/// Errors that can occur when acquiring a bulkhead slot.
#[derive(Debug, Clone, thiserror::Error)]
pub enum BulkheadError {
    /// No concurrency slot (and no queue slot) was available.
    #[error("bulkhead is full ({active}/{limit} in flight)")]
    Full {
        /// In-flight executions at rejection time.
        active: usize,
        /// Configured concurrency limit.
        limit: usize,
    },
    /// The caller queued but `acquire_timeout` lapsed before a slot freed.
    #[error("timed out waiting for a bulkhead slot (limit {limit})")]
    Timeout {
        /// Configured concurrency limit.
        limit: usize,
    },
}

/// Result type for bulkhead operations.
pub type Result<T> = std::result::Result<T, BulkheadError>;

// A lapsed queue wait surfaces as the bulkhead-full kind in the unified
// taxonomy; the bulkhead's own events distinguish the reason.
impl<E> From<BulkheadError> for ResilienceError<E> {
    fn from(err: BulkheadError) -> Self {
        match err {
            BulkheadError::Full { active, limit } => ResilienceError::BulkheadFull { active, limit },
            BulkheadError::Timeout { limit } => ResilienceError::BulkheadFull {
                active: limit,
                limit,
            },
        }
    }
}
