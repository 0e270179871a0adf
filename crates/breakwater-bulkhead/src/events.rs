use std::time::{Duration, Instant};
use breakwater_core::GuardEvent;

/// Why the bulkhead turned a caller away.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RejectReason {
    /// All concurrency slots in use and no wait queue is configured
    /// (or the queue is full).
    Saturated,
    /// The bounded wait queue was already at capacity.
    QueueFull,
    /// The caller waited in the queue until `acquire_timeout` lapsed.
    WaitTimeout,
}

/// Events emitted by the bulkhead.
#[derive(Debug, Clone)]
pub enum BulkheadEvent {
    /// A concurrency slot was granted.
    CallPermitted {
        key: String,
        timestamp: Instant,
        /// In-flight executions after this grant.
        active: usize,
    },
    /// The caller was turned away.
    CallRejected {
        key: String,
        timestamp: Instant,
        /// In-flight executions at rejection time.
        active: usize,
        reason: RejectReason,
    },
    /// A previously granted slot was released.
    PermitReleased {
        key: String,
        timestamp: Instant,
        /// How long the slot was held.
        held: Duration,
        /// In-flight executions after the release.
        active: usize,
    },
}

impl GuardEvent for BulkheadEvent {
    fn event_type(&self) -> &'static str {
        match self {
            BulkheadEvent::CallPermitted { .. } => "call_permitted",
            BulkheadEvent::CallRejected { .. } => "call_rejected",
            BulkheadEvent::PermitReleased { .. } => "permit_released",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            BulkheadEvent::CallPermitted { timestamp, .. }
            | BulkheadEvent::CallRejected { timestamp, .. }
            | BulkheadEvent::PermitReleased { timestamp, .. } => *timestamp,
        }
    }

    fn key(&self) -> &str {
        match self {
            BulkheadEvent::CallPermitted { key, .. }
            | BulkheadEvent::CallRejected { key, .. }
            | BulkheadEvent::PermitReleased { key, .. } => key,
        }
    }
}
