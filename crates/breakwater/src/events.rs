use std::time::{Duration, Instant};

use breakwater_circuitbreaker::CircuitState;
use breakwater_core::GuardEvent;

/// Events emitted by the composed stack.
///
/// These describe the pipeline's view of a call: a stage admitted or
/// rejected it, the key's circuit changed state, or another attempt was
/// scheduled. Each guard crate also emits its own finer-grained stream;
/// subscribe to a stage's config for those.
#[derive(Debug, Clone)]
pub enum StackEvent {
    /// A pipeline stage admitted the call.
    GuardAdmitted {
        key: String,
        timestamp: Instant,
        /// Stage name: `"ratelimiter"`, `"bulkhead"`, or `"circuitbreaker"`.
        stage: &'static str,
    },
    /// A pipeline stage rejected the call.
    GuardRejected {
        key: String,
        timestamp: Instant,
        stage: &'static str,
        /// Why the stage refused, e.g. `"rate_limit_exceeded"`, `"full"`,
        /// `"timeout"`, or `"open"`.
        reason: &'static str,
    },
    /// The key's circuit breaker moved from one state to another.
    CircuitStateChanged {
        key: String,
        timestamp: Instant,
        from_state: CircuitState,
        to_state: CircuitState,
    },
    /// The key's retry executor scheduled another attempt.
    RetryAttempted {
        key: String,
        timestamp: Instant,
        /// The attempt that just failed (numbered from 1).
        attempt: usize,
        /// Backoff delay before the next attempt.
        delay: Duration,
    },
}

impl GuardEvent for StackEvent {
    fn event_type(&self) -> &'static str {
        match self {
            StackEvent::GuardAdmitted { .. } => "guard_admitted",
            StackEvent::GuardRejected { .. } => "guard_rejected",
            StackEvent::CircuitStateChanged { .. } => "circuit_state_changed",
            StackEvent::RetryAttempted { .. } => "retry_attempted",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            StackEvent::GuardAdmitted { timestamp, .. }
            | StackEvent::GuardRejected { timestamp, .. }
            | StackEvent::CircuitStateChanged { timestamp, .. }
            | StackEvent::RetryAttempted { timestamp, .. } => *timestamp,
        }
    }

    fn key(&self) -> &str {
        match self {
            StackEvent::GuardAdmitted { key, .. }
            | StackEvent::GuardRejected { key, .. }
            | StackEvent::CircuitStateChanged { key, .. }
            | StackEvent::RetryAttempted { key, .. } => key,
        }
    }
}
