use std::time::{Duration, Instant};

use breakwater_core::GuardEvent;

use crate::circuit::CircuitState;

/// Events emitted by the circuit breaker.
#[derive(Debug, Clone)]
pub enum CircuitBreakerEvent {
    /// The circuit moved from one state to another.
    StateTransition {
        key: String,
        timestamp: Instant,
        from_state: CircuitState,
        to_state: CircuitState,
    },
    /// A call was admitted through the circuit.
    CallPermitted {
        key: String,
        timestamp: Instant,
        /// State the circuit was in when the call was admitted.
        state: CircuitState,
    },
    /// A call was short-circuited without reaching the operation.
    CallRejected { key: String, timestamp: Instant },
    /// An admitted call completed and was counted as a success.
    SuccessRecorded {
        key: String,
        timestamp: Instant,
        /// State the circuit was in when the outcome was recorded.
        state: CircuitState,
        /// How long the call took.
        duration: Duration,
    },
    /// An admitted call completed and was counted as a failure.
    FailureRecorded {
        key: String,
        timestamp: Instant,
        /// State the circuit was in when the outcome was recorded.
        state: CircuitState,
        /// How long the call took.
        duration: Duration,
    },
}

impl GuardEvent for CircuitBreakerEvent {
    fn event_type(&self) -> &'static str {
        match self {
            CircuitBreakerEvent::StateTransition { .. } => "state_transition",
            CircuitBreakerEvent::CallPermitted { .. } => "call_permitted",
            CircuitBreakerEvent::CallRejected { .. } => "call_rejected",
            CircuitBreakerEvent::SuccessRecorded { .. } => "success_recorded",
            CircuitBreakerEvent::FailureRecorded { .. } => "failure_recorded",
        }
    }

    fn timestamp(&self) -> Instant {
        match self {
            CircuitBreakerEvent::StateTransition { timestamp, .. }
            | CircuitBreakerEvent::CallPermitted { timestamp, .. }
            | CircuitBreakerEvent::CallRejected { timestamp, .. }
            | CircuitBreakerEvent::SuccessRecorded { timestamp, .. }
            | CircuitBreakerEvent::FailureRecorded { timestamp, .. } => *timestamp,
        }
    }

    fn key(&self) -> &str {
        match self {
            CircuitBreakerEvent::StateTransition { key, .. }
            | CircuitBreakerEvent::CallPermitted { key, .. }
            | CircuitBreakerEvent::CallRejected { key, .. }
            | CircuitBreakerEvent::SuccessRecorded { key, .. }
            | CircuitBreakerEvent::FailureRecorded { key, .. } => key,
        }
    }
}
