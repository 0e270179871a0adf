use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};

use crate::config::CircuitBreakerConfig;

/// State of the circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[repr(u8)]
pub enum CircuitState {
    /// Calls pass through and outcomes are counted.
    Closed = 0,
    /// Calls are short-circuited without reaching the operation.
    Open = 1,
    /// A limited number of probe calls are admitted to test recovery.
    HalfOpen = 2,
}

impl CircuitState {
    pub(crate) fn from_u8(value: u8) -> Self {
        match value {
            1 => CircuitState::Open,
            2 => CircuitState::HalfOpen,
            _ => CircuitState::Closed,
        }
    }

    pub(crate) fn as_str(&self) -> &'static str {
        match self {
            CircuitState::Closed => "closed",
            CircuitState::Open => "open",
            CircuitState::HalfOpen => "half_open",
        }
    }
}

/// Point-in-time view of the circuit's counters and state.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct CircuitMetrics {
    /// Current state of the circuit.
    pub state: CircuitState,
    /// Calls recorded in the current observation window.
    pub request_count: u32,
    /// Failures recorded in the current observation window.
    pub failure_count: u32,
    /// Probe successes while half-open.
    pub success_count: u32,
    /// `failure_count / request_count`, or 0.0 for an empty window.
    pub failure_rate: f64,
    /// Time since the last state transition.
    pub time_since_state_change: Duration,
}

/// A completed state transition, reported to the owning guard so it can
/// notify listeners outside the state lock.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Transition {
    pub(crate) from: CircuitState,
    pub(crate) to: CircuitState,
}

/// Pure state machine behind [`CircuitBreaker`](crate::CircuitBreaker).
///
/// Holds only counters and timestamps; the owning guard supplies the clock
/// and emits events/metrics from the returned [`Transition`]s. The window is
/// a fixed counting window: counters accumulate until a transition (or an
/// administrative reset) zeroes them.
pub(crate) struct Circuit {
    state: CircuitState,
    state_atomic: Arc<AtomicU8>,
    last_state_change: Instant,
    request_count: u32,
    failure_count: u32,
    /// Probe successes while half-open; unused in other states.
    success_count: u32,
    last_failure_at: Option<Instant>,
}

impl Circuit {
    #[cfg(test)]
    pub(crate) fn new() -> Self {
        Self::new_with_atomic(Arc::new(AtomicU8::new(CircuitState::Closed as u8)))
    }

    pub(crate) fn new_with_atomic(state_atomic: Arc<AtomicU8>) -> Self {
        Self {
            state: CircuitState::Closed,
            state_atomic,
            last_state_change: Instant::now(),
            request_count: 0,
            failure_count: 0,
            success_count: 0,
            last_failure_at: None,
        }
    }

    pub(crate) fn state(&self) -> CircuitState {
        self.state
    }

    pub(crate) fn metrics(&self) -> CircuitMetrics {
        let failure_rate = if self.request_count > 0 {
            f64::from(self.failure_count) / f64::from(self.request_count)
        } else {
            0.0
        };
        CircuitMetrics {
            state: self.state,
            request_count: self.request_count,
            failure_count: self.failure_count,
            success_count: self.success_count,
            failure_rate,
            time_since_state_change: self.last_state_change.elapsed(),
        }
    }

    /// Decides whether a call may proceed at `now`.
    ///
    /// An open circuit flips to half-open once `open_timeout` has elapsed
    /// since the most recent failure, and the call that observed the lapse is
    /// admitted as the first probe.
    pub(crate) fn try_acquire(
        &mut self,
        config: &CircuitBreakerConfig<impl Sized>,
        now: Instant,
    ) -> (bool, Option<Transition>) {
        match self.state {
            CircuitState::Closed => (true, None),
            CircuitState::Open => {
                let timeout_elapsed = self
                    .last_failure_at
                    .map_or(true, |at| now.duration_since(at) > config.open_timeout);
                if timeout_elapsed {
                    let transition = self.transition_to(CircuitState::HalfOpen, now);
                    (true, transition)
                } else {
                    (false, None)
                }
            }
            CircuitState::HalfOpen => {
                // Completed-probe accounting: outcomes recorded since the
                // transition, not probes currently in flight.
                let completed = self.success_count + self.failure_count;
                (completed < config.success_threshold, None)
            }
        }
    }

    pub(crate) fn record_success(
        &mut self,
        config: &CircuitBreakerConfig<impl Sized>,
        now: Instant,
    ) -> Option<Transition> {
        // Saturate rather than wrap on very long-lived closed windows.
        self.request_count = self.request_count.saturating_add(1);
        match self.state {
            CircuitState::HalfOpen => {
                self.success_count = self.success_count.saturating_add(1);
                if self.success_count >= config.success_threshold {
                    self.transition_to(CircuitState::Closed, now)
                } else {
                    None
                }
            }
            _ => self.evaluate(config, now),
        }
    }

    pub(crate) fn record_failure(
        &mut self,
        config: &CircuitBreakerConfig<impl Sized>,
        now: Instant,
    ) -> Option<Transition> {
        self.request_count = self.request_count.saturating_add(1);
        self.failure_count = self.failure_count.saturating_add(1);
        self.last_failure_at = Some(now);
        match self.state {
            CircuitState::HalfOpen => self.transition_to(CircuitState::Open, now),
            _ => self.evaluate(config, now),
        }
    }

    pub(crate) fn force_open(&mut self, now: Instant) -> Option<Transition> {
        // Anchor the reopen timer to the moment of forcing.
        self.last_failure_at = Some(now);
        self.transition_to(CircuitState::Open, now)
    }

    pub(crate) fn force_closed(&mut self, now: Instant) -> Option<Transition> {
        self.transition_to(CircuitState::Closed, now)
    }

    /// Returns the circuit to its initial state: closed, with a zeroed
    /// window, even when it was already closed.
    pub(crate) fn reset(&mut self, now: Instant) -> Option<Transition> {
        let transition = self.transition_to(CircuitState::Closed, now);
        if transition.is_none() {
            self.request_count = 0;
            self.failure_count = 0;
            self.success_count = 0;
            self.last_failure_at = None;
            self.last_state_change = now;
        }
        transition
    }

    fn transition_to(&mut self, state: CircuitState, now: Instant) -> Option<Transition> {
        if self.state == state {
            return None;
        }
        let from = self.state;
        self.state = state;
        self.state_atomic.store(state as u8, Ordering::Release);
        self.last_state_change = now;
        self.request_count = 0;
        self.failure_count = 0;
        self.success_count = 0;
        if state == CircuitState::Closed {
            self.last_failure_at = None;
        }
        Some(Transition { from, to: state })
    }

    /// Threshold check for the closed state. Either the absolute failure
    /// count or the failure rate opens the circuit; both are gated by the
    /// minimum request count.
    fn evaluate(
        &mut self,
        config: &CircuitBreakerConfig<impl Sized>,
        now: Instant,
    ) -> Option<Transition> {
        if self.request_count < config.minimum_requests_threshold {
            return None;
        }
        let by_count = self.failure_count >= config.failure_count_threshold;
        let by_rate = f64::from(self.failure_count) / f64::from(self.request_count)
            >= config.failure_rate_threshold;
        if by_count || by_rate {
            self.transition_to(CircuitState::Open, now)
        } else {
            None
        }
    }
}
