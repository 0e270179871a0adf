//! Circuit breaker guard.
//!
//! A [`CircuitBreaker`] watches the outcomes of calls to one dependency and
//! short-circuits further calls once the dependency is judged unhealthy, so
//! a failing downstream cannot soak up threads, connections, and latency
//! budget process-wide.
//!
//! # States
//!
//! - **Closed**: normal operation; every outcome is counted. The circuit
//!   opens when, with at least `minimum_requests_threshold` calls recorded,
//!   the window holds `failure_count_threshold` failures *or* the failure
//!   rate reaches `failure_rate_threshold`.
//! - **Open**: calls are rejected without reaching the operation until
//!   `open_timeout` has elapsed since the most recent failure.
//! - **HalfOpen**: a bounded number of probe calls are admitted;
//!   `success_threshold` probe successes close the circuit, any probe
//!   failure reopens it.
//!
//! Counters cover a fixed window: they accumulate until a state transition
//! (or an administrative reset) zeroes them.
//!
//! # Example
//!
//! ```rust
//! use breakwater_circuitbreaker::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerError};
//!
//! # async fn example() {
//! let breaker: CircuitBreaker<std::io::Error> = CircuitBreaker::new(
//!     CircuitBreakerConfig::builder()
//!         .failure_count_threshold(5)
//!         .name("payments")
//!         .build(),
//! );
//!
//! match breaker.call(|| async { Ok::<_, std::io::Error>("ok") }).await {
//!     Ok(body) => println!("{body}"),
//!     Err(CircuitBreakerError::Open { .. }) => println!("short-circuited"),
//!     Err(CircuitBreakerError::Operation(e)) => println!("failed: {e}"),
//! }
//! # }
//! ```
//!
//! # Gating externally driven work
//!
//! [`CircuitBreaker::call`] wraps one operation, but the breaker also works
//! as a pure gate when something else drives execution (a retry loop, a
//! connection pool): check [`try_acquire`](CircuitBreaker::try_acquire)
//! before the work and [`record`](CircuitBreaker::record) the outcome after.
//!
//! ```rust
//! use breakwater_circuitbreaker::{CircuitBreaker, CircuitBreakerConfig};
//! use std::time::Instant;
//!
//! let breaker: CircuitBreaker<std::io::Error> =
//!     CircuitBreaker::new(CircuitBreakerConfig::builder().name("inventory").build());
//!
//! if breaker.try_acquire().is_ok() {
//!     let started = Instant::now();
//!     let outcome: Result<(), std::io::Error> = Ok(());
//!     breaker.record(&outcome, started.elapsed());
//! }
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use crate::circuit::{Circuit, Transition};

pub use circuit::{CircuitMetrics, CircuitState};
pub use config::{CircuitBreakerConfig, CircuitBreakerConfigBuilder};
pub use error::CircuitBreakerError;
pub use events::CircuitBreakerEvent;

mod circuit;
pub mod config;
pub mod error;
pub mod events;

/// Circuit breaker guard for one dependency.
///
/// Cloning shares the same circuit; all clones observe and drive the same
/// state.
///
/// # Type Parameters
///
/// - `E`: the error type of the guarded operation
pub struct CircuitBreaker<E> {
    circuit: Arc<Mutex<Circuit>>,
    state_atomic: Arc<AtomicU8>,
    config: Arc<CircuitBreakerConfig<E>>,
}

impl<E> CircuitBreaker<E> {
    /// Builds a breaker from a validated config.
    pub fn new(config: CircuitBreakerConfig<E>) -> Self {
        let state_atomic = Arc::new(AtomicU8::new(CircuitState::Closed as u8));
        Self {
            circuit: Arc::new(Mutex::new(Circuit::new_with_atomic(Arc::clone(
                &state_atomic,
            )))),
            state_atomic,
            config: Arc::new(config),
        }
    }

    /// Builds a breaker for a specific key from a shared config template,
    /// overriding the configured name with the key.
    pub fn for_key(config: &CircuitBreakerConfig<E>, key: &str) -> Self {
        let mut config = config.clone();
        config.name = key.to_string();
        Self::new(config)
    }

    /// Asks the circuit whether a call may proceed.
    ///
    /// An open circuit whose `open_timeout` has elapsed flips to half-open
    /// here, and the asking call is admitted as the first probe. The caller
    /// must later [`record`](Self::record) the outcome of every admitted
    /// call, or the half-open probe accounting stalls.
    pub fn try_acquire(&self) -> Result<(), CircuitBreakerError<E>> {
        let now = Instant::now();
        let (permitted, state, transition) = {
            let mut circuit = self.circuit.lock().unwrap();
            let (permitted, transition) = circuit.try_acquire(&self.config, now);
            (permitted, circuit.state(), transition)
        };

        if let Some(t) = transition {
            self.notify_transition(t, now);
        }

        if permitted {
            self.config
                .event_listeners
                .emit(&CircuitBreakerEvent::CallPermitted {
                    key: self.config.name.clone(),
                    timestamp: now,
                    state,
                });
            Ok(())
        } else {
            #[cfg(feature = "tracing")]
            tracing::debug!(name = %self.config.name, "circuit breaker rejected call");
            #[cfg(feature = "metrics")]
            metrics::counter!(
                "breakwater_circuitbreaker_calls_total",
                "circuitbreaker" => self.config.name.clone(),
                "outcome" => "rejected"
            )
            .increment(1);

            self.config
                .event_listeners
                .emit(&CircuitBreakerEvent::CallRejected {
                    key: self.config.name.clone(),
                    timestamp: now,
                });
            Err(CircuitBreakerError::Open {
                key: self.config.name.clone(),
            })
        }
    }

    /// Records the outcome of an admitted call, consulting the configured
    /// failure classifier for errors.
    pub fn record<T>(&self, result: &Result<T, E>, duration: Duration) {
        match result {
            Ok(_) => self.record_success(duration),
            Err(e) => {
                if (self.config.failure_classifier)(e) {
                    self.record_failure(duration)
                } else {
                    self.record_success(duration)
                }
            }
        }
    }

    /// Records a successful outcome.
    pub fn record_success(&self, duration: Duration) {
        let now = Instant::now();
        let (state, transition) = {
            let mut circuit = self.circuit.lock().unwrap();
            let state = circuit.state();
            (state, circuit.record_success(&self.config, now))
        };

        #[cfg(feature = "metrics")]
        {
            metrics::counter!(
                "breakwater_circuitbreaker_calls_total",
                "circuitbreaker" => self.config.name.clone(),
                "outcome" => "success"
            )
            .increment(1);
            metrics::histogram!(
                "breakwater_circuitbreaker_call_duration_seconds",
                "circuitbreaker" => self.config.name.clone()
            )
            .record(duration.as_secs_f64());
        }

        self.config
            .event_listeners
            .emit(&CircuitBreakerEvent::SuccessRecorded {
                key: self.config.name.clone(),
                timestamp: now,
                state,
                duration,
            });

        if let Some(t) = transition {
            self.notify_transition(t, now);
        }
    }

    /// Records a failed outcome.
    pub fn record_failure(&self, duration: Duration) {
        let now = Instant::now();
        let (state, transition) = {
            let mut circuit = self.circuit.lock().unwrap();
            let state = circuit.state();
            (state, circuit.record_failure(&self.config, now))
        };

        #[cfg(feature = "metrics")]
        {
            metrics::counter!(
                "breakwater_circuitbreaker_calls_total",
                "circuitbreaker" => self.config.name.clone(),
                "outcome" => "failure"
            )
            .increment(1);
            metrics::histogram!(
                "breakwater_circuitbreaker_call_duration_seconds",
                "circuitbreaker" => self.config.name.clone()
            )
            .record(duration.as_secs_f64());
        }

        self.config
            .event_listeners
            .emit(&CircuitBreakerEvent::FailureRecorded {
                key: self.config.name.clone(),
                timestamp: now,
                state,
                duration,
            });

        if let Some(t) = transition {
            self.notify_transition(t, now);
        }
    }

    /// Runs one operation through the breaker: gate, invoke, record.
    pub async fn call<T, F, Fut>(&self, op: F) -> Result<T, CircuitBreakerError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.try_acquire()?;
        let started = Instant::now();
        let result = op().await;
        self.record(&result, started.elapsed());
        result.map_err(CircuitBreakerError::Operation)
    }

    /// Forces the circuit open. The reopen timer restarts from now.
    pub fn force_open(&self) {
        let now = Instant::now();
        let transition = self.circuit.lock().unwrap().force_open(now);
        if let Some(t) = transition {
            self.notify_transition(t, now);
        }
    }

    /// Forces the circuit closed.
    pub fn force_closed(&self) {
        let now = Instant::now();
        let transition = self.circuit.lock().unwrap().force_closed(now);
        if let Some(t) = transition {
            self.notify_transition(t, now);
        }
    }

    /// Returns the circuit to its initial state: closed with a zeroed
    /// window. Administrative operation, not part of the normal call path.
    pub fn reset(&self) {
        let now = Instant::now();
        let transition = self.circuit.lock().unwrap().reset(now);
        if let Some(t) = transition {
            self.notify_transition(t, now);
        }
    }

    /// Current state, read lock-free from the atomic mirror.
    pub fn state(&self) -> CircuitState {
        CircuitState::from_u8(self.state_atomic.load(Ordering::Acquire))
    }

    /// Returns whether the circuit is currently open.
    pub fn is_open(&self) -> bool {
        self.state() == CircuitState::Open
    }

    /// Point-in-time snapshot of the circuit's counters and state.
    pub fn metrics(&self) -> CircuitMetrics {
        self.circuit.lock().unwrap().metrics()
    }

    /// Configured name (the guarded key, when registry-managed).
    pub fn name(&self) -> &str {
        &self.config.name
    }

    fn notify_transition(&self, transition: Transition, now: Instant) {
        #[cfg(feature = "tracing")]
        tracing::info!(
            name = %self.config.name,
            from = transition.from.as_str(),
            to = transition.to.as_str(),
            "circuit state changed"
        );
        #[cfg(feature = "metrics")]
        {
            metrics::counter!(
                "breakwater_circuitbreaker_transitions_total",
                "circuitbreaker" => self.config.name.clone(),
                "from" => transition.from.as_str(),
                "to" => transition.to.as_str()
            )
            .increment(1);
            metrics::gauge!(
                "breakwater_circuitbreaker_state",
                "circuitbreaker" => self.config.name.clone()
            )
            .set(f64::from(transition.to as u8));
        }

        self.config
            .event_listeners
            .emit(&CircuitBreakerEvent::StateTransition {
                key: self.config.name.clone(),
                timestamp: now,
                from_state: transition.from,
                to_state: transition.to,
            });
    }
}

impl<E> Clone for CircuitBreaker<E> {
    fn clone(&self) -> Self {
        Self {
            circuit: Arc::clone(&self.circuit),
            state_atomic: Arc::clone(&self.state_atomic),
            config: Arc::clone(&self.config),
        }
    }
}
