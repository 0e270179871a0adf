//! The composed pipeline: rate limiter → bulkhead → circuit breaker →
//! retry → operation.

use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, Ordering};
use std::time::{Duration, Instant};

use breakwater_bulkhead::BulkheadError;
use breakwater_circuitbreaker::{CircuitBreakerEvent, CircuitState};
use breakwater_core::{EventListener, EventListeners, FnListener, ResilienceError};
use breakwater_retry::RetryEvent;

use crate::events::StackEvent;
use crate::policy::GuardPolicy;
use crate::registry::{GuardRegistry, KeyClassifier};

/// Pipeline position markers, recorded so a deadline expiry can report
/// where the call was when time ran out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum Stage {
    RateLimiter = 0,
    Bulkhead = 1,
    CircuitBreaker = 2,
    Retry = 3,
    Operation = 4,
}

impl Stage {
    fn from_u8(value: u8) -> Stage {
        match value {
            0 => Stage::RateLimiter,
            1 => Stage::Bulkhead,
            2 => Stage::CircuitBreaker,
            3 => Stage::Retry,
            _ => Stage::Operation,
        }
    }

    fn as_str(self) -> &'static str {
        match self {
            Stage::RateLimiter => "ratelimiter",
            Stage::Bulkhead => "bulkhead",
            Stage::CircuitBreaker => "circuitbreaker",
            Stage::Retry => "retry",
            Stage::Operation => "operation",
        }
    }
}

/// The composed guard pipeline for keyed dependencies.
///
/// A stack owns a [`GuardRegistry`] and runs every call through the guards
/// the call's key materializes: rate limiter, then bulkhead, then circuit
/// breaker, then retry, then the operation itself. Stages a policy does not
/// carry are skipped without ceremony, so one stack serves keys with very
/// different protection levels.
///
/// Cloning a stack is cheap and clones share the registry, so handlers can
/// each hold their own copy.
pub struct ResilienceStack<E> {
    registry: Arc<GuardRegistry<E>>,
    event_listeners: EventListeners<StackEvent>,
}

impl<E> Clone for ResilienceStack<E> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
            event_listeners: self.event_listeners.clone(),
        }
    }
}

impl<E> ResilienceStack<E> {
    /// Creates a new stack builder.
    pub fn builder() -> ResilienceStackBuilder<E> {
        ResilienceStackBuilder::new()
    }

    /// Builds a stack where every key uses `policy`.
    pub fn new(policy: GuardPolicy<E>) -> Self {
        Self::builder().policy(policy).build()
    }

    /// The registry owning this stack's per-key guards. Use it for
    /// administrative resets and guard introspection.
    pub fn registry(&self) -> &GuardRegistry<E> {
        &self.registry
    }

    /// Runs one operation through the full pipeline for `key`.
    ///
    /// The operation is a factory so the retry stage can invoke it once per
    /// attempt. Calls needing a deadline or a fallback go through
    /// [`call`](Self::call) instead.
    pub async fn run<T, F, Fut>(&self, key: &str, op: F) -> Result<T, ResilienceError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.call(key).run(op).await
    }

    /// Starts a configurable call for `key`.
    pub fn call(&self, key: &str) -> StackCall<'_, E> {
        StackCall {
            stack: self,
            key: key.to_string(),
            deadline: None,
        }
    }

    async fn run_pipeline<T, F, Fut>(
        &self,
        key: &str,
        stage: &AtomicU8,
        op: F,
    ) -> Result<T, ResilienceError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let guards = self.registry.guards(key);

        stage.store(Stage::RateLimiter as u8, Ordering::Relaxed);
        if let Some(limiter) = guards.rate_limiter() {
            match limiter.try_acquire() {
                Ok(()) => self.notify_admitted(key, Stage::RateLimiter),
                Err(err) => {
                    self.notify_rejected(key, Stage::RateLimiter, "rate_limit_exceeded");
                    return Err(err.into());
                }
            }
        }

        stage.store(Stage::Bulkhead as u8, Ordering::Relaxed);
        let _permit = match guards.bulkhead() {
            Some(bulkhead) => match bulkhead.acquire().await {
                Ok(permit) => {
                    self.notify_admitted(key, Stage::Bulkhead);
                    Some(permit)
                }
                Err(err) => {
                    let reason = match err {
                        BulkheadError::Full { .. } => "full",
                        BulkheadError::Timeout { .. } => "timeout",
                    };
                    self.notify_rejected(key, Stage::Bulkhead, reason);
                    return Err(err.into());
                }
            },
            None => None,
        };

        let breaker = guards.circuit_breaker();
        match guards.retry() {
            Some(retry) => {
                // The breaker gates and records every attempt, so one call's
                // retry sequence can both trip the circuit and be cut short
                // by it.
                retry
                    .execute_guarded(
                        |attempt| {
                            stage.store(Stage::CircuitBreaker as u8, Ordering::Relaxed);
                            if let Some(breaker) = breaker {
                                if let Err(err) = breaker.try_acquire() {
                                    self.notify_rejected(key, Stage::CircuitBreaker, "open");
                                    return Err(err.into());
                                }
                                if attempt == 1 {
                                    self.notify_admitted(key, Stage::CircuitBreaker);
                                }
                            }
                            stage.store(Stage::Operation as u8, Ordering::Relaxed);
                            Ok(())
                        },
                        |_attempt, result, elapsed| {
                            if let Some(breaker) = breaker {
                                breaker.record(result, elapsed);
                            }
                            // The next suspension point is the backoff sleep.
                            stage.store(Stage::Retry as u8, Ordering::Relaxed);
                        },
                        op,
                    )
                    .await
            }
            None => {
                stage.store(Stage::CircuitBreaker as u8, Ordering::Relaxed);
                if let Some(breaker) = breaker {
                    if let Err(err) = breaker.try_acquire() {
                        self.notify_rejected(key, Stage::CircuitBreaker, "open");
                        return Err(err.into());
                    }
                    self.notify_admitted(key, Stage::CircuitBreaker);
                }

                stage.store(Stage::Operation as u8, Ordering::Relaxed);
                let mut op = op;
                let started = Instant::now();
                let result = op().await;
                if let Some(breaker) = breaker {
                    breaker.record(&result, started.elapsed());
                }
                result.map_err(ResilienceError::Operation)
            }
        }
    }

    fn notify_admitted(&self, key: &str, stage: Stage) {
        self.event_listeners.emit(&StackEvent::GuardAdmitted {
            key: key.to_string(),
            timestamp: Instant::now(),
            stage: stage.as_str(),
        });
    }

    fn notify_rejected(&self, key: &str, stage: Stage, reason: &'static str) {
        #[cfg(feature = "tracing")]
        tracing::debug!(key, stage = stage.as_str(), reason, "stack rejected call");
        self.event_listeners.emit(&StackEvent::GuardRejected {
            key: key.to_string(),
            timestamp: Instant::now(),
            stage: stage.as_str(),
            reason,
        });
    }
}

/// One configurable call against a [`ResilienceStack`].
///
/// Created by [`ResilienceStack::call`]. Attach a deadline or a fallback,
/// then finish with [`run`](StackCall::run).
pub struct StackCall<'a, E> {
    stack: &'a ResilienceStack<E>,
    key: String,
    deadline: Option<tokio::time::Instant>,
}

impl<'a, E> StackCall<'a, E> {
    /// Aborts the call at `at`, wherever the pipeline is: queued on the
    /// bulkhead, inside the operation, or sleeping out a backoff. The error
    /// names the stage that was running.
    pub fn deadline(mut self, at: tokio::time::Instant) -> Self {
        self.deadline = Some(at);
        self
    }

    /// Shorthand for a deadline `after` from now.
    pub fn timeout(self, after: Duration) -> Self {
        self.deadline(tokio::time::Instant::now() + after)
    }

    /// Routes guard rejections and retry exhaustion into `fallback` instead
    /// of propagating them. Non-retryable operation errors and deadline
    /// expiry still propagate untouched.
    pub fn fallback<FB>(self, fallback: FB) -> StackCallWithFallback<'a, E, FB> {
        StackCallWithFallback {
            call: self,
            fallback,
        }
    }

    /// Runs the operation through the pipeline.
    pub async fn run<T, F, Fut>(self, op: F) -> Result<T, ResilienceError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let stage = AtomicU8::new(Stage::RateLimiter as u8);
        match self.deadline {
            Some(at) => {
                let pipeline = self.stack.run_pipeline(&self.key, &stage, op);
                match tokio::time::timeout_at(at, pipeline).await {
                    Ok(result) => result,
                    Err(_) => {
                        // Dropping the pipeline future released any held
                        // bulkhead permit.
                        let at_stage = Stage::from_u8(stage.load(Ordering::Relaxed));
                        #[cfg(feature = "tracing")]
                        tracing::debug!(
                            key = %self.key,
                            stage = at_stage.as_str(),
                            "deadline exceeded"
                        );
                        Err(ResilienceError::DeadlineExceeded {
                            stage: at_stage.as_str(),
                        })
                    }
                }
            }
            None => self.stack.run_pipeline(&self.key, &stage, op).await,
        }
    }
}

/// A [`StackCall`] with a fallback attached.
pub struct StackCallWithFallback<'a, E, FB> {
    call: StackCall<'a, E>,
    fallback: FB,
}

impl<'a, E, FB> StackCallWithFallback<'a, E, FB> {
    /// Aborts the call at `at`; see [`StackCall::deadline`].
    pub fn deadline(mut self, at: tokio::time::Instant) -> Self {
        self.call = self.call.deadline(at);
        self
    }

    /// Shorthand for a deadline `after` from now.
    pub fn timeout(mut self, after: Duration) -> Self {
        self.call = self.call.timeout(after);
        self
    }

    /// Runs the operation, consulting the fallback when a guard rejects the
    /// call or retries are exhausted.
    pub async fn run<T, F, Fut, FbFut>(self, op: F) -> Result<T, ResilienceError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
        FB: FnOnce(ResilienceError<E>) -> FbFut,
        FbFut: Future<Output = Result<T, ResilienceError<E>>>,
    {
        match self.call.run(op).await {
            Err(err) if err.is_rejection() => (self.fallback)(err).await,
            other => other,
        }
    }
}

/// Builder for [`ResilienceStack`].
pub struct ResilienceStackBuilder<E> {
    default_policy: Option<GuardPolicy<E>>,
    class_policies: Vec<(String, GuardPolicy<E>)>,
    classifier: Option<KeyClassifier>,
    event_listeners: EventListeners<StackEvent>,
}

impl<E> ResilienceStackBuilder<E> {
    pub fn new() -> Self {
        Self {
            default_policy: None,
            class_policies: Vec::new(),
            classifier: None,
            event_listeners: EventListeners::new(),
        }
    }

    /// Sets the policy keys use when no class policy claims them. Unset, it
    /// defaults to an empty policy that admits everything.
    pub fn policy(mut self, policy: GuardPolicy<E>) -> Self {
        self.default_policy = Some(policy);
        self
    }

    /// Registers a policy for one key class.
    pub fn class_policy<N: Into<String>>(mut self, class: N, policy: GuardPolicy<E>) -> Self {
        self.class_policies.push((class.into(), policy));
        self
    }

    /// Sets the function mapping keys to class names. Keys mapped to `None`
    /// or to an unregistered class use the default policy.
    pub fn key_classifier<F>(mut self, classifier: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.classifier = Some(Arc::new(classifier));
        self
    }

    /// Attaches a listener for every [`StackEvent`].
    pub fn subscribe<L>(mut self, listener: L) -> Self
    where
        L: EventListener<StackEvent> + 'static,
    {
        self.event_listeners.add(listener);
        self
    }

    /// Convenience hook invoked with `(key, stage)` when a stage admits a
    /// call.
    pub fn on_guard_admitted<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &'static str) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event: &StackEvent| {
            if let StackEvent::GuardAdmitted { key, stage, .. } = event {
                f(key, stage);
            }
        }));
        self
    }

    /// Convenience hook invoked with `(key, stage, reason)` when a stage
    /// rejects a call.
    pub fn on_guard_rejected<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, &'static str, &'static str) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event: &StackEvent| {
            if let StackEvent::GuardRejected {
                key, stage, reason, ..
            } = event
            {
                f(key, *stage, *reason);
            }
        }));
        self
    }

    /// Convenience hook invoked with `(key, from, to)` when any key's
    /// circuit changes state.
    pub fn on_circuit_state_changed<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, CircuitState, CircuitState) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event: &StackEvent| {
            if let StackEvent::CircuitStateChanged {
                key,
                from_state,
                to_state,
                ..
            } = event
            {
                f(key, *from_state, *to_state);
            }
        }));
        self
    }

    /// Convenience hook invoked with `(key, attempt, delay)` when any key's
    /// retry executor schedules another attempt.
    pub fn on_retry_attempted<F>(mut self, f: F) -> Self
    where
        F: Fn(&str, usize, Duration) + Send + Sync + 'static,
    {
        self.event_listeners.add(FnListener::new(move |event: &StackEvent| {
            if let StackEvent::RetryAttempted {
                key,
                attempt,
                delay,
                ..
            } = event
            {
                f(key, *attempt, *delay);
            }
        }));
        self
    }

    /// Builds the stack, instrumenting every policy so circuit transitions
    /// and retry attempts surface as [`StackEvent`]s.
    pub fn build(self) -> ResilienceStack<E> {
        let listeners = self.event_listeners;
        let mut default_policy = self
            .default_policy
            .unwrap_or_else(|| GuardPolicy::builder().build());
        instrument_policy(&mut default_policy, &listeners);

        let mut registry = GuardRegistry::new(default_policy);
        for (class, mut policy) in self.class_policies {
            instrument_policy(&mut policy, &listeners);
            registry = registry.with_class_policy(class, policy);
        }
        if let Some(classifier) = self.classifier {
            registry = registry.with_classifier(move |key: &str| classifier(key));
        }

        ResilienceStack {
            registry: Arc::new(registry),
            event_listeners: listeners,
        }
    }
}

impl<E> Default for ResilienceStackBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}

/// Subscribes relay listeners on a policy's breaker and retry configs so
/// their transitions and attempts re-emit on the stack's own stream. The
/// original event's timestamp is carried through.
fn instrument_policy<E>(policy: &mut GuardPolicy<E>, listeners: &EventListeners<StackEvent>) {
    if listeners.is_empty() {
        return;
    }

    if let Some(config) = policy.circuit_breaker.as_mut() {
        let relay = listeners.clone();
        config.subscribe(FnListener::new(move |event: &CircuitBreakerEvent| {
            if let CircuitBreakerEvent::StateTransition {
                key,
                timestamp,
                from_state,
                to_state,
            } = event
            {
                relay.emit(&StackEvent::CircuitStateChanged {
                    key: key.clone(),
                    timestamp: *timestamp,
                    from_state: *from_state,
                    to_state: *to_state,
                });
            }
        }));
    }

    if let Some(config) = policy.retry.as_mut() {
        let relay = listeners.clone();
        config.subscribe(FnListener::new(move |event: &RetryEvent| {
            if let RetryEvent::Retry {
                key,
                timestamp,
                attempt,
                delay,
            } = event
            {
                relay.emit(&StackEvent::RetryAttempted {
                    key: key.clone(),
                    timestamp: *timestamp,
                    attempt: *attempt,
                    delay: *delay,
                });
            }
        }));
    }
}
