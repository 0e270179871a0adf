//! Per-key guard state: lazy materialization, class routing, and
//! administrative reset.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;

use breakwater_bulkhead::Bulkhead;
use breakwater_circuitbreaker::CircuitBreaker;
use breakwater_ratelimiter::RateLimiter;
use breakwater_retry::RetryExecutor;

use crate::policy::GuardPolicy;

/// Maps a key to the name of its key class, or `None` for the default
/// policy.
pub type KeyClassifier = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

/// The materialized guards for one key.
///
/// Stamped from the key's policy on first use; keys sharing a policy still
/// get independent guard state.
pub struct KeyGuards<E> {
    rate_limiter: Option<RateLimiter>,
    bulkhead: Option<Bulkhead>,
    circuit_breaker: Option<CircuitBreaker<E>>,
    retry: Option<RetryExecutor<E>>,
}

impl<E> KeyGuards<E> {
    fn materialize(policy: &GuardPolicy<E>, key: &str) -> Self {
        Self {
            rate_limiter: policy
                .rate_limiter
                .as_ref()
                .map(|config| RateLimiter::for_key(config, key)),
            bulkhead: policy
                .bulkhead
                .as_ref()
                .map(|config| Bulkhead::for_key(config, key)),
            circuit_breaker: policy
                .circuit_breaker
                .as_ref()
                .map(|config| CircuitBreaker::for_key(config, key)),
            retry: policy
                .retry
                .as_ref()
                .map(|config| RetryExecutor::for_key(config, key)),
        }
    }

    /// The key's rate limiter, if its policy carries one.
    pub fn rate_limiter(&self) -> Option<&RateLimiter> {
        self.rate_limiter.as_ref()
    }

    /// The key's bulkhead, if its policy carries one.
    pub fn bulkhead(&self) -> Option<&Bulkhead> {
        self.bulkhead.as_ref()
    }

    /// The key's circuit breaker, if its policy carries one.
    pub fn circuit_breaker(&self) -> Option<&CircuitBreaker<E>> {
        self.circuit_breaker.as_ref()
    }

    /// The key's retry executor, if its policy carries one.
    pub fn retry(&self) -> Option<&RetryExecutor<E>> {
        self.retry.as_ref()
    }
}

/// Registry owning every key's guards.
///
/// Guards are materialized lazily: the first call for a key resolves the
/// key's policy (classifier, then class policy, then default) and stamps
/// the guards from it; later calls share them. Entries live in a sharded
/// concurrent map, so independent keys do not contend on one lock.
pub struct GuardRegistry<E> {
    guards: DashMap<String, Arc<KeyGuards<E>>>,
    default_policy: GuardPolicy<E>,
    class_policies: HashMap<String, GuardPolicy<E>>,
    classifier: Option<KeyClassifier>,
}

impl<E> GuardRegistry<E> {
    /// Creates a registry where every key uses `default_policy`.
    pub fn new(default_policy: GuardPolicy<E>) -> Self {
        Self {
            guards: DashMap::new(),
            default_policy,
            class_policies: HashMap::new(),
            classifier: None,
        }
    }

    /// Registers a policy for one key class.
    pub fn with_class_policy<N: Into<String>>(mut self, class: N, policy: GuardPolicy<E>) -> Self {
        self.class_policies.insert(class.into(), policy);
        self
    }

    /// Sets the function mapping keys to class names.
    ///
    /// Keys the classifier maps to `None`, or to a class with no registered
    /// policy, use the default policy.
    pub fn with_classifier<F>(mut self, classifier: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.classifier = Some(Arc::new(classifier));
        self
    }

    /// Returns the guards for `key`, materializing them on first use.
    ///
    /// Racing first calls for the same key settle on one set of guards; the
    /// entry is inserted atomically.
    pub fn guards(&self, key: &str) -> Arc<KeyGuards<E>> {
        if let Some(entry) = self.guards.get(key) {
            return Arc::clone(&entry);
        }

        let entry = self
            .guards
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(KeyGuards::materialize(self.policy_for(key), key)));
        Arc::clone(&entry)
    }

    fn policy_for(&self, key: &str) -> &GuardPolicy<E> {
        self.classifier
            .as_ref()
            .and_then(|classify| classify(key))
            .and_then(|class| self.class_policies.get(&class))
            .unwrap_or(&self.default_policy)
    }

    /// Discards the guards for `key`, returning `true` if the key had any.
    ///
    /// The next call for the key materializes fresh guards from its policy:
    /// a closed circuit, a full token bucket, zero slots in use. Calls still
    /// running against the old guards finish against them and release
    /// nothing into the new set.
    pub fn reset_key(&self, key: &str) -> bool {
        self.guards.remove(key).is_some()
    }

    /// Discards the guards for every key.
    pub fn reset_all(&self) {
        self.guards.clear();
    }

    /// Number of keys with materialized guards.
    pub fn len(&self) -> usize {
        self.guards.len()
    }

    /// Returns `true` if no key has materialized guards yet.
    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }
}
