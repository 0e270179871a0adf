//! Guard policies: the bundle of per-stage configs a key class is governed by.

use breakwater_bulkhead::BulkheadConfig;
use breakwater_circuitbreaker::CircuitBreakerConfig;
use breakwater_ratelimiter::RateLimiterConfig;
use breakwater_retry::RetryConfig;

/// The set of guard configs one key class stamps its guards from.
///
/// Every stage is optional. A key materializes guards only for the stages
/// its policy carries, and the stack runs whatever it finds in the fixed
/// rate limiter → bulkhead → circuit breaker → retry order. An empty policy
/// passes every call straight through to the operation.
pub struct GuardPolicy<E> {
    pub(crate) rate_limiter: Option<RateLimiterConfig>,
    pub(crate) bulkhead: Option<BulkheadConfig>,
    pub(crate) circuit_breaker: Option<CircuitBreakerConfig<E>>,
    pub(crate) retry: Option<RetryConfig<E>>,
}

impl<E> GuardPolicy<E> {
    /// Creates a new policy builder with no stages enabled.
    pub fn builder() -> GuardPolicyBuilder<E> {
        GuardPolicyBuilder::new()
    }
}

impl<E> Clone for GuardPolicy<E> {
    fn clone(&self) -> Self {
        Self {
            rate_limiter: self.rate_limiter.clone(),
            bulkhead: self.bulkhead.clone(),
            circuit_breaker: self.circuit_breaker.clone(),
            retry: self.retry.clone(),
        }
    }
}

/// Builder for [`GuardPolicy`].
pub struct GuardPolicyBuilder<E> {
    rate_limiter: Option<RateLimiterConfig>,
    bulkhead: Option<BulkheadConfig>,
    circuit_breaker: Option<CircuitBreakerConfig<E>>,
    retry: Option<RetryConfig<E>>,
}

impl<E> GuardPolicyBuilder<E> {
    pub fn new() -> Self {
        Self {
            rate_limiter: None,
            bulkhead: None,
            circuit_breaker: None,
            retry: None,
        }
    }

    /// Adds a rate limiter stage.
    pub fn rate_limiter(mut self, config: RateLimiterConfig) -> Self {
        self.rate_limiter = Some(config);
        self
    }

    /// Adds a bulkhead stage.
    pub fn bulkhead(mut self, config: BulkheadConfig) -> Self {
        self.bulkhead = Some(config);
        self
    }

    /// Adds a circuit breaker stage.
    pub fn circuit_breaker(mut self, config: CircuitBreakerConfig<E>) -> Self {
        self.circuit_breaker = Some(config);
        self
    }

    /// Adds a retry stage.
    pub fn retry(mut self, config: RetryConfig<E>) -> Self {
        self.retry = Some(config);
        self
    }

    /// Builds the policy. Stage configs validate themselves when built, so
    /// any combination of stages is accepted here.
    pub fn build(self) -> GuardPolicy<E> {
        GuardPolicy {
            rate_limiter: self.rate_limiter,
            bulkhead: self.bulkhead,
            circuit_breaker: self.circuit_breaker,
            retry: self.retry,
        }
    }
}

impl<E> Default for GuardPolicyBuilder<E> {
    fn default() -> Self {
        Self::new()
    }
}
