//! Circuit recovery timing against the wall clock.

use std::time::Duration;

use breakwater_circuitbreaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};

fn fast_recovery() -> CircuitBreakerConfig<&'static str> {
    CircuitBreakerConfig::builder()
        .failure_count_threshold(1)
        .minimum_requests_threshold(1)
        .open_timeout(Duration::from_millis(150))
        .success_threshold(1)
        .build()
}

#[tokio::test]
async fn open_timeout_is_honored_in_real_time() {
    let breaker = CircuitBreaker::new(fast_recovery());

    breaker.try_acquire().unwrap();
    breaker.record_failure(Duration::from_millis(5));
    assert_eq!(breaker.state(), CircuitState::Open);
    assert!(breaker.try_acquire().is_err());

    tokio::time::sleep(Duration::from_millis(200)).await;

    // The cooldown elapsed, so a probe is admitted and its success closes
    // the circuit.
    breaker.try_acquire().unwrap();
    assert_eq!(breaker.state(), CircuitState::HalfOpen);
    breaker.record_success(Duration::from_millis(5));
    assert_eq!(breaker.state(), CircuitState::Closed);
}

#[tokio::test]
async fn failed_probe_reopens_the_circuit() {
    let breaker = CircuitBreaker::new(fast_recovery());

    breaker.try_acquire().unwrap();
    breaker.record_failure(Duration::from_millis(5));
    tokio::time::sleep(Duration::from_millis(200)).await;

    breaker.try_acquire().unwrap();
    breaker.record_failure(Duration::from_millis(5));
    assert_eq!(breaker.state(), CircuitState::Open);
    assert!(breaker.try_acquire().is_err());
}

#[tokio::test]
async fn forced_open_circuit_still_recovers_after_the_cooldown() {
    let breaker = CircuitBreaker::new(fast_recovery());

    breaker.force_open();
    assert!(breaker.try_acquire().is_err());

    tokio::time::sleep(Duration::from_millis(200)).await;
    breaker.try_acquire().unwrap();
    assert_eq!(breaker.state(), CircuitState::HalfOpen);
}
