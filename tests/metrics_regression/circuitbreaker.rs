//! Circuit breaker metrics regression tests.
//!
//! Emitted metrics: breakwater_circuitbreaker_calls_total (labels:
//! outcome=success|failure|rejected), breakwater_circuitbreaker_call_duration_seconds,
//! breakwater_circuitbreaker_transitions_total (labels: from, to),
//! breakwater_circuitbreaker_state.

use std::time::Duration;

use serial_test::serial;

use breakwater_circuitbreaker::{CircuitBreaker, CircuitBreakerConfig};

use super::helpers::*;

#[tokio::test]
#[serial]
async fn outcome_metrics_exist() {
    init_recorder();

    let breaker: CircuitBreaker<&'static str> = CircuitBreaker::new(
        CircuitBreakerConfig::builder()
            .failure_count_threshold(100)
            .minimum_requests_threshold(100)
            .name("metrics_circuitbreaker")
            .build(),
    );

    let _ = breaker.call(|| async { Ok::<_, &str>(()) }).await;
    let _ = breaker.call(|| async { Err::<(), _>("boom") }).await;

    assert_counter_exists("breakwater_circuitbreaker_calls_total");
    assert_metric_has_label(
        "breakwater_circuitbreaker_calls_total",
        "circuitbreaker",
        "metrics_circuitbreaker",
    );
    assert_metric_has_label(
        "breakwater_circuitbreaker_calls_total",
        "outcome",
        "success",
    );
    assert_metric_has_label(
        "breakwater_circuitbreaker_calls_total",
        "outcome",
        "failure",
    );
    assert_histogram_exists("breakwater_circuitbreaker_call_duration_seconds");
}

#[tokio::test]
#[serial]
async fn transition_and_rejection_metrics_exist() {
    init_recorder();

    let breaker: CircuitBreaker<&'static str> = CircuitBreaker::new(
        CircuitBreakerConfig::builder()
            .failure_count_threshold(1)
            .minimum_requests_threshold(1)
            .open_timeout(Duration::from_secs(3600))
            .name("transition_circuitbreaker")
            .build(),
    );

    let _ = breaker.call(|| async { Err::<(), _>("boom") }).await;
    assert!(breaker.try_acquire().is_err());

    assert_counter_exists("breakwater_circuitbreaker_transitions_total");
    assert_metric_has_label(
        "breakwater_circuitbreaker_transitions_total",
        "from",
        "closed",
    );
    assert_metric_has_label("breakwater_circuitbreaker_transitions_total", "to", "open");
    assert_gauge_exists("breakwater_circuitbreaker_state");
    assert_metric_has_label(
        "breakwater_circuitbreaker_calls_total",
        "outcome",
        "rejected",
    );
}
