//! Retry metrics regression tests.
//!
//! Emitted metrics: breakwater_retry_retries_total,
//! breakwater_retry_calls_total (labels: outcome=success|exhausted|not_retryable).

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serial_test::serial;

use breakwater_retry::{RetryConfig, RetryExecutor};

use super::helpers::*;

#[tokio::test]
#[serial]
async fn retry_and_success_metrics_exist() {
    init_recorder();

    let executor: RetryExecutor<&'static str> = RetryExecutor::new(
        RetryConfig::builder()
            .max_attempts(3)
            .fixed_backoff(Duration::ZERO)
            .name("metrics_retry")
            .build(),
    );

    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);
    executor
        .execute(move || {
            let seen = Arc::clone(&seen);
            async move {
                if seen.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err("transient")
                } else {
                    Ok(())
                }
            }
        })
        .await
        .unwrap();

    assert_counter_exists("breakwater_retry_retries_total");
    assert_metric_has_label("breakwater_retry_retries_total", "retry", "metrics_retry");
    assert_counter_exists("breakwater_retry_calls_total");
    assert_metric_has_label("breakwater_retry_calls_total", "outcome", "success");
}

#[tokio::test]
#[serial]
async fn exhaustion_metrics_exist() {
    init_recorder();

    let executor: RetryExecutor<&'static str> = RetryExecutor::new(
        RetryConfig::builder()
            .max_attempts(2)
            .fixed_backoff(Duration::ZERO)
            .name("exhausted_retry")
            .build(),
    );

    let out: Result<(), _> = executor.execute(|| async { Err::<(), _>("down") }).await;
    assert!(out.is_err());

    assert_metric_has_label("breakwater_retry_calls_total", "outcome", "exhausted");
    assert_metric_has_label("breakwater_retry_calls_total", "retry", "exhausted_retry");
}

#[tokio::test]
#[serial]
async fn not_retryable_metrics_exist() {
    init_recorder();

    let executor: RetryExecutor<&'static str> = RetryExecutor::new(
        RetryConfig::builder()
            .max_attempts(5)
            .retry_on(|_: &&str| false)
            .name("permanent_retry")
            .build(),
    );

    let out: Result<(), _> = executor.execute(|| async { Err::<(), _>("bad input") }).await;
    assert!(out.is_err());

    assert_metric_has_label("breakwater_retry_calls_total", "outcome", "not_retryable");
    assert_metric_has_label("breakwater_retry_calls_total", "retry", "permanent_retry");
}
