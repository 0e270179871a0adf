//! Rate limiter metrics regression tests.
//!
//! Emitted metrics: breakwater_ratelimiter_admitted_total,
//! breakwater_ratelimiter_rejected_total, breakwater_ratelimiter_tokens.

use serial_test::serial;

use breakwater_ratelimiter::{RateLimiter, RateLimiterConfig};

use super::helpers::*;

#[tokio::test]
#[serial]
async fn admission_metrics_exist() {
    init_recorder();

    let limiter = RateLimiter::new(
        RateLimiterConfig::builder()
            .capacity(10.0)
            .refill_per_second(1.0)
            .name("metrics_ratelimiter")
            .build(),
    );

    for _ in 0..3 {
        limiter.try_acquire().unwrap();
    }

    assert_counter_exists("breakwater_ratelimiter_admitted_total");
    assert_metric_has_label(
        "breakwater_ratelimiter_admitted_total",
        "name",
        "metrics_ratelimiter",
    );
    assert_gauge_exists("breakwater_ratelimiter_tokens");
    assert_metric_has_label(
        "breakwater_ratelimiter_tokens",
        "name",
        "metrics_ratelimiter",
    );
}

#[tokio::test]
#[serial]
async fn rejection_metrics_exist() {
    init_recorder();

    let limiter = RateLimiter::new(
        RateLimiterConfig::builder()
            .capacity(1.0)
            .refill_per_second(1e-9)
            .name("reject_ratelimiter")
            .build(),
    );

    limiter.try_acquire().unwrap();
    assert!(limiter.try_acquire().is_err());

    assert_counter_exists("breakwater_ratelimiter_rejected_total");
    assert_metric_has_label(
        "breakwater_ratelimiter_rejected_total",
        "name",
        "reject_ratelimiter",
    );
}
