//! Property tests for the token bucket.
//!
//! Invariants tested:
//! - Admissions never exceed capacity within a window
//! - Token count stays within [0, capacity]
//! - Reset always restores a full bucket

use proptest::prelude::*;

use breakwater_ratelimiter::{RateLimiter, RateLimiterConfig};

/// A bucket whose refill is too slow to matter for the duration of a test,
/// so admission counts depend only on the initial capacity.
fn frozen_bucket(capacity: f64) -> RateLimiter {
    RateLimiter::new(
        RateLimiterConfig::builder()
            .capacity(capacity)
            .refill_per_second(1e-9)
            .name("prop")
            .build(),
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(30))]

    /// Property: exactly min(demand, capacity) calls are admitted when the
    /// bucket cannot meaningfully refill.
    #[test]
    fn admissions_never_exceed_capacity(
        capacity in 1u32..=50,
        demand in 1usize..=200,
    ) {
        let limiter = frozen_bucket(capacity as f64);

        let admitted = (0..demand)
            .filter(|_| limiter.try_acquire().is_ok())
            .count();

        prop_assert_eq!(admitted, demand.min(capacity as usize));
    }

    /// Property: the snapshot never reports tokens below zero or above
    /// capacity, no matter how the bucket is driven.
    #[test]
    fn snapshot_tokens_stay_within_bounds(
        capacity in 1u32..=50,
        demand in 0usize..=100,
    ) {
        let limiter = frozen_bucket(capacity as f64);

        for _ in 0..demand {
            let _ = limiter.try_acquire();
            let snap = limiter.snapshot();
            prop_assert!(snap.available_tokens >= 0.0);
            prop_assert!(snap.available_tokens <= snap.capacity);
        }
    }

    /// Property: after a reset the bucket admits exactly `capacity` calls
    /// again, regardless of how much was drained before.
    #[test]
    fn reset_restores_full_capacity(
        capacity in 1u32..=20,
        drained in 0usize..=40,
    ) {
        let limiter = frozen_bucket(capacity as f64);
        for _ in 0..drained {
            let _ = limiter.try_acquire();
        }

        limiter.reset();

        for _ in 0..capacity {
            prop_assert!(limiter.try_acquire().is_ok());
        }
        prop_assert!(limiter.try_acquire().is_err());
    }

    /// Property: a rejection's retry-after hint never exceeds the time one
    /// whole token takes to accrue.
    #[test]
    fn retry_after_hint_is_bounded_by_one_token(
        capacity in 1u32..=10,
        rate in 1u32..=100,
    ) {
        let limiter = RateLimiter::new(
            RateLimiterConfig::builder()
                .capacity(capacity as f64)
                .refill_per_second(rate as f64)
                .name("prop")
                .build(),
        );

        for _ in 0..capacity {
            let _ = limiter.try_acquire();
        }

        if let Err(err) = limiter.try_acquire() {
            let one_token = std::time::Duration::from_secs_f64(1.0 / rate as f64);
            prop_assert!(err.retry_after() <= one_token);
        }
    }
}
