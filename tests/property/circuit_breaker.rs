//! Property tests for the circuit breaker state machine.
//!
//! Invariants tested:
//! - Never opens before the minimum-requests gate is met
//! - Opens exactly when a threshold condition is met, and not before
//! - Successes alone never open the circuit
//! - Counters never report more failures than requests

use std::time::Duration;

use proptest::prelude::*;

use breakwater_circuitbreaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};

fn breaker(count: u32, min: u32, rate: f64) -> CircuitBreaker<&'static str> {
    CircuitBreaker::new(
        CircuitBreakerConfig::builder()
            .failure_count_threshold(count)
            .minimum_requests_threshold(min)
            .failure_rate_threshold(rate)
            .open_timeout(Duration::from_secs(60))
            .name("prop")
            .build(),
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(30))]

    /// Property: with a count threshold of 1, the circuit still waits for
    /// the minimum-requests gate before opening.
    #[test]
    fn never_opens_below_the_minimum_request_gate(min in 2u32..=20) {
        let breaker = breaker(1, min, 1.0);

        for _ in 0..min - 1 {
            prop_assert!(breaker.try_acquire().is_ok());
            breaker.record_failure(Duration::from_millis(1));
            prop_assert_eq!(breaker.state(), CircuitState::Closed);
        }

        breaker.try_acquire().unwrap();
        breaker.record_failure(Duration::from_millis(1));
        prop_assert_eq!(breaker.state(), CircuitState::Open);
    }

    /// Property: under pure failure load the circuit opens exactly at the
    /// failure-count threshold and rejects from then on.
    #[test]
    fn opens_exactly_at_the_count_threshold(threshold in 1u32..=20) {
        let breaker = breaker(threshold, threshold, 1.0);

        for n in 1..=threshold {
            prop_assert!(breaker.try_acquire().is_ok(), "rejected before opening at call {}", n);
            breaker.record_failure(Duration::from_millis(1));
            if n < threshold {
                prop_assert_eq!(breaker.state(), CircuitState::Closed);
            }
        }

        prop_assert_eq!(breaker.state(), CircuitState::Open);
        prop_assert!(breaker.try_acquire().is_err());
    }

    /// Property: successes alone never open the circuit, whatever the
    /// thresholds.
    #[test]
    fn successes_alone_never_open(
        count in 1u32..=10,
        min in 1u32..=10,
        calls in 1usize..=100,
    ) {
        let breaker = breaker(count, min, 0.5);

        for _ in 0..calls {
            prop_assert!(breaker.try_acquire().is_ok());
            breaker.record_success(Duration::from_millis(1));
            prop_assert_eq!(breaker.state(), CircuitState::Closed);
        }
    }

    /// Property: driven by an arbitrary outcome sequence, the breaker opens
    /// exactly when a reference model of the OR-threshold rule says it
    /// should, and the window counters stay consistent.
    #[test]
    fn matches_the_threshold_model_on_mixed_outcomes(
        min in 2u32..=10,
        rate in 0.3f64..=0.9,
        outcomes in proptest::collection::vec(any::<bool>(), 1..=60),
    ) {
        // Count threshold out of reach, so only the rate rule can fire.
        let breaker = breaker(u32::MAX, min, rate);

        let mut requests = 0u32;
        let mut failures = 0u32;
        let mut model_open = false;

        for &failed in &outcomes {
            if model_open {
                prop_assert!(breaker.try_acquire().is_err());
                break;
            }

            prop_assert!(breaker.try_acquire().is_ok());
            if failed {
                breaker.record_failure(Duration::from_millis(1));
                failures += 1;
            } else {
                breaker.record_success(Duration::from_millis(1));
            }
            requests += 1;

            if requests >= min && f64::from(failures) / f64::from(requests) >= rate {
                model_open = true;
            }

            let expected = if model_open {
                CircuitState::Open
            } else {
                CircuitState::Closed
            };
            prop_assert_eq!(breaker.state(), expected);

            let metrics = breaker.metrics();
            prop_assert!(metrics.failure_count <= metrics.request_count);
        }
    }
}
