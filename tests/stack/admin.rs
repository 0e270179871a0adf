//! Administrative reset behavior.
//!
//! Resetting a key swaps in fresh guards rather than rewinding the old
//! ones: calls already in flight finish against the guards they started
//! with, and the next call for the key starts from a clean slate.

use std::sync::Arc;
use std::time::Duration;

use breakwater::{
    BulkheadConfig, CircuitBreakerConfig, GuardPolicy, RateLimiterConfig, ResilienceStack,
};

#[tokio::test]
async fn reset_key_returns_every_guard_to_its_initial_state() {
    let policy: GuardPolicy<&'static str> = GuardPolicy::builder()
        .rate_limiter(
            RateLimiterConfig::builder()
                .capacity(2.0)
                .refill_per_second(0.001)
                .build(),
        )
        .circuit_breaker(
            CircuitBreakerConfig::builder()
                .failure_count_threshold(1)
                .minimum_requests_threshold(1)
                .build(),
        )
        .build();
    let stack = ResilienceStack::new(policy);

    // One failure opens the circuit and drains a token.
    let _ = stack
        .run("payments", || async { Err::<(), _>("boom") })
        .await;
    assert!(stack
        .run("payments", || async { Ok::<_, &str>(()) })
        .await
        .unwrap_err()
        .is_circuit_open());

    assert!(stack.registry().reset_key("payments"));

    // Fresh guards: closed circuit and a full bucket of two tokens.
    stack
        .run("payments", || async { Ok::<_, &str>(()) })
        .await
        .unwrap();
    stack
        .run("payments", || async { Ok::<_, &str>(()) })
        .await
        .unwrap();
    assert!(stack
        .run("payments", || async { Ok::<_, &str>(()) })
        .await
        .unwrap_err()
        .is_rate_limited());
}

#[tokio::test]
async fn reset_all_forgets_every_key() {
    let stack: ResilienceStack<&'static str> = ResilienceStack::new(
        GuardPolicy::builder()
            .rate_limiter(
                RateLimiterConfig::builder()
                    .capacity(1.0)
                    .refill_per_second(0.001)
                    .build(),
            )
            .build(),
    );

    for key in ["a", "b", "c"] {
        stack.run(key, || async { Ok::<_, &str>(()) }).await.unwrap();
    }
    assert_eq!(stack.registry().len(), 3);

    stack.registry().reset_all();
    assert!(stack.registry().is_empty());

    // Buckets are full again after the wipe.
    for key in ["a", "b", "c"] {
        stack.run(key, || async { Ok::<_, &str>(()) }).await.unwrap();
    }
}

#[tokio::test]
async fn in_flight_calls_finish_against_the_retired_guards() {
    let stack: ResilienceStack<&'static str> = ResilienceStack::new(
        GuardPolicy::builder()
            .bulkhead(BulkheadConfig::builder().max_concurrency(1).build())
            .build(),
    );

    let gate = Arc::new(tokio::sync::Notify::new());
    let release = Arc::clone(&gate);
    let occupant = {
        let stack = stack.clone();
        tokio::spawn(async move {
            stack
                .run("db", move || {
                    let gate = Arc::clone(&gate);
                    async move {
                        gate.notified().await;
                        Ok::<_, &str>("finished")
                    }
                })
                .await
        })
    };
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert!(stack.registry().reset_key("db"));

    // The replacement bulkhead starts empty even though the old slot is
    // still held, so new calls are admitted immediately.
    let snapshot = stack.registry().guards("db").bulkhead().unwrap().snapshot();
    assert_eq!(snapshot.active, 0);
    stack.run("db", || async { Ok::<_, &str>(()) }).await.unwrap();

    // The in-flight call still completes normally on the retired guards.
    release.notify_one();
    assert_eq!(occupant.await.unwrap().unwrap(), "finished");
}
