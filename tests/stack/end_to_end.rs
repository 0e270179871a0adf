//! Full pipelines exercised through the public API.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use breakwater::{
    BulkheadConfig, CircuitBreakerConfig, CircuitState, FnListener, GuardEvent, GuardPolicy,
    RateLimiterConfig, ResilienceError, ResilienceStack, RetryConfig, StackEvent,
};

/// A policy carrying all four stages, generous enough that healthy traffic
/// is never refused.
fn full_policy() -> GuardPolicy<&'static str> {
    GuardPolicy::builder()
        .rate_limiter(
            RateLimiterConfig::builder()
                .capacity(1000.0)
                .refill_per_second(1000.0)
                .build(),
        )
        .bulkhead(BulkheadConfig::builder().max_concurrency(8).build())
        .circuit_breaker(
            CircuitBreakerConfig::builder()
                .failure_count_threshold(5)
                .minimum_requests_threshold(5)
                .build(),
        )
        .retry(
            RetryConfig::builder()
                .max_attempts(2)
                .fixed_backoff(Duration::from_millis(5))
                .build(),
        )
        .build()
}

#[tokio::test]
async fn healthy_call_passes_all_four_stages() {
    let stack = ResilienceStack::new(full_policy());
    let out = stack
        .run("payments", || async { Ok::<_, &str>("ok") })
        .await;
    assert_eq!(out.unwrap(), "ok");
}

#[tokio::test]
async fn persistent_failures_open_the_circuit_and_shed_load() {
    let stack = ResilienceStack::new(full_policy());
    let invocations = Arc::new(AtomicUsize::new(0));

    let mut outcomes = Vec::new();
    for _ in 0..4 {
        let calls = Arc::clone(&invocations);
        let result = stack
            .run("payments", move || {
                let calls = Arc::clone(&calls);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err::<(), _>("backend down")
                }
            })
            .await;
        outcomes.push(result.unwrap_err());
    }

    // Two calls exhaust their two attempts each; the fifth attempt trips
    // the breaker mid-sequence, and from then on nothing reaches the
    // operation.
    assert_eq!(invocations.load(Ordering::SeqCst), 5);
    assert!(outcomes[0].is_retries_exhausted());
    assert!(outcomes[1].is_retries_exhausted());
    assert!(outcomes[2].is_circuit_open());
    assert!(outcomes[3].is_circuit_open());
}

#[tokio::test]
async fn fallback_serves_degraded_responses_while_open() {
    let stack = ResilienceStack::new(full_policy());
    stack
        .registry()
        .guards("payments")
        .circuit_breaker()
        .unwrap()
        .force_open();

    let out = stack
        .call("payments")
        .fallback(|err: ResilienceError<&'static str>| async move {
            assert!(err.is_circuit_open());
            Ok("cached balance")
        })
        .run(|| async { Ok::<_, &str>("fresh balance") })
        .await;
    assert_eq!(out.unwrap(), "cached balance");
}

#[tokio::test]
async fn fallback_consumes_retry_exhaustion() {
    let policy: GuardPolicy<&'static str> = GuardPolicy::builder()
        .retry(
            RetryConfig::builder()
                .max_attempts(2)
                .fixed_backoff(Duration::from_millis(1))
                .build(),
        )
        .build();
    let stack = ResilienceStack::new(policy);

    let out = stack
        .call("flaky")
        .fallback(|err: ResilienceError<&'static str>| async move {
            match err {
                ResilienceError::RetriesExhausted { attempts, source } => {
                    assert_eq!(attempts, 2);
                    assert_eq!(source, "still failing");
                    Ok("fallback")
                }
                other => Err(other),
            }
        })
        .run(|| async { Err::<&str, _>("still failing") })
        .await;
    assert_eq!(out.unwrap(), "fallback");
}

#[tokio::test]
async fn circuit_recovers_through_half_open_probes() {
    let policy: GuardPolicy<&'static str> = GuardPolicy::builder()
        .circuit_breaker(
            CircuitBreakerConfig::builder()
                .failure_count_threshold(1)
                .minimum_requests_threshold(1)
                .open_timeout(Duration::from_millis(100))
                .success_threshold(1)
                .build(),
        )
        .build();
    let stack = ResilienceStack::new(policy);

    let _ = stack.run("search", || async { Err::<(), _>("boom") }).await;
    assert!(stack
        .run("search", || async { Ok::<_, &str>(()) })
        .await
        .unwrap_err()
        .is_circuit_open());

    tokio::time::sleep(Duration::from_millis(150)).await;
    stack
        .run("search", || async { Ok::<_, &str>(()) })
        .await
        .unwrap();

    let metrics = stack
        .registry()
        .guards("search")
        .circuit_breaker()
        .unwrap()
        .metrics();
    assert_eq!(metrics.state, CircuitState::Closed);
}

#[tokio::test]
async fn key_classes_route_tenants_to_shared_policies() {
    let strict: GuardPolicy<&'static str> = GuardPolicy::builder()
        .rate_limiter(
            RateLimiterConfig::builder()
                .capacity(1.0)
                .refill_per_second(0.001)
                .build(),
        )
        .build();

    let stack: ResilienceStack<&'static str> = ResilienceStack::builder()
        .class_policy("tenant", strict)
        .key_classifier(|key: &str| key.strip_prefix("tenant:").map(|_| "tenant".to_string()))
        .build();

    stack
        .run("tenant:acme", || async { Ok::<_, &str>(()) })
        .await
        .unwrap();
    assert!(stack
        .run("tenant:acme", || async { Ok::<_, &str>(()) })
        .await
        .unwrap_err()
        .is_rate_limited());

    // A sibling tenant gets its own bucket from the same template.
    stack
        .run("tenant:globex", || async { Ok::<_, &str>(()) })
        .await
        .unwrap();

    // Unclassified keys use the default (empty) policy.
    for _ in 0..5 {
        stack
            .run("internal", || async { Ok::<_, &str>(()) })
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn tower_layer_runs_requests_through_the_stack() {
    use breakwater::ResilienceLayer;
    use tower::{Service, ServiceBuilder, ServiceExt, service_fn};

    let stack: ResilienceStack<&'static str> = ResilienceStack::new(full_policy());
    let mut svc = ServiceBuilder::new()
        .layer(ResilienceLayer::new(stack.clone(), "payments"))
        .service(service_fn(|req: u32| async move {
            Ok::<_, &'static str>(req * 2)
        }));

    let doubled = svc.ready().await.unwrap().call(21).await.unwrap();
    assert_eq!(doubled, 42);

    // The layer shares guard state with the stack it was built from.
    stack
        .registry()
        .guards("payments")
        .circuit_breaker()
        .unwrap()
        .force_open();
    let err = svc.ready().await.unwrap().call(1).await.unwrap_err();
    assert!(err.is_circuit_open());
}

#[tokio::test]
async fn stack_events_describe_the_whole_call() {
    let log = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&log);

    let policy: GuardPolicy<&'static str> = GuardPolicy::builder()
        .rate_limiter(
            RateLimiterConfig::builder()
                .capacity(10.0)
                .refill_per_second(10.0)
                .build(),
        )
        .bulkhead(BulkheadConfig::builder().max_concurrency(2).build())
        .circuit_breaker(
            CircuitBreakerConfig::builder()
                .failure_count_threshold(1)
                .minimum_requests_threshold(1)
                .build(),
        )
        .retry(
            RetryConfig::builder()
                .max_attempts(2)
                .fixed_backoff(Duration::from_millis(5))
                .build(),
        )
        .build();

    let stack: ResilienceStack<&'static str> = ResilienceStack::builder()
        .policy(policy)
        .subscribe(FnListener::new(move |event: &StackEvent| {
            sink.lock().unwrap().push(event.event_type());
        }))
        .build();

    let _ = stack.run("payments", || async { Err::<(), _>("boom") }).await;

    // First attempt trips the breaker, the retry schedules a second attempt,
    // and the breaker gate refuses it.
    assert_eq!(
        *log.lock().unwrap(),
        [
            "guard_admitted",
            "guard_admitted",
            "guard_admitted",
            "circuit_state_changed",
            "retry_attempted",
            "guard_rejected",
        ]
    );
}
