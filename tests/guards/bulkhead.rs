//! Bulkhead queue timing against the wall clock.

use std::sync::Arc;
use std::time::{Duration, Instant};

use breakwater_bulkhead::{Bulkhead, BulkheadConfig, BulkheadError};

#[tokio::test]
async fn queue_timeout_rejects_after_the_configured_wait() {
    let bulkhead = Bulkhead::new(
        BulkheadConfig::builder()
            .max_concurrency(1)
            .queue_capacity(1)
            .acquire_timeout(Duration::from_millis(100))
            .build(),
    );

    let held = bulkhead.acquire().await.unwrap();

    let started = Instant::now();
    let err = bulkhead.acquire().await.unwrap_err();
    assert!(matches!(err, BulkheadError::Timeout { .. }));
    assert!(started.elapsed() >= Duration::from_millis(100));

    held.release();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn queued_caller_is_admitted_when_a_slot_frees() {
    let bulkhead = Arc::new(
        Bulkhead::new(
            BulkheadConfig::builder()
                .max_concurrency(1)
                .queue_capacity(1)
                .acquire_timeout(Duration::from_secs(5))
                .build(),
        ),
    );

    let held = bulkhead.acquire().await.unwrap();

    let waiter = {
        let bulkhead = Arc::clone(&bulkhead);
        tokio::spawn(async move {
            let permit = bulkhead.acquire().await.unwrap();
            permit.release();
        })
    };

    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(bulkhead.queued_count(), 1);

    held.release();
    waiter.await.unwrap();
    assert_eq!(bulkhead.active_count(), 0);
    assert_eq!(bulkhead.queued_count(), 0);
}

#[tokio::test]
async fn dropping_a_permit_releases_the_slot() {
    let bulkhead = Bulkhead::new(BulkheadConfig::builder().max_concurrency(1).build());

    let permit = bulkhead.acquire().await.unwrap();
    assert!(bulkhead.acquire().await.is_err());

    drop(permit);
    let second = bulkhead.acquire().await.unwrap();
    second.release();
}
