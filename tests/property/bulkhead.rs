//! Property tests for the bulkhead.
//!
//! Invariants tested:
//! - Active count never exceeds max_concurrency
//! - Every release frees exactly one slot
//! - Rejections carry no hidden side effect on occupancy

use proptest::prelude::*;
use tokio::runtime::Runtime;

use breakwater_bulkhead::{Bulkhead, BulkheadConfig};

fn bulkhead(max: usize) -> Bulkhead {
    Bulkhead::new(
        BulkheadConfig::builder()
            .max_concurrency(max)
            .name("prop")
            .build(),
    )
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(30))]

    /// Property: without a queue, exactly min(demand, limit) acquires
    /// succeed and the active count never exceeds the limit.
    #[test]
    fn holders_never_exceed_the_limit(
        max in 1usize..=16,
        demand in 1usize..=64,
    ) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let bh = bulkhead(max);

            let mut permits = Vec::new();
            let mut rejected = 0usize;
            for _ in 0..demand {
                match bh.acquire().await {
                    Ok(permit) => permits.push(permit),
                    Err(_) => rejected += 1,
                }
                prop_assert!(bh.active_count() <= max);
            }

            prop_assert_eq!(permits.len(), demand.min(max));
            prop_assert_eq!(rejected, demand.saturating_sub(max));
            Ok(())
        })?;
    }

    /// Property: dropping k permits admits exactly k more callers.
    #[test]
    fn every_release_frees_exactly_one_slot(
        max in 1usize..=16,
        released in 0usize..=16,
    ) {
        let released = released.min(max);
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let bh = bulkhead(max);

            let mut permits = Vec::new();
            for _ in 0..max {
                permits.push(bh.acquire().await.unwrap());
            }
            prop_assert!(bh.acquire().await.is_err());

            for _ in 0..released {
                drop(permits.pop().unwrap());
            }
            prop_assert_eq!(bh.active_count(), max - released);

            for _ in 0..released {
                permits.push(bh.acquire().await.unwrap());
            }
            prop_assert!(bh.acquire().await.is_err());
            prop_assert_eq!(bh.active_count(), max);
            Ok(())
        })?;
    }

    /// Property: a saturated bulkhead rejects any number of callers without
    /// disturbing the holders' slots.
    #[test]
    fn rejections_leave_occupancy_untouched(
        max in 1usize..=8,
        rejected_calls in 1usize..=50,
    ) {
        let rt = Runtime::new().unwrap();
        rt.block_on(async {
            let bh = bulkhead(max);

            let mut permits = Vec::new();
            for _ in 0..max {
                permits.push(bh.acquire().await.unwrap());
            }

            for _ in 0..rejected_calls {
                prop_assert!(bh.acquire().await.is_err());
                prop_assert_eq!(bh.active_count(), max);
                prop_assert_eq!(bh.queued_count(), 0);
            }

            drop(permits);
            prop_assert_eq!(bh.active_count(), 0);
            Ok(())
        })?;
    }
}
