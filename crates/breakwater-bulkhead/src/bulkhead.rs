//! Bulkhead guard implementation.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use tokio::sync::{OwnedSemaphorePermit, Semaphore, TryAcquireError};

use crate::config::BulkheadConfig;
use crate::error::BulkheadError;
use crate::events::{BulkheadEvent, RejectReason};

/// Point-in-time view of bulkhead occupancy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct BulkheadSnapshot {
    /// In-flight executions.
    pub active: usize,
    /// Callers waiting in the bounded queue.
    pub queued: usize,
    /// Configured concurrency limit.
    pub max_concurrency: usize,
    /// Configured queue bound, if any.
    pub queue_capacity: Option<usize>,
}

/// Decrements the queued counter when a waiting caller leaves the queue,
/// whether it was admitted, timed out, or was cancelled mid-wait.
struct QueueGuard<'a> {
    queued: &'a AtomicUsize,
}

impl Drop for QueueGuard<'_> {
    fn drop(&mut self) {
        self.queued.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Bulkhead guard bounding concurrent in-flight executions.
///
/// A slot is represented by a [`BulkheadPermit`]; dropping the permit
/// releases the slot, so release happens exactly once regardless of how the
/// protected call ends (success, failure, panic unwind, or cancellation).
/// Cloning shares the same slots.
#[derive(Clone)]
pub struct Bulkhead {
    semaphore: Arc<Semaphore>,
    queued: Arc<AtomicUsize>,
    config: Arc<BulkheadConfig>,
}

impl Bulkhead {
    /// Builds a bulkhead from a validated config.
    pub fn new(config: BulkheadConfig) -> Self {
        let semaphore = Arc::new(Semaphore::new(config.max_concurrency));
        Self {
            semaphore,
            queued: Arc::new(AtomicUsize::new(0)),
            config: Arc::new(config),
        }
    }

    /// Builds a bulkhead for a specific key from a shared config template,
    /// overriding the configured name with the key.
    pub fn for_key(config: &BulkheadConfig, key: &str) -> Self {
        let mut config = config.clone();
        config.name = key.to_string();
        Self::new(config)
    }

    /// Acquires a concurrency slot.
    ///
    /// Without a configured queue this is an immediate accept/reject
    /// decision. With `queue_capacity` set, up to that many callers wait for
    /// a slot (bounded by `acquire_timeout` when configured); a caller that
    /// cannot even enter the queue is rejected immediately.
    pub async fn acquire(&self) -> crate::error::Result<BulkheadPermit> {
        match Arc::clone(&self.semaphore).try_acquire_owned() {
            Ok(permit) => Ok(self.grant(permit)),
            Err(TryAcquireError::Closed) => Err(self.reject(RejectReason::Saturated)),
            Err(TryAcquireError::NoPermits) => {
                let Some(queue_capacity) = self.config.queue_capacity else {
                    return Err(self.reject(RejectReason::Saturated));
                };

                if self.queued.fetch_add(1, Ordering::SeqCst) >= queue_capacity {
                    self.queued.fetch_sub(1, Ordering::SeqCst);
                    return Err(self.reject(RejectReason::QueueFull));
                }
                let _slot = QueueGuard {
                    queued: &self.queued,
                };

                match self.config.acquire_timeout {
                    Some(wait) => {
                        match tokio::time::timeout(
                            wait,
                            Arc::clone(&self.semaphore).acquire_owned(),
                        )
                        .await
                        {
                            Ok(Ok(permit)) => Ok(self.grant(permit)),
                            Ok(Err(_)) => Err(self.reject(RejectReason::Saturated)),
                            Err(_) => Err(self.reject(RejectReason::WaitTimeout)),
                        }
                    }
                    None => match Arc::clone(&self.semaphore).acquire_owned().await {
                        Ok(permit) => Ok(self.grant(permit)),
                        Err(_) => Err(self.reject(RejectReason::Saturated)),
                    },
                }
            }
        }
    }

    fn grant(&self, permit: OwnedSemaphorePermit) -> BulkheadPermit {
        let active = self.active_count();

        #[cfg(feature = "metrics")]
        {
            metrics::counter!(
                "breakwater_bulkhead_permitted_total",
                "bulkhead" => self.config.name.clone()
            )
            .increment(1);
            metrics::gauge!(
                "breakwater_bulkhead_active",
                "bulkhead" => self.config.name.clone()
            )
            .set(active as f64);
        }

        self.config
            .event_listeners
            .emit(&BulkheadEvent::CallPermitted {
                key: self.config.name.clone(),
                timestamp: Instant::now(),
                active,
            });

        BulkheadPermit {
            _permit: permit,
            semaphore: Arc::clone(&self.semaphore),
            config: Arc::clone(&self.config),
            acquired_at: Instant::now(),
        }
    }

    fn reject(&self, reason: RejectReason) -> BulkheadError {
        let active = self.active_count();

        #[cfg(feature = "tracing")]
        tracing::debug!(
            name = %self.config.name,
            ?reason,
            active,
            "bulkhead rejected call"
        );
        #[cfg(feature = "metrics")]
        metrics::counter!(
            "breakwater_bulkhead_rejected_total",
            "bulkhead" => self.config.name.clone()
        )
        .increment(1);

        self.config
            .event_listeners
            .emit(&BulkheadEvent::CallRejected {
                key: self.config.name.clone(),
                timestamp: Instant::now(),
                active,
                reason,
            });

        match reason {
            RejectReason::WaitTimeout => BulkheadError::Timeout {
                limit: self.config.max_concurrency,
            },
            RejectReason::Saturated | RejectReason::QueueFull => BulkheadError::Full {
                active,
                limit: self.config.max_concurrency,
            },
        }
    }

    /// Number of executions currently holding a slot.
    pub fn active_count(&self) -> usize {
        self.config.max_concurrency - self.semaphore.available_permits()
    }

    /// Number of callers currently waiting in the queue.
    pub fn queued_count(&self) -> usize {
        self.queued.load(Ordering::SeqCst)
    }

    /// Current occupancy.
    pub fn snapshot(&self) -> BulkheadSnapshot {
        BulkheadSnapshot {
            active: self.active_count(),
            queued: self.queued_count(),
            max_concurrency: self.config.max_concurrency,
            queue_capacity: self.config.queue_capacity,
        }
    }

    /// Configured name (the guarded key, when registry-managed).
    pub fn name(&self) -> &str {
        &self.config.name
    }
}

/// RAII concurrency slot. The slot is released exactly once, when the permit
/// drops.
pub struct BulkheadPermit {
    _permit: OwnedSemaphorePermit,
    semaphore: Arc<Semaphore>,
    config: Arc<BulkheadConfig>,
    acquired_at: Instant,
}

impl BulkheadPermit {
    /// Releases the slot explicitly. Equivalent to dropping the permit.
    pub fn release(self) {}
}

impl std::fmt::Debug for BulkheadPermit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BulkheadPermit")
            .field("bulkhead", &self.config.name)
            .field("acquired_at", &self.acquired_at)
            .finish_non_exhaustive()
    }
}

impl Drop for BulkheadPermit {
    fn drop(&mut self) {
        let held = self.acquired_at.elapsed();
        // The inner semaphore permit drops after this body runs, so the
        // count here still includes this slot.
        let active = (self.config.max_concurrency - self.semaphore.available_permits())
            .saturating_sub(1);

        #[cfg(feature = "metrics")]
        metrics::gauge!(
            "breakwater_bulkhead_active",
            "bulkhead" => self.config.name.clone()
        )
        .set(active as f64);

        self.config
            .event_listeners
            .emit(&BulkheadEvent::PermitReleased {
                key: self.config.name.clone(),
                timestamp: Instant::now(),
                held,
                active,
            });
    }
}
