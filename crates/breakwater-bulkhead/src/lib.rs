//! Concurrency bulkhead guard.
//!
//! A [`Bulkhead`] bounds how many executions may be in flight against one
//! dependency at a time, so saturation of that dependency cannot starve the
//! rest of the process. Each admitted call holds a [`BulkheadPermit`]; the
//! slot is returned when the permit drops, which makes release exactly-once
//! even through failures, panics, and cancellation.
//!
//! # Example
//!
//! ```rust
//! use breakwater_bulkhead::{Bulkhead, BulkheadConfig};
//!
//! # async fn example() -> Result<(), breakwater_bulkhead::BulkheadError> {
//! let bulkhead = Bulkhead::new(
//!     BulkheadConfig::builder()
//!         .max_concurrency(5)
//!         .name("reporting-db")
//!         .build(),
//! );
//!
//! let permit = bulkhead.acquire().await?;
//! // ... perform the guarded call ...
//! drop(permit); // slot released
//! # Ok(())
//! # }
//! ```
//!
//! # Waiting
//!
//! By default `acquire` is an immediate accept/reject decision. Configuring
//! `queue_capacity` lets that many callers wait for a slot, optionally
//! bounded by `acquire_timeout`:
//!
//! ```rust
//! use breakwater_bulkhead::BulkheadConfig;
//! use std::time::Duration;
//!
//! let config = BulkheadConfig::builder()
//!     .max_concurrency(10)
//!     .queue_capacity(20)
//!     .acquire_timeout(Duration::from_millis(250))
//!     .build();
//! ```
//!
//! A caller whose wait lapses gets [`BulkheadError::Timeout`]; a caller that
//! cannot even enter the queue gets [`BulkheadError::Full`] immediately.

mod bulkhead;
pub mod config;
pub mod error;
pub mod events;

pub use bulkhead::{Bulkhead, BulkheadPermit, BulkheadSnapshot};
pub use config::{BulkheadConfig, BulkheadConfigBuilder};
pub use error::BulkheadError;
pub use events::{BulkheadEvent, RejectReason};
