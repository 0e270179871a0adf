//! Core infrastructure shared by the breakwater guard crates.
//!
//! This crate provides the pieces every guard needs and nothing else:
//! - [`ResilienceError`], the unified error taxonomy for composed stacks
//! - [`GuardEvent`] / [`EventListeners`], the event plumbing guards emit
//!   observability events through
//!
//! Guard crates (`breakwater-ratelimiter`, `breakwater-bulkhead`,
//! `breakwater-circuitbreaker`, `breakwater-retry`) depend on this crate;
//! applications usually depend on the `breakwater` umbrella instead.

pub mod error;
pub mod events;

pub use error::ResilienceError;
pub use events::{EventListener, EventListeners, FnListener, GuardEvent, SharedEventListener};
