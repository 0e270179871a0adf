//! Backoff schedules for the retry executor.
//!
//! An [`IntervalFunction`] maps a failed attempt number to the delay to wait
//! before the next attempt. [`ExponentialBackoff`] is the default schedule;
//! [`FixedInterval`] and [`FnInterval`] cover constant and custom curves.

use std::time::Duration;

/// Computes the delay between retry attempts.
pub trait IntervalFunction: Send + Sync {
    /// Returns the delay to wait after attempt `attempt` fails.
    ///
    /// Attempts are numbered from 1, so the delay before the first retry is
    /// `next_interval(1)`.
    fn next_interval(&self, attempt: usize) -> Duration;
}

/// The same delay between every attempt.
#[derive(Debug, Clone, Copy)]
pub struct FixedInterval {
    interval: Duration,
}

impl FixedInterval {
    /// Creates a fixed-interval schedule.
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }
}

impl IntervalFunction for FixedInterval {
    fn next_interval(&self, _attempt: usize) -> Duration {
        self.interval
    }
}

/// Exponentially growing delays.
///
/// The delay after attempt `n` fails is `initial_delay × multiplier^(n-1)`,
/// capped at `max_delay` when one is set.
#[derive(Debug, Clone, Copy)]
pub struct ExponentialBackoff {
    initial_delay: Duration,
    multiplier: f64,
    max_delay: Option<Duration>,
}

impl ExponentialBackoff {
    /// Creates an exponential schedule starting at `initial_delay`, doubling
    /// after each attempt with no cap.
    pub fn new(initial_delay: Duration) -> Self {
        Self {
            initial_delay,
            multiplier: 2.0,
            max_delay: None,
        }
    }

    /// Sets the growth factor applied after each attempt.
    ///
    /// Default: 2.0
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = multiplier;
        self
    }

    /// Caps every computed delay at `max_delay`.
    pub fn max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }
}

impl IntervalFunction for ExponentialBackoff {
    fn next_interval(&self, attempt: usize) -> Duration {
        let exponent = attempt.saturating_sub(1) as i32;
        let secs = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        // The curve outgrows Duration quickly at high attempt counts; clamp
        // instead of panicking so an uncapped schedule stays total.
        let delay = Duration::try_from_secs_f64(secs).unwrap_or(Duration::MAX);
        match self.max_delay {
            Some(max) => delay.min(max),
            None => delay,
        }
    }
}

/// Adapter turning a closure into an [`IntervalFunction`].
pub struct FnInterval<F> {
    f: F,
}

impl<F> FnInterval<F>
where
    F: Fn(usize) -> Duration + Send + Sync,
{
    /// Wraps a closure mapping a failed attempt number to a delay.
    pub fn new(f: F) -> Self {
        Self { f }
    }
}

impl<F> IntervalFunction for FnInterval<F>
where
    F: Fn(usize) -> Duration + Send + Sync,
{
    fn next_interval(&self, attempt: usize) -> Duration {
        (self.f)(attempt)
    }
}

/// Perturbs a delay to a uniformly random value in `[delay/2, delay]`.
///
/// Spreads out the retries of many callers that failed at the same moment so
/// they do not re-converge on the recovering dependency in lockstep.
pub(crate) fn apply_jitter(delay: Duration) -> Duration {
    delay.mul_f64(0.5 + fastrand::f64() / 2.0)
}
