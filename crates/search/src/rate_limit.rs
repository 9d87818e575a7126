//! Call budgets for the upstream search API.
//!
//! One [`RateLimiter`] instance exists per upstream API and is injected
//! into whatever composes the gateway; there is no ambient global state.

use chrono::{DateTime, Datelike, Utc};
use parking_lot::Mutex;
use std::time::{Duration, Instant};
use thiserror::Error;

const WINDOW: Duration = Duration::from_millis(1000);

/// Per-second and per-period call budgets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateBudget {
    pub per_second: u32,
    pub per_period: u32,
}

impl Default for RateBudget {
    fn default() -> Self {
        Self {
            per_second: 1,
            per_period: 15_000,
        }
    }
}

#[derive(Debug, Error)]
#[error("rate limit exceeded")]
pub struct RateLimitError;

#[derive(Debug)]
struct RateLimitState {
    window_start: Instant,
    count_in_window: u32,
    /// UTC (year, month) the period counter belongs to. The counter resets
    /// when the calendar month changes.
    period: (i32, u32),
    count_in_period: u32,
}

/// Tracks call admissions against a [`RateBudget`].
///
/// `admit()` is a single check-and-increment critical section, so
/// concurrent admissions from parallel tool calls cannot race past a
/// budget. Rejection is immediate; there is no queuing or backoff.
#[derive(Debug)]
pub struct RateLimiter {
    budget: RateBudget,
    state: Mutex<RateLimitState>,
}

impl RateLimiter {
    #[must_use]
    pub fn new(budget: RateBudget) -> Self {
        Self {
            budget,
            state: Mutex::new(RateLimitState {
                window_start: Instant::now(),
                count_in_window: 0,
                period: period_key(Utc::now()),
                count_in_period: 0,
            }),
        }
    }

    /// Admit one upstream call, or reject it when either budget is spent.
    ///
    /// The 1-second window counter resets once more than a second has
    /// elapsed since the window started; the period counter resets at the
    /// UTC calendar-month boundary.
    ///
    /// # Errors
    ///
    /// Returns [`RateLimitError`] when the window or period budget is
    /// already exhausted. The call counters are only incremented on
    /// successful admission.
    pub fn admit(&self) -> Result<(), RateLimitError> {
        self.admit_at(Instant::now(), Utc::now())
    }

    fn admit_at(&self, now: Instant, today: DateTime<Utc>) -> Result<(), RateLimitError> {
        let mut state = self.state.lock();

        if now.saturating_duration_since(state.window_start) > WINDOW {
            state.count_in_window = 0;
            state.window_start = now;
        }
        let period = period_key(today);
        if period != state.period {
            state.count_in_period = 0;
            state.period = period;
        }

        if state.count_in_window >= self.budget.per_second
            || state.count_in_period >= self.budget.per_period
        {
            return Err(RateLimitError);
        }
        state.count_in_window += 1;
        state.count_in_period += 1;
        Ok(())
    }
}

fn period_key(at: DateTime<Utc>) -> (i32, u32) {
    (at.year(), at.month())
}
