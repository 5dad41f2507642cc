// src/engine/ratelimit.rs

//! Fixed-window admission control.
//!
//! A burst of change events (an editor saving a file and then formatting it
//! produces several writes for one logical save) must not turn into a burst
//! of command runs. The limiter grants up to `limit` units per wall-clock
//! `interval` and resets wholesale at window boundaries. A burst arriving
//! right at the start of a fresh window is fully admitted even when the
//! previous window was exhausted; that boundary behavior is a deliberate
//! simplicity/latency tradeoff.

use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateLimitError {
    /// The requested lease can never be granted; a caller bug, not a
    /// runtime condition.
    #[error("impossible lease requested: {requested} > {limit}")]
    ImpossibleLease { requested: u32, limit: u32 },

    /// The current window's budget is exhausted; the triggering event is
    /// dropped, not retried.
    #[error("rate limit exceeded")]
    Exceeded,
}

pub struct RateLimiter {
    limit: u32,
    interval: Duration,
    remaining: u32,
    window_start: Instant,
}

impl RateLimiter {
    pub fn new(limit: u32, interval: Duration) -> Self {
        Self {
            limit,
            interval,
            remaining: limit,
            window_start: Instant::now(),
        }
    }

    /// Try to take `n` units from the current window's budget.
    pub fn lease(&mut self, n: u32) -> Result<u32, RateLimitError> {
        self.lease_at(n, Instant::now())
    }

    /// Window arithmetic with an explicit clock, so tests can drive it.
    pub fn lease_at(&mut self, n: u32, now: Instant) -> Result<u32, RateLimitError> {
        if n > self.limit {
            return Err(RateLimitError::ImpossibleLease {
                requested: n,
                limit: self.limit,
            });
        }

        if now.duration_since(self.window_start) >= self.interval {
            self.remaining = self.limit;
            self.window_start = now;
        }

        if self.remaining < n {
            return Err(RateLimitError::Exceeded);
        }

        self.remaining -= n;
        Ok(n)
    }
}
