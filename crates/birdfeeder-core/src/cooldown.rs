//! # Cooldown Module
//!
//! Minimum spacing between repeated actions (disk writes, alerts).
//!
//! A cooldown is armed when created: the first action is only allowed once
//! a full period has passed since start-up. Time is always supplied by the
//! caller so behaviour is reproducible in tests.

use std::time::{Duration, Instant};

/// Spacing guard for a repeated action.
#[derive(Debug, Clone, Copy)]
pub struct Cooldown {
    period: Duration,
    last: Instant,
}

impl Cooldown {
    /// Create a cooldown armed at `start`.
    #[must_use]
    pub fn new(period: Duration, start: Instant) -> Self {
        Self {
            period,
            last: start,
        }
    }

    #[must_use]
    pub fn period(&self) -> Duration {
        self.period
    }

    /// True when strictly more than one period has passed since the last firing.
    #[must_use]
    pub fn ready(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.last) > self.period
    }

    /// Fire if ready. Returns whether the action may proceed.
    pub fn try_fire(&mut self, now: Instant) -> bool {
        if self.ready(now) {
            self.last = now;
            true
        } else {
            false
        }
    }

    /// Time left until the next firing is allowed.
    #[must_use]
    pub fn remaining(&self, now: Instant) -> Duration {
        let elapsed = now.saturating_duration_since(self.last);
        self.period.saturating_sub(elapsed)
    }
}
