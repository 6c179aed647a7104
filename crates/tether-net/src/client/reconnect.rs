//! Fixed-delay reconnect policy.

use std::time::Duration;

/// What to do after a cycle ended without a surviving session.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ReconnectDecision {
    /// Wait this long, then try again.
    Retry(Duration),
    /// The attempt budget is spent.
    Exhausted {
        /// Attempts counted so far.
        attempts: u32,
    },
}

/// Counts consecutive failed or terminated cycles.
///
/// The counter is reset whenever a session reaches `Connected`, and bumped
/// once per trip through `Closing`. With `max == 0` it never exhausts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReconnectCounter {
    attempts: u32,
    max: u32,
    delay: Duration,
}

impl ReconnectCounter {
    /// Create a counter. `max == 0` means unbounded.
    pub fn new(max: u32, delay: Duration) -> Self {
        Self {
            attempts: 0,
            max,
            delay,
        }
    }

    /// Attempts counted since the last reset.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// The configured ceiling (0 = unbounded).
    pub fn max(&self) -> u32 {
        self.max
    }

    /// The fixed delay between cycles.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Whether the counter can never exhaust.
    pub fn is_unbounded(&self) -> bool {
        self.max == 0
    }

    /// Clear the count after a successful upgrade.
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    /// Count one more attempt and decide whether to continue.
    pub fn record_failure(&mut self) -> ReconnectDecision {
        self.attempts = self.attempts.saturating_add(1);
        if self.max > 0 && self.attempts >= self.max {
            ReconnectDecision::Exhausted {
                attempts: self.attempts,
            }
        } else {
            ReconnectDecision::Retry(self.delay)
        }
    }
}
