//! Reconnect backoff policy
//!
//! Decides whether a dropped connection is retried and how long to wait.
//! The delay grows linearly with the attempt number; the counter resets on
//! every successful open and on a caller-invoked reconnect.

use std::time::Duration;

/// Linear-backoff reconnect policy with a capped attempt count
#[derive(Debug)]
pub struct ReconnectPolicy {
    attempts: u32,
    max_attempts: u32,
    base_delay: Duration,
}

impl ReconnectPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            attempts: 0,
            max_attempts,
            base_delay,
        }
    }

    /// Claim the next retry slot
    ///
    /// Returns the delay before the next open attempt, or None once the
    /// configured maximum is exhausted. Each call increments the counter.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.attempts >= self.max_attempts {
            return None;
        }
        self.attempts += 1;
        Some(self.base_delay * self.attempts)
    }

    /// Reset the attempt counter (successful open or manual reconnect)
    pub fn reset(&mut self) {
        self.attempts = 0;
    }

    /// Attempts consumed since the last reset
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}
