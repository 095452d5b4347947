//! Retry and settle timing for the write-confirm engine.
//!
//! The controller needs a short settle time after each write before it
//! reports the new state, and it occasionally drops frames altogether. The
//! engine therefore re-writes a bounded number of times and polls for
//! confirmation in between. All of those waits are empirical device timings,
//! collected here so they can be tuned from config and zeroed in tests.

use std::time::Duration;

/// Timing and attempt budget for one modify operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Wait before the first write.
    pub settle: Duration,
    /// Wait before every later write.
    pub retry_settle: Duration,
    /// Wait before each confirmation read.
    pub poll: Duration,
    /// Extra wait between two confirmation reads.
    pub poll_retry: Duration,
    /// Wait after a confirmed write, before the bus is handed to the next
    /// operation. The controller needs about 2 ms after a confirmed change
    /// before it accepts the next modification.
    pub post_confirm: Duration,
    /// Write attempts, and confirmation reads per attempt.
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            settle: Duration::from_micros(500),
            retry_settle: Duration::from_millis(3),
            poll: Duration::from_millis(2),
            poll_retry: Duration::from_millis(3),
            post_confirm: Duration::from_millis(2),
            max_attempts: 5,
        }
    }
}

impl RetryPolicy {
    /// No waits at all, same attempt budget. For tests and simulated buses.
    pub fn immediate() -> Self {
        Self {
            settle: Duration::ZERO,
            retry_settle: Duration::ZERO,
            poll: Duration::ZERO,
            poll_retry: Duration::ZERO,
            post_confirm: Duration::ZERO,
            max_attempts: RetryPolicy::default().max_attempts,
        }
    }

    /// Wait before write number `attempt` (0-based).
    pub fn settle_before(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            self.settle
        } else {
            self.retry_settle
        }
    }

    /// Upper bound on the time one failing modify operation spends sleeping.
    pub fn worst_case(&self) -> Duration {
        let Some(later) = self.max_attempts.checked_sub(1) else {
            return Duration::ZERO;
        };
        let per_attempt = self.poll * self.max_attempts + self.poll_retry * later;
        per_attempt * self.max_attempts + self.settle + self.retry_settle * later
    }
}

/// Sleep for `d`, skipping the syscall for zero durations.
pub(crate) fn pause(d: Duration) {
    if !d.is_zero() {
        std::thread::sleep(d);
    }
}
