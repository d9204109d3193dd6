//! Deletion confirmation countdown.
//!
//! Destructive store deletion is gated behind a 5 second countdown: the
//! confirm action stays disabled until the full delay has elapsed.

use std::time::{Duration, Instant};

/// Delay before a store deletion can be confirmed.
pub const STORE_DELETE_DELAY: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy)]
pub struct DeleteCountdown {
    armed_at: Instant,
    delay: Duration,
}

impl DeleteCountdown {
    /// Arm the standard 5 second countdown.
    pub fn arm() -> Self {
        Self::with_delay(STORE_DELETE_DELAY)
    }

    pub fn with_delay(delay: Duration) -> Self {
        Self {
            armed_at: Instant::now(),
            delay,
        }
    }

    /// Whether confirmation is enabled at `now`.
    pub fn is_ready_at(&self, now: Instant) -> bool {
        now.duration_since(self.armed_at) >= self.delay
    }

    pub fn is_ready(&self) -> bool {
        self.is_ready_at(Instant::now())
    }

    /// Time left before confirmation unlocks, zero once elapsed.
    pub fn remaining_at(&self, now: Instant) -> Duration {
        self.delay
            .saturating_sub(now.duration_since(self.armed_at))
    }

    pub fn remaining(&self) -> Duration {
        self.remaining_at(Instant::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn disabled_at_zero_enabled_at_five_seconds() {
        let countdown = DeleteCountdown::arm();
        let t0 = countdown.armed_at;

        assert!(!countdown.is_ready_at(t0));
        assert!(!countdown.is_ready_at(t0 + Duration::from_millis(4999)));
        assert!(countdown.is_ready_at(t0 + Duration::from_millis(5000)));
        assert!(countdown.is_ready_at(t0 + Duration::from_secs(60)));
    }

    #[test]
    fn remaining_counts_down_to_zero() {
        let countdown = DeleteCountdown::arm();
        let t0 = countdown.armed_at;

        assert_eq!(countdown.remaining_at(t0), Duration::from_secs(5));
        assert_eq!(
            countdown.remaining_at(t0 + Duration::from_secs(2)),
            Duration::from_secs(3)
        );
        assert_eq!(countdown.remaining_at(t0 + Duration::from_secs(9)), Duration::ZERO);
    }
}
