//! Monotonic milliseconds source for alert bookkeeping.

use std::time::Instant;

/// Source of monotonic time.
pub trait Clock: Send + Sync {
    /// Current monotonic time in milliseconds.
    fn now_ms(&self) -> u64;
}

/// Clock backed by [`Instant`], counting milliseconds since construction.
#[derive(Debug, Clone, Copy)]
pub struct MonotonicClock {
    start: Instant,
}

impl MonotonicClock {
    /// Create a clock starting at zero now.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> u64 {
        u64::try_from(self.start.elapsed().as_millis()).unwrap_or(u64::MAX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_monotonic_clock_starts_near_zero() {
        let clock = MonotonicClock::new();
        let first: u64 = clock.now_ms();
        let second: u64 = clock.now_ms();
        assert!(first <= 1_000);
        assert!(second >= first);
    }

    #[test]
    fn test_monotonic_clock_resolves_below_a_second() {
        let clock = MonotonicClock::new();
        let before: u64 = clock.now_ms();
        std::thread::sleep(Duration::from_millis(20));
        assert!(clock.now_ms() >= before + 20);
    }
}
