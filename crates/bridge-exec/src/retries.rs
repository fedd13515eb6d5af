//! Bounded retry counters.

/// Counts how many times a condition was checked without success.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryCounter {
    count: u64,
    max: u64,
}

impl RetryCounter {
    /// A counter allowing `max` checks.
    pub const fn new(max: u64) -> Self {
        Self { count: 0, max }
    }

    /// Counts one more check. Returns `true` once `max` checks were already counted.
    pub fn process(&mut self) -> bool {
        if self.count < self.max {
            self.count += 1;
            return false;
        }

        true
    }

    /// Grants the full budget again.
    pub fn reset(&mut self) {
        self.count = 0;
    }

    /// Checks counted since the last reset.
    pub const fn count(&self) -> u64 {
        self.count
    }
}

/// The counters an executor keeps, one per thing it waits on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RetryCounters {
    /// Quorum checks on Chain-A.
    pub on_a: RetryCounter,

    /// Quorum checks on Chain-B.
    pub on_b: RetryCounter,

    /// Status proposal checks on Chain-B.
    pub on_was_proposed: RetryCounter,
}

impl RetryCounters {
    /// Resets every counter.
    pub fn reset_all(&mut self) {
        self.on_a.reset();
        self.on_b.reset();
        self.on_was_proposed.reset();
    }
}
