/// Consecutive rejected verifications since the last success or lockout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttemptCounter {
    count: u32,
    max: u32,
}

impl AttemptCounter {
    /// A counter that is exhausted after `max` failures.
    #[must_use]
    pub const fn new(max: u32) -> Self {
        Self { count: 0, max }
    }

    /// Records one failure and returns how many attempts remain.
    pub fn record_failure(&mut self) -> u32 {
        self.count = (self.count + 1).min(self.max);
        self.remaining()
    }

    /// Failures recorded so far.
    #[must_use]
    pub const fn count(&self) -> u32 {
        self.count
    }

    /// Attempts left before lockout.
    #[must_use]
    pub const fn remaining(&self) -> u32 {
        self.max.saturating_sub(self.count)
    }

    /// Whether the next state is lockout.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.count >= self.max
    }

    /// Back to zero.
    pub fn reset(&mut self) {
        self.count = 0;
    }
}
