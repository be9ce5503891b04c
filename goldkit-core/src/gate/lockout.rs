/// Whether PIN entry is suspended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LockState {
    /// Entry allowed.
    #[default]
    Unlocked,
    /// Entry suspended for `remaining_seconds` more ticks.
    Locked {
        /// Seconds until entry is allowed again.
        remaining_seconds: u32,
    },
}

impl LockState {
    /// A fresh lockout of `seconds`.
    #[must_use]
    pub const fn locked_for(seconds: u32) -> Self {
        Self::Locked {
            remaining_seconds: seconds,
        }
    }

    /// Whether entry is suspended.
    #[must_use]
    pub const fn is_locked(&self) -> bool {
        matches!(self, Self::Locked { .. })
    }

    /// Seconds left, if locked.
    #[must_use]
    pub const fn remaining_seconds(&self) -> Option<u32> {
        match self {
            Self::Unlocked => None,
            Self::Locked { remaining_seconds } => Some(*remaining_seconds),
        }
    }

    /// One second elapsed. Returns `true` exactly on the tick that unlocks.
    pub fn tick(&mut self) -> bool {
        match self {
            Self::Unlocked => false,
            Self::Locked { remaining_seconds } => {
                *remaining_seconds = remaining_seconds.saturating_sub(1);
                if *remaining_seconds == 0 {
                    *self = Self::Unlocked;
                    true
                } else {
                    false
                }
            }
        }
    }
}
