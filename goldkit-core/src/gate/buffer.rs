use zeroize::Zeroize;

use super::pin::{Pin, PinValidationError, PIN_LENGTH};

/// The four digit slots of the keypad plus the focused slot.
///
/// Slots are zeroized whenever they are cleared.
#[derive(Debug, Default)]
pub struct PinBuffer {
    slots: [Option<u8>; PIN_LENGTH],
    focus: usize,
}

impl PinBuffer {
    /// An empty buffer focused on slot 0.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Writes `value` into `position` and moves focus to the next slot.
    ///
    /// An empty `value` clears the slot and keeps focus on it.
    ///
    /// # Errors
    /// Anything other than one ASCII digit, or a position past the last slot.
    pub fn set(&mut self, position: usize, value: &str) -> Result<(), PinValidationError> {
        if position >= PIN_LENGTH {
            return Err(PinValidationError::PositionOutOfRange(position));
        }
        if value.is_empty() {
            self.slots[position].zeroize();
            self.focus = position;
            return Ok(());
        }

        let mut chars = value.chars();
        let digit = match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_digit() => c as u8 - b'0',
            _ => return Err(PinValidationError::NonNumeric),
        };
        self.slots[position] = Some(digit);
        self.focus = (position + 1).min(PIN_LENGTH - 1);
        Ok(())
    }

    /// Backspace on `position`: clears it, or if it is already empty moves
    /// focus one slot left and clears that one.
    ///
    /// # Errors
    /// Position past the last slot.
    pub fn backspace(&mut self, position: usize) -> Result<(), PinValidationError> {
        if position >= PIN_LENGTH {
            return Err(PinValidationError::PositionOutOfRange(position));
        }
        if self.slots[position].is_some() {
            self.slots[position].zeroize();
            self.focus = position;
        } else if position > 0 {
            self.slots[position - 1].zeroize();
            self.focus = position - 1;
        }
        Ok(())
    }

    /// Whether every slot holds a digit.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(Option::is_some)
    }

    /// Currently focused slot.
    #[must_use]
    pub const fn focus(&self) -> usize {
        self.focus
    }

    /// Per-slot fill state, for rendering masked dots.
    #[must_use]
    pub fn filled(&self) -> Vec<bool> {
        self.slots.iter().map(Option::is_some).collect()
    }

    /// The slots joined in position order.
    ///
    /// # Errors
    /// [`PinValidationError::Incomplete`] if a slot is empty.
    pub fn to_pin(&self) -> Result<Pin, PinValidationError> {
        let mut joined = String::with_capacity(PIN_LENGTH);
        for slot in &self.slots {
            let digit = slot.ok_or(PinValidationError::Incomplete)?;
            joined.push(char::from(b'0' + digit));
        }
        let pin = Pin::parse(&joined);
        joined.zeroize();
        pin
    }

    /// Empties every slot and focuses slot 0.
    pub fn clear(&mut self) {
        self.slots.zeroize();
        self.focus = 0;
    }
}
