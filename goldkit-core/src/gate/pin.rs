use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;
use thiserror::Error;

/// Number of digits in an MPIN.
pub const PIN_LENGTH: usize = 4;

/// Local validation failures. These are shown inline and never sent to the
/// network.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PinValidationError {
    /// A keystroke or PIN contained something other than a single ASCII digit.
    #[error("only digits 0-9 are allowed")]
    NonNumeric,
    /// Position outside `0..PIN_LENGTH`.
    #[error("digit position {0} is out of range")]
    PositionOutOfRange(usize),
    /// Fewer than four digits were entered.
    #[error("Please enter a 4 digit MPIN")]
    Incomplete,
    /// Confirmation PIN differs from the first entry.
    #[error("MPINs do not match")]
    Mismatch,
    /// New PIN equals the old one on reset.
    #[error("New MPIN must be different from the old MPIN")]
    Unchanged,
}

/// A validated 4-digit MPIN.
///
/// The digits are held in a [`SecretString`]; `Debug` is redacted and the
/// value is only exposed when written into a request body.
#[derive(Clone)]
pub struct Pin(SecretString);

impl Pin {
    /// Validates `value` as exactly four ASCII digits.
    ///
    /// # Errors
    /// [`PinValidationError::Incomplete`] for the wrong length and
    /// [`PinValidationError::NonNumeric`] for any non-digit.
    pub fn parse(value: &str) -> Result<Self, PinValidationError> {
        if !value.chars().all(|c| c.is_ascii_digit()) {
            return Err(PinValidationError::NonNumeric);
        }
        if value.len() != PIN_LENGTH {
            return Err(PinValidationError::Incomplete);
        }
        Ok(Self(SecretString::from(value)))
    }

    pub(crate) fn expose(&self) -> &str {
        self.0.expose_secret()
    }

    /// Constant-time comparison of two PINs.
    #[must_use]
    pub fn matches(&self, other: &Self) -> bool {
        self.expose()
            .as_bytes()
            .ct_eq(other.expose().as_bytes())
            .into()
    }
}

impl std::fmt::Debug for Pin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Pin(****)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("1234" ; "plain")]
    #[test_case("0000" ; "leading zeros")]
    fn test_parse_accepts_four_digits(input: &str) {
        let pin = Pin::parse(input).expect("valid pin");
        assert_eq!(pin.expose(), input);
    }

    #[test_case("123", PinValidationError::Incomplete ; "too short")]
    #[test_case("12345", PinValidationError::Incomplete ; "too long")]
    #[test_case("12a4", PinValidationError::NonNumeric ; "letter")]
    #[test_case("١٢٣٤", PinValidationError::NonNumeric ; "non ascii digits")]
    fn test_parse_rejects(input: &str, expected: PinValidationError) {
        assert_eq!(Pin::parse(input).unwrap_err(), expected);
    }

    #[test]
    fn test_debug_is_redacted() {
        let pin = Pin::parse("5678").unwrap();
        assert_eq!(format!("{pin:?}"), "Pin(****)");
    }

    #[test]
    fn test_matches() {
        let a = Pin::parse("1357").unwrap();
        assert!(a.matches(&Pin::parse("1357").unwrap()));
        assert!(!a.matches(&Pin::parse("1358").unwrap()));
    }
}
