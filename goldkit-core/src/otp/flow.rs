use regex::Regex;
use serde::Deserialize;
use zeroize::Zeroize;

use crate::error::GoldKitError;

/// Tunables of the OTP screen.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, uniffi::Record)]
#[serde(default)]
pub struct OtpConfig {
    /// Digits in an OTP.
    pub code_length: u32,
    /// Seconds before "resend" becomes available again.
    pub resend_seconds: u32,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            code_length: 6,
            resend_seconds: 30,
        }
    }
}

/// Why the OTP is being requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum OtpPurpose {
    /// Sign in; afterwards the MPIN gate or MPIN creation follows.
    Login,
    /// Re-verify identity inside the forgot-MPIN flow.
    ResetPin,
}

/// Observable OTP screen state.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct OtpSnapshot {
    /// Normalized 10-digit phone number.
    pub phone: String,
    /// Digits expected.
    pub code_length: u32,
    /// Digits entered so far.
    pub entered: u32,
    /// Seconds until resend is allowed.
    pub resend_remaining: u32,
    /// Whether resend is allowed now.
    pub can_resend: bool,
}

/// Normalizes an Indian mobile number to its 10 digits.
///
/// Spaces and dashes are ignored; a `+91` or `91` country prefix is stripped.
///
/// # Errors
/// [`GoldKitError::InvalidInput`] if 10 digits do not remain.
pub fn normalize_phone(input: &str) -> Result<String, GoldKitError> {
    let compact: String = input
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .collect();
    let digits = compact.strip_prefix('+').unwrap_or(&compact);
    let local = if digits.len() == 12 {
        digits.strip_prefix("91").unwrap_or(digits)
    } else {
        digits
    };

    if local.len() == 10 && local.chars().all(|c| c.is_ascii_digit()) {
        Ok(local.to_string())
    } else {
        Err(GoldKitError::InvalidInput {
            attribute: "phone".to_string(),
            reason: "enter a valid 10 digit mobile number".to_string(),
        })
    }
}

/// Finds the first run of exactly `length` digits in an SMS body.
#[must_use]
pub fn extract_otp(body: &str, length: u32) -> Option<String> {
    let pattern = format!(r"(?:^|\D)(\d{{{length}}})(?:\D|$)");
    let re = Regex::new(&pattern).ok()?;
    re.captures(body)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

/// OTP entry with a resend countdown.
#[derive(Debug)]
pub struct OtpFlow {
    phone: String,
    code: String,
    resend_remaining: u32,
    config: OtpConfig,
}

impl OtpFlow {
    /// Starts a flow for `phone`.
    ///
    /// # Errors
    /// The phone number does not normalize.
    pub fn new(phone: &str, config: OtpConfig) -> Result<Self, GoldKitError> {
        Ok(Self {
            phone: normalize_phone(phone)?,
            code: String::new(),
            resend_remaining: 0,
            config,
        })
    }

    /// Normalized phone number.
    #[must_use]
    pub fn phone(&self) -> &str {
        &self.phone
    }

    /// Replaces the typed code. Returns whether it is now complete.
    ///
    /// # Errors
    /// Non-digits or more than `code_length` digits.
    pub fn set_code(&mut self, code: &str) -> Result<bool, GoldKitError> {
        if !code.chars().all(|c| c.is_ascii_digit()) || code.len() > self.code_length() {
            return Err(GoldKitError::InvalidInput {
                attribute: "otp".to_string(),
                reason: format!("enter the {} digit code", self.config.code_length),
            });
        }
        self.code.zeroize();
        self.code.push_str(code);
        Ok(self.is_complete())
    }

    /// Fills the code from an auto-read SMS. Returns the code when one was
    /// found.
    pub fn on_sms_received(&mut self, body: &str) -> Option<String> {
        let code = extract_otp(body, self.config.code_length)?;
        self.code.zeroize();
        self.code.push_str(&code);
        Some(code)
    }

    /// The code, if complete.
    ///
    /// # Errors
    /// [`GoldKitError::InvalidInput`] when fewer than `code_length` digits
    /// are entered.
    pub fn code_for_submit(&self) -> Result<&str, GoldKitError> {
        if self.is_complete() {
            Ok(&self.code)
        } else {
            Err(GoldKitError::InvalidInput {
                attribute: "otp".to_string(),
                reason: format!("enter the {} digit code", self.config.code_length),
            })
        }
    }

    /// Clears the typed code (after a rejection).
    pub fn clear_code(&mut self) {
        self.code.zeroize();
    }

    fn code_length(&self) -> usize {
        self.config.code_length as usize
    }

    fn is_complete(&self) -> bool {
        self.code.len() == self.code_length()
    }

    /// Whether "resend" may be tapped.
    #[must_use]
    pub const fn can_resend(&self) -> bool {
        self.resend_remaining == 0
    }

    /// Seconds until resend is allowed.
    #[must_use]
    pub const fn resend_remaining(&self) -> u32 {
        self.resend_remaining
    }

    /// Called after an OTP was sent.
    pub fn start_resend_countdown(&mut self) {
        self.resend_remaining = self.config.resend_seconds;
    }

    /// One second elapsed. Returns `true` when resend just became available.
    pub fn tick(&mut self) -> bool {
        if self.resend_remaining == 0 {
            return false;
        }
        self.resend_remaining -= 1;
        self.resend_remaining == 0
    }

    /// Observable state.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn snapshot(&self) -> OtpSnapshot {
        OtpSnapshot {
            phone: self.phone.clone(),
            code_length: self.config.code_length,
            entered: self.code.len() as u32,
            resend_remaining: self.resend_remaining,
            can_resend: self.can_resend(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    #[test_case("9876543210", "9876543210" ; "bare")]
    #[test_case("+91 98765 43210", "9876543210" ; "country code with spaces")]
    #[test_case("919876543210", "9876543210" ; "country code without plus")]
    #[test_case("98765-43210", "9876543210" ; "dash")]
    fn test_normalize_phone(input: &str, expected: &str) {
        assert_eq!(normalize_phone(input).unwrap(), expected);
    }

    #[test_case("12345" ; "short")]
    #[test_case("98765432100" ; "eleven digits")]
    #[test_case("98765abcde" ; "letters")]
    fn test_normalize_phone_rejects(input: &str) {
        assert!(matches!(
            normalize_phone(input),
            Err(GoldKitError::InvalidInput { attribute, .. }) if attribute == "phone"
        ));
    }

    #[test_case("Your OTP is 482913. Do not share it.", Some("482913") ; "sentence")]
    #[test_case("482913 is your login code", Some("482913") ; "leading")]
    #[test_case("Ref 12345678: OTP 004211", Some("004211") ; "skips longer runs")]
    #[test_case("Code: 1234", None ; "too short")]
    #[test_case("no digits here", None ; "none")]
    fn test_extract_otp(body: &str, expected: Option<&str>) {
        assert_eq!(extract_otp(body, 6).as_deref(), expected);
    }

    #[test]
    fn test_set_code() {
        let mut flow = OtpFlow::new("9876543210", OtpConfig::default()).unwrap();
        assert!(!flow.set_code("123").unwrap());
        assert!(flow.code_for_submit().is_err());
        assert!(flow.set_code("123456").unwrap());
        assert_eq!(flow.code_for_submit().unwrap(), "123456");
        assert!(flow.set_code("1234567").is_err());
        assert!(flow.set_code("12a").is_err());
    }

    #[test]
    fn test_sms_fills_code() {
        let mut flow = OtpFlow::new("9876543210", OtpConfig::default()).unwrap();
        assert_eq!(
            flow.on_sms_received("Use 771204 to log in").as_deref(),
            Some("771204")
        );
        assert_eq!(flow.code_for_submit().unwrap(), "771204");
        assert_eq!(flow.snapshot().entered, 6);
    }

    #[test]
    fn test_resend_countdown() {
        let mut flow = OtpFlow::new(
            "9876543210",
            OtpConfig {
                code_length: 6,
                resend_seconds: 3,
            },
        )
        .unwrap();
        assert!(flow.can_resend());
        flow.start_resend_countdown();
        assert!(!flow.can_resend());
        assert!(!flow.tick());
        assert!(!flow.tick());
        assert!(flow.tick());
        assert!(flow.can_resend());
        assert!(!flow.tick());
    }
}
