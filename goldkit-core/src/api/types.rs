//! Request and response bodies of the REST API.

use serde::{Deserialize, Serialize};

pub(crate) const CREATE_PIN_PATH: &str = "/api/v1/mpin/create";
pub(crate) const VERIFY_PIN_PATH: &str = "/api/v1/mpin/verify";
pub(crate) const RESET_PIN_PATH: &str = "/api/v1/mpin/reset";
pub(crate) const RESET_PIN_DIRECT_PATH: &str = "/api/v1/mpin/reset-direct";
pub(crate) const SEND_OTP_PATH: &str = "/api/v1/auth/send-otp";
pub(crate) const VERIFY_OTP_PATH: &str = "/api/v1/auth/verify-otp";
pub(crate) const REGISTER_PUSH_PATH: &str = "/api/v1/notifications/register";

/// Error text the server uses when the account has no MPIN yet.
pub(crate) const PIN_NOT_FOUND: &str = "pin not found";

#[derive(Serialize)]
pub(crate) struct MpinBody<'a> {
    pub mpin: &'a str,
}

#[derive(Serialize)]
pub(crate) struct ResetPinBody<'a> {
    pub old_mpin: &'a str,
    pub new_mpin: &'a str,
}

#[derive(Serialize)]
pub(crate) struct ResetPinDirectBody<'a> {
    pub new_mpin: &'a str,
}

#[derive(Serialize)]
pub(crate) struct SendOtpBody<'a> {
    pub phone: &'a str,
}

#[derive(Serialize)]
pub(crate) struct VerifyOtpBody<'a> {
    pub phone: &'a str,
    pub otp: &'a str,
}

#[derive(Serialize)]
pub(crate) struct RegisterPushBody<'a> {
    pub token: &'a str,
    pub platform: &'a str,
}

/// Error envelope. The API reports failures as `{"error": "..."}`; some
/// older endpoints use `message` instead.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: Option<String>,
    pub message: Option<String>,
}

impl ErrorBody {
    pub(crate) fn parse(text: &str) -> Self {
        serde_json::from_str(text).unwrap_or_default()
    }

    pub(crate) fn reason(&self) -> Option<&str> {
        self.error
            .as_deref()
            .or(self.message.as_deref())
            .filter(|s| !s.trim().is_empty())
    }
}
