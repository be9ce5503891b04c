//! OTP login: phone entry, SMS code entry with auto-read, resend countdown.
//!
//! A verified code yields an [`AuthSession`](crate::session::AuthSession)
//! that is persisted before routing to the MPIN gate or MPIN creation.

mod controller;
mod flow;

pub use controller::OtpController;
pub use flow::{extract_otp, normalize_phone, OtpConfig, OtpFlow, OtpPurpose, OtpSnapshot};
