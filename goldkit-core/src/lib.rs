#![deny(clippy::all, clippy::pedantic, clippy::nursery)]
#![doc = "Core client logic for the gold savings app.\n\nThe crate holds everything the mobile screens need that is not layout: the MPIN gate state machine and its async driver, the OTP login flow, the REST client, session persistence and the platform seams (storage, navigation, push registration) that the host app implements through `uniffi`."]

use strum::EnumString;

/// Deployment the client talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum Environment {
    /// Pre-production API.
    Staging,
    /// Live API.
    Production,
}

mod error;
pub use error::*;

pub mod api;
pub mod defaults;
pub mod gate;
pub mod logger;
pub mod navigation;
pub mod notifications;
pub mod otp;
pub mod session;
pub mod storage;
pub mod timer;

mod account_session;
mod mpin_session;
mod otp_session;
pub use account_session::AccountSession;
pub use mpin_session::MpinSession;
pub use otp_session::OtpSession;

// private modules
mod http_request;

uniffi::setup_scaffolding!("goldkit_core");
