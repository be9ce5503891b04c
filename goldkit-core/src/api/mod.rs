//! Remote API seams and the `reqwest` implementation.
//!
//! Screens talk to the server through [`PinApi`] and [`AuthApi`] so the state
//! machines can be driven by scripted fakes in tests.

use std::future::Future;

use secrecy::SecretString;

use crate::error::GoldKitError;
use crate::gate::Pin;
use crate::session::AuthSession;

mod client;
pub mod normalize;
pub(crate) mod types;

pub use client::GoldApiClient;
pub use normalize::normalize_auth_response;

/// MPIN endpoints.
///
/// Errors follow one convention across methods:
/// [`GoldKitError::PinNotFound`] when the account has no MPIN,
/// [`GoldKitError::PinRejected`] for any other domain rejection and
/// [`GoldKitError::NetworkError`] when the server could not be reached or
/// failed.
pub trait PinApi: Send + Sync + 'static {
    /// Provisions `pin` for the signed-in account.
    fn create_pin(&self, pin: &Pin) -> impl Future<Output = Result<(), GoldKitError>> + Send;

    /// Checks `pin` against the server.
    fn verify_pin(&self, pin: &Pin) -> impl Future<Output = Result<(), GoldKitError>> + Send;

    /// Replaces `old` with `new`.
    fn reset_pin_with_old(
        &self,
        old: &Pin,
        new: &Pin,
    ) -> impl Future<Output = Result<(), GoldKitError>> + Send;

    /// Sets `new` without the old PIN; only valid after an OTP re-verification.
    fn reset_pin_direct(&self, new: &Pin)
        -> impl Future<Output = Result<(), GoldKitError>> + Send;
}

/// Login and device registration endpoints.
pub trait AuthApi: Send + Sync + 'static {
    /// Sets (or clears) the bearer token sent with later requests.
    fn set_auth_token(&self, token: Option<SecretString>);

    /// Sends an SMS OTP to `phone`.
    fn send_otp(&self, phone: &str) -> impl Future<Output = Result<(), GoldKitError>> + Send;

    /// Exchanges `phone` + `otp` for a session.
    fn verify_otp(
        &self,
        phone: &str,
        otp: &str,
    ) -> impl Future<Output = Result<AuthSession, GoldKitError>> + Send;

    /// Registers a push token for the signed-in account.
    fn register_push_token(
        &self,
        token: &str,
        platform: &str,
    ) -> impl Future<Output = Result<(), GoldKitError>> + Send;
}
