use std::sync::Arc;

use crate::api::GoldApiClient;
use crate::defaults::ApiConfig;
use crate::error::GoldKitError;
use crate::navigation::Navigator;
use crate::otp::{OtpConfig, OtpController, OtpPurpose, OtpSnapshot};
use crate::session::{SessionStore, UserProfile};
use crate::storage::KeyValueStore;
use crate::Environment;

/// The OTP screen as seen from the mobile app.
///
/// Wraps an [`OtpController`] over the real API. The host forwards SMS bodies
/// from its SMS reader to [`Self::on_sms_received`]. A verified code is
/// stored as the session, so an [`crate::MpinSession`] opened afterwards
/// picks up the token.
#[derive(uniffi::Object)]
pub struct OtpSession {
    otp: OtpController<GoldApiClient>,
}

impl OtpSession {
    fn build(
        api_config: ApiConfig,
        phone: &str,
        purpose: OtpPurpose,
        store: Arc<dyn KeyValueStore>,
        navigator: Arc<dyn Navigator>,
        otp_config: Option<OtpConfig>,
    ) -> Result<Self, GoldKitError> {
        let otp = OtpController::new(
            phone,
            purpose,
            Arc::new(GoldApiClient::new(api_config)),
            navigator,
            SessionStore::new(store),
            otp_config.unwrap_or_default(),
        )?;
        Ok(Self { otp })
    }
}

#[uniffi::export(async_runtime = "tokio")]
#[allow(clippy::unused_async)]
impl OtpSession {
    /// Opens the OTP screen for `phone` against the default API of
    /// `environment`.
    ///
    /// # Errors
    /// An invalid phone number.
    #[uniffi::constructor]
    pub async fn new(
        environment: &Environment,
        phone: &str,
        purpose: OtpPurpose,
        store: Arc<dyn KeyValueStore>,
        navigator: Arc<dyn Navigator>,
        otp_config: Option<OtpConfig>,
    ) -> Result<Self, GoldKitError> {
        Self::build(
            ApiConfig::from_environment(*environment),
            phone,
            purpose,
            store,
            navigator,
            otp_config,
        )
    }

    /// Opens the OTP screen with a JSON [`ApiConfig`].
    ///
    /// # Errors
    /// Invalid config JSON or an invalid phone number.
    #[uniffi::constructor]
    pub async fn with_config(
        api_config: &str,
        phone: &str,
        purpose: OtpPurpose,
        store: Arc<dyn KeyValueStore>,
        navigator: Arc<dyn Navigator>,
        otp_config: Option<OtpConfig>,
    ) -> Result<Self, GoldKitError> {
        Self::build(
            ApiConfig::from_json(api_config)?,
            phone,
            purpose,
            store,
            navigator,
            otp_config,
        )
    }

    /// Requests an SMS code and starts the resend countdown.
    ///
    /// # Errors
    /// The countdown is still running, or the API error.
    pub async fn send_otp(&self) -> Result<(), GoldKitError> {
        self.otp.send_otp().await
    }

    /// Replaces the typed code.
    ///
    /// # Errors
    /// Non-digits or too many digits.
    pub fn set_code(&self, code: &str) -> Result<(), GoldKitError> {
        self.otp.set_code(code)
    }

    /// SMS body from the platform reader; a contained code is verified
    /// immediately.
    ///
    /// # Errors
    /// See [`Self::verify`].
    pub async fn on_sms_received(&self, body: &str) -> Result<Option<UserProfile>, GoldKitError> {
        self.otp.on_sms_received(body).await
    }

    /// Verifies the typed code. `None` while another verification runs.
    ///
    /// # Errors
    /// An incomplete code, the API error or a storage failure.
    pub async fn verify(&self) -> Result<Option<UserProfile>, GoldKitError> {
        self.otp.verify().await
    }

    /// Current state for rendering.
    #[must_use]
    pub fn snapshot(&self) -> OtpSnapshot {
        self.otp.snapshot()
    }

    /// Stops the countdown; later responses are ignored.
    pub fn dispose(&self) {
        self.otp.dispose();
    }
}
