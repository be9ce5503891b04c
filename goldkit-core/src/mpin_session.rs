use std::sync::Arc;

use crate::api::{AuthApi, GoldApiClient};
use crate::defaults::ApiConfig;
use crate::error::GoldKitError;
use crate::gate::{setup, GateConfig, GateSnapshot, Pin, PinGateController};
use crate::navigation::Navigator;
use crate::session::{SessionStore, UserProfile};
use crate::storage::KeyValueStore;
use crate::Environment;

/// The MPIN screen as seen from the mobile app.
///
/// Wraps a [`PinGateController`] talking to the real API with the stored
/// session token. Create one per screen mount and call [`Self::dispose`] on
/// unmount.
#[derive(uniffi::Object)]
pub struct MpinSession {
    api: Arc<GoldApiClient>,
    sessions: SessionStore,
    gate: PinGateController<GoldApiClient>,
}

impl MpinSession {
    fn build(
        api_config: ApiConfig,
        store: Arc<dyn KeyValueStore>,
        navigator: Arc<dyn Navigator>,
        gate_config: Option<GateConfig>,
    ) -> Result<Self, GoldKitError> {
        let api = Arc::new(GoldApiClient::new(api_config));
        let sessions = SessionStore::new(store);
        if let Some(session) = sessions.load()? {
            api.set_auth_token(Some(session.token));
        } else {
            tracing::warn!("mpin screen opened without a stored session");
        }
        let gate = PinGateController::new(
            api.clone(),
            navigator,
            sessions.clone(),
            gate_config.unwrap_or_default(),
        )?;
        Ok(Self {
            api,
            sessions,
            gate,
        })
    }
}

// Constructors are async so they run on the tokio runtime the gate timers
// bind to.
#[uniffi::export(async_runtime = "tokio")]
#[allow(clippy::unused_async)]
impl MpinSession {
    /// Opens the gate against the default API of `environment`.
    ///
    /// # Errors
    /// Unreadable stored session.
    #[uniffi::constructor]
    pub async fn new(
        environment: &Environment,
        store: Arc<dyn KeyValueStore>,
        navigator: Arc<dyn Navigator>,
        gate_config: Option<GateConfig>,
    ) -> Result<Self, GoldKitError> {
        Self::build(
            ApiConfig::from_environment(*environment),
            store,
            navigator,
            gate_config,
        )
    }

    /// Opens the gate with a JSON [`ApiConfig`] (custom base URL, timeouts).
    ///
    /// # Errors
    /// Invalid config JSON or an unreadable stored session.
    #[uniffi::constructor]
    pub async fn with_config(
        api_config: &str,
        store: Arc<dyn KeyValueStore>,
        navigator: Arc<dyn Navigator>,
        gate_config: Option<GateConfig>,
    ) -> Result<Self, GoldKitError> {
        Self::build(ApiConfig::from_json(api_config)?, store, navigator, gate_config)
    }

    /// Keystroke on slot `position`. The fourth digit schedules verification.
    ///
    /// # Errors
    /// A non-digit value or a position outside `0..4`.
    pub fn append_digit(&self, value: &str, position: u32) -> Result<(), GoldKitError> {
        self.gate.append_digit(value, position as usize)
    }

    /// Backspace on slot `position`.
    ///
    /// # Errors
    /// A position outside `0..4`.
    pub fn backspace(&self, position: u32) -> Result<(), GoldKitError> {
        self.gate.backspace(position as usize)
    }

    /// Verifies the entered PIN now.
    ///
    /// # Errors
    /// Fewer than four digits entered.
    pub async fn submit(&self) -> Result<(), GoldKitError> {
        self.gate.submit().await
    }

    /// "Forgot MPIN?" tapped.
    pub fn forgot_pin(&self) {
        self.gate.forgot_pin();
    }

    /// Forgot-MPIN confirmed.
    pub fn confirm_forgot(&self) {
        self.gate.confirm_forgot();
    }

    /// Forgot-MPIN dismissed.
    pub fn cancel_forgot(&self) {
        self.gate.cancel_forgot();
    }

    /// "Create MPIN now" chosen.
    pub fn create_pin_now(&self) {
        self.gate.create_pin_now();
    }

    /// Not-provisioned prompt dismissed.
    pub fn cancel_not_provisioned(&self) {
        self.gate.cancel_not_provisioned();
    }

    /// Current state for rendering.
    #[must_use]
    pub fn snapshot(&self) -> GateSnapshot {
        self.gate.snapshot()
    }

    /// The signed-in user, if a session is stored.
    ///
    /// # Errors
    /// Unreadable stored session.
    pub fn user(&self) -> Result<Option<UserProfile>, GoldKitError> {
        Ok(self.sessions.load()?.map(|s| s.user))
    }

    /// Creates the account's MPIN after the user typed it twice.
    ///
    /// # Errors
    /// Malformed or mismatched entries, or the API error.
    pub async fn create_pin(&self, pin: &str, confirm: &str) -> Result<(), GoldKitError> {
        let mut entry = setup::PinSetup::new();
        entry.enter(pin)?;
        let pin: Pin = entry.confirm(confirm)?;
        setup::create_pin(self.api.as_ref(), &self.sessions, &pin).await
    }

    /// Changes the MPIN, proving the old one.
    ///
    /// # Errors
    /// Local validation or the API error.
    pub async fn reset_pin_with_old(
        &self,
        old: &str,
        new: &str,
        confirm: &str,
    ) -> Result<(), GoldKitError> {
        setup::reset_pin_with_old(self.api.as_ref(), old, new, confirm).await
    }

    /// Sets a new MPIN after OTP re-verification.
    ///
    /// # Errors
    /// Local validation or the API error.
    pub async fn reset_pin_direct(&self, new: &str, confirm: &str) -> Result<(), GoldKitError> {
        setup::reset_pin_direct(self.api.as_ref(), &self.sessions, new, confirm).await
    }

    /// Cancels timers; later responses are ignored.
    pub fn dispose(&self) {
        self.gate.dispose();
    }
}
