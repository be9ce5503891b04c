use std::sync::Arc;

use crate::api::{AuthApi, GoldApiClient};
use crate::defaults::ApiConfig;
use crate::error::GoldKitError;
use crate::navigation::Navigator;
use crate::notifications::{PushNotifications, PushRegistrar, SessionManager};
use crate::session::{SessionStore, UserProfile};
use crate::storage::KeyValueStore;
use crate::Environment;

/// The signed-in account: push registration and logout.
///
/// Hold one for the lifetime of the signed-in part of the app. Call
/// [`Self::initialize_push`] once after sign-in and [`Self::logout`] from the
/// profile screen.
#[derive(uniffi::Object)]
pub struct AccountSession {
    api: Arc<GoldApiClient>,
    sessions: SessionStore,
    push: Arc<PushNotifications>,
    manager: SessionManager,
}

impl AccountSession {
    fn build(
        api_config: ApiConfig,
        store: Arc<dyn KeyValueStore>,
        navigator: Arc<dyn Navigator>,
        registrar: Arc<dyn PushRegistrar>,
    ) -> Result<Self, GoldKitError> {
        let api = Arc::new(GoldApiClient::new(api_config));
        let sessions = SessionStore::new(store);
        if let Some(session) = sessions.load()? {
            api.set_auth_token(Some(session.token));
        }
        let push = Arc::new(PushNotifications::new(registrar));
        let manager = SessionManager::new(sessions.clone(), push.clone(), navigator);
        Ok(Self {
            api,
            sessions,
            push,
            manager,
        })
    }
}

#[uniffi::export(async_runtime = "tokio")]
impl AccountSession {
    /// Opens the account against the default API of `environment`.
    ///
    /// # Errors
    /// Unreadable stored session.
    #[uniffi::constructor]
    pub fn new(
        environment: &Environment,
        store: Arc<dyn KeyValueStore>,
        navigator: Arc<dyn Navigator>,
        registrar: Arc<dyn PushRegistrar>,
    ) -> Result<Self, GoldKitError> {
        Self::build(
            ApiConfig::from_environment(*environment),
            store,
            navigator,
            registrar,
        )
    }

    /// Opens the account with a JSON [`ApiConfig`].
    ///
    /// # Errors
    /// Invalid config JSON or an unreadable stored session.
    #[uniffi::constructor]
    pub fn with_config(
        api_config: &str,
        store: Arc<dyn KeyValueStore>,
        navigator: Arc<dyn Navigator>,
        registrar: Arc<dyn PushRegistrar>,
    ) -> Result<Self, GoldKitError> {
        Self::build(ApiConfig::from_json(api_config)?, store, navigator, registrar)
    }

    /// Installs push handlers and registers the device token with the
    /// currently stored session.
    ///
    /// Returns `false` when push was already initialized.
    ///
    /// # Errors
    /// No stored session, or the registration call failed (handlers are
    /// removed again and the call can be retried).
    pub async fn initialize_push(&self) -> Result<bool, GoldKitError> {
        // the session may have been stored by an OTP screen after this opened
        let Some(session) = self.sessions.load()? else {
            return Err(GoldKitError::InvalidInput {
                attribute: "session".to_string(),
                reason: "push registration requires a signed-in account".to_string(),
            });
        };
        self.api.set_auth_token(Some(session.token));
        self.push.initialize(self.api.as_ref()).await
    }

    /// Whether push handlers are installed.
    #[must_use]
    pub fn is_push_initialized(&self) -> bool {
        self.push.is_initialized()
    }

    /// The signed-in user, if a session is stored.
    ///
    /// # Errors
    /// Unreadable stored session.
    pub fn user(&self) -> Result<Option<UserProfile>, GoldKitError> {
        Ok(self.sessions.load()?.map(|s| s.user))
    }

    /// Tears down push, clears the stored session and returns to login.
    ///
    /// # Errors
    /// Storage failures while clearing.
    pub fn logout(&self) -> Result<(), GoldKitError> {
        self.manager.logout(self.api.as_ref())
    }
}
