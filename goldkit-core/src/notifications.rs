//! Push notification setup and logout.
//!
//! Registration is explicit: the host calls [`PushNotifications::initialize`]
//! once after sign-in and [`SessionManager::logout`] tears it down again.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::api::AuthApi;
use crate::error::GoldKitError;
use crate::navigation::{Navigator, Route};
use crate::session::SessionStore;

/// Push plumbing implemented by the host app (FCM / APNs).
#[uniffi::export(with_foreign)]
pub trait PushRegistrar: Send + Sync {
    /// Installs the foreground/background message handlers.
    fn install_handler(&self);

    /// Removes the handlers installed by [`Self::install_handler`].
    fn uninstall_handler(&self);

    /// The device push token, if the platform has issued one.
    fn device_token(&self) -> Option<String>;

    /// Platform tag sent with the token, e.g. `"android"` or `"ios"`.
    fn platform(&self) -> String;
}

/// One-time push registration for the signed-in account.
pub struct PushNotifications {
    registrar: Arc<dyn PushRegistrar>,
    initialized: AtomicBool,
}

impl PushNotifications {
    /// Wraps the host registrar. Nothing is installed until
    /// [`Self::initialize`].
    #[must_use]
    pub fn new(registrar: Arc<dyn PushRegistrar>) -> Self {
        Self {
            registrar,
            initialized: AtomicBool::new(false),
        }
    }

    /// Installs the handlers and registers the device token with the server.
    ///
    /// Returns `false` if already initialized. A device without a token is
    /// still initialized; nothing is registered.
    ///
    /// # Errors
    /// The registration call failed. Handlers are removed again so a later
    /// call can retry.
    pub async fn initialize<A: AuthApi>(&self, api: &A) -> Result<bool, GoldKitError> {
        if self.initialized.swap(true, Ordering::AcqRel) {
            return Ok(false);
        }
        self.registrar.install_handler();

        let Some(token) = self.registrar.device_token() else {
            tracing::warn!("no push token issued; skipping registration");
            return Ok(true);
        };
        let platform = self.registrar.platform();
        if let Err(e) = api.register_push_token(&token, &platform).await {
            tracing::warn!(error = %e, "push registration failed");
            self.registrar.uninstall_handler();
            self.initialized.store(false, Ordering::Release);
            return Err(e);
        }
        tracing::info!(platform, "push token registered");
        Ok(true)
    }

    /// Whether [`Self::initialize`] has run.
    #[must_use]
    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    /// Removes the handlers. A no-op if not initialized.
    pub fn teardown(&self) {
        if self.initialized.swap(false, Ordering::AcqRel) {
            self.registrar.uninstall_handler();
            tracing::debug!("push handlers removed");
        }
    }
}

/// Sign-out across the session store, push registration and the router.
pub struct SessionManager {
    sessions: SessionStore,
    push: Arc<PushNotifications>,
    navigator: Arc<dyn Navigator>,
}

impl SessionManager {
    /// Groups the pieces torn down on logout.
    #[must_use]
    pub fn new(
        sessions: SessionStore,
        push: Arc<PushNotifications>,
        navigator: Arc<dyn Navigator>,
    ) -> Self {
        Self {
            sessions,
            push,
            navigator,
        }
    }

    /// Tears down push, forgets the bearer token, clears every session key
    /// and returns to the login screen.
    ///
    /// # Errors
    /// Storage failures while clearing. Push and the token are already torn
    /// down at that point.
    pub fn logout<A: AuthApi>(&self, api: &A) -> Result<(), GoldKitError> {
        self.push.teardown();
        api.set_auth_token(None);
        self.sessions.clear()?;
        self.navigator.reset(vec![Route::Login]);
        tracing::info!("logged out");
        Ok(())
    }
}
