//! Tokio driver for [`OtpFlow`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::runtime::Handle;

use super::flow::{OtpConfig, OtpFlow, OtpPurpose, OtpSnapshot};
use crate::api::AuthApi;
use crate::error::GoldKitError;
use crate::navigation::{Navigator, Route};
use crate::session::{SessionStore, UserProfile};
use crate::timer::{ScheduledTick, TickControl};

const RESEND_TICK: Duration = Duration::from_secs(1);

struct Shared<A> {
    flow: Mutex<OtpFlow>,
    resend_timer: Mutex<Option<ScheduledTick>>,
    api: Arc<A>,
    navigator: Arc<dyn Navigator>,
    sessions: SessionStore,
    purpose: OtpPurpose,
    runtime: Handle,
    verifying: AtomicBool,
    disposed: AtomicBool,
}

/// Drives the OTP screen: sends codes, counts down to "resend", accepts
/// auto-read SMS and turns a verified code into a stored session.
pub struct OtpController<A: AuthApi> {
    shared: Arc<Shared<A>>,
}

impl<A: AuthApi> OtpController<A> {
    /// Creates a controller for `phone` bound to the current tokio runtime.
    ///
    /// # Errors
    /// An invalid phone number, or no tokio runtime.
    pub fn new(
        phone: &str,
        purpose: OtpPurpose,
        api: Arc<A>,
        navigator: Arc<dyn Navigator>,
        sessions: SessionStore,
        config: OtpConfig,
    ) -> Result<Self, GoldKitError> {
        let runtime = Handle::try_current().map_err(|e| GoldKitError::Generic {
            error: format!("a tokio runtime is required: {e}"),
        })?;
        Ok(Self {
            shared: Arc::new(Shared {
                flow: Mutex::new(OtpFlow::new(phone, config)?),
                resend_timer: Mutex::new(None),
                api,
                navigator,
                sessions,
                purpose,
                runtime,
                verifying: AtomicBool::new(false),
                disposed: AtomicBool::new(false),
            }),
        })
    }

    /// Requests an SMS code and starts the resend countdown.
    ///
    /// # Errors
    /// [`GoldKitError::InvalidInput`] while the countdown is running, or the
    /// API error.
    pub async fn send_otp(&self) -> Result<(), GoldKitError> {
        let phone = {
            let flow = self.shared.flow();
            if !flow.can_resend() {
                return Err(GoldKitError::InvalidInput {
                    attribute: "otp".to_string(),
                    reason: format!("resend available in {}s", flow.resend_remaining()),
                });
            }
            flow.phone().to_string()
        };
        self.shared.api.send_otp(&phone).await?;
        if self.shared.is_disposed() {
            return Ok(());
        }
        self.shared.flow().start_resend_countdown();
        self.shared.start_resend_timer();
        tracing::info!("otp sent");
        Ok(())
    }

    /// Replaces the typed code.
    ///
    /// # Errors
    /// Non-digits or too many digits.
    pub fn set_code(&self, code: &str) -> Result<(), GoldKitError> {
        self.shared.flow().set_code(code)?;
        Ok(())
    }

    /// Feeds an SMS body from the platform's SMS reader. When it carries a
    /// code, the code is filled in and verified right away.
    ///
    /// Returns the signed-in user, or `None` if the SMS held no code.
    ///
    /// # Errors
    /// See [`Self::verify`].
    pub async fn on_sms_received(&self, body: &str) -> Result<Option<UserProfile>, GoldKitError> {
        if self.shared.flow().on_sms_received(body).is_none() {
            tracing::debug!("sms carried no otp");
            return Ok(None);
        }
        self.verify().await
    }

    /// Verifies the typed code, stores the session and routes onwards.
    ///
    /// Returns `None` when another verification is already running or the
    /// controller was disposed.
    ///
    /// # Errors
    /// An incomplete code, an API rejection (the code is cleared) or a
    /// storage failure.
    pub async fn verify(&self) -> Result<Option<UserProfile>, GoldKitError> {
        if self.shared.is_disposed() {
            return Ok(None);
        }
        let Some(_in_flight) = InFlight::acquire(&self.shared.verifying) else {
            return Ok(None);
        };
        self.shared.run_verify().await
    }

    /// Current state for rendering.
    #[must_use]
    pub fn snapshot(&self) -> OtpSnapshot {
        self.shared.flow().snapshot()
    }

    /// Stops the countdown and ignores later responses. Idempotent.
    pub fn dispose(&self) {
        self.shared.dispose();
    }
}

impl<A: AuthApi> Drop for OtpController<A> {
    fn drop(&mut self) {
        self.shared.dispose();
    }
}

/// Holds the single-flight flag for one verification. Released on drop, so
/// a cancelled verify does not block the next one.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        if flag.swap(true, Ordering::AcqRel) {
            None
        } else {
            Some(Self(flag))
        }
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<A: AuthApi> Shared<A> {
    fn flow(&self) -> MutexGuard<'_, OtpFlow> {
        self.flow.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn resend_timer(&self) -> MutexGuard<'_, Option<ScheduledTick>> {
        self.resend_timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        if let Some(mut timer) = self.resend_timer().take() {
            timer.cancel();
        }
        self.flow().clear_code();
    }

    async fn run_verify(&self) -> Result<Option<UserProfile>, GoldKitError> {
        let (phone, code) = {
            let flow = self.flow();
            (flow.phone().to_string(), flow.code_for_submit()?.to_string())
        };

        let session = match self.api.verify_otp(&phone, &code).await {
            Ok(session) => session,
            Err(e) => {
                if !e.is_transport() {
                    self.flow().clear_code();
                }
                return Err(e);
            }
        };
        if self.is_disposed() {
            tracing::debug!("dropping otp response for disposed screen");
            return Ok(None);
        }

        self.sessions.save(&session)?;
        self.api.set_auth_token(Some(session.token.clone()));
        tracing::info!(user_id = %session.user.id, "otp verified");

        if let Some(mut timer) = self.resend_timer().take() {
            timer.cancel();
        }
        match self.purpose {
            OtpPurpose::Login => {
                let next = if self.sessions.has_pin()? {
                    Route::EnterPin
                } else {
                    Route::CreatePin
                };
                self.navigator.replace(next, HashMap::new());
            }
            OtpPurpose::ResetPin => {
                let params = HashMap::from([("mode".to_string(), "reset".to_string())]);
                self.navigator.replace(Route::CreatePin, params);
            }
        }
        Ok(Some(session.user))
    }

    fn start_resend_timer(self: &Arc<Self>) {
        let weak: Weak<Self> = Arc::downgrade(self);
        let tick = ScheduledTick::start(&self.runtime, RESEND_TICK, move || {
            let Some(shared) = weak.upgrade() else {
                return TickControl::Stop;
            };
            if shared.is_disposed() || shared.flow().tick() {
                TickControl::Stop
            } else {
                TickControl::Continue
            }
        });
        if let Some(mut previous) = self.resend_timer().replace(tick) {
            previous.cancel();
        }
    }
}
