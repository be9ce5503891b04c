//! MPIN creation (enter + confirm) and reset.

use super::pin::{Pin, PinValidationError};
use crate::api::PinApi;
use crate::error::GoldKitError;
use crate::session::SessionStore;

/// Where a [`PinSetup`] currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum SetupStep {
    /// Waiting for the first entry.
    Enter,
    /// Waiting for the same PIN again.
    Confirm,
}

/// Two-step entry used when creating a PIN: type it, then type it again.
#[derive(Debug, Default)]
pub struct PinSetup {
    first: Option<Pin>,
}

impl PinSetup {
    /// Starts at [`SetupStep::Enter`].
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current step.
    #[must_use]
    pub const fn step(&self) -> SetupStep {
        if self.first.is_some() {
            SetupStep::Confirm
        } else {
            SetupStep::Enter
        }
    }

    /// Records the first entry.
    ///
    /// # Errors
    /// The value is not a 4-digit PIN.
    pub fn enter(&mut self, value: &str) -> Result<SetupStep, PinValidationError> {
        self.first = Some(Pin::parse(value)?);
        Ok(SetupStep::Confirm)
    }

    /// Checks the confirmation. A mismatch restarts from [`SetupStep::Enter`].
    ///
    /// # Errors
    /// [`PinValidationError::Incomplete`] before [`Self::enter`],
    /// a malformed value, or [`PinValidationError::Mismatch`].
    pub fn confirm(&mut self, value: &str) -> Result<Pin, PinValidationError> {
        let confirm = Pin::parse(value)?;
        let first = self.first.take().ok_or(PinValidationError::Incomplete)?;
        if first.matches(&confirm) {
            Ok(first)
        } else {
            Err(PinValidationError::Mismatch)
        }
    }
}

/// Provisions `pin` on the server and records locally that a PIN exists.
///
/// # Errors
/// API or storage failures.
pub async fn create_pin<A: PinApi>(
    api: &A,
    sessions: &SessionStore,
    pin: &Pin,
) -> Result<(), GoldKitError> {
    api.create_pin(pin).await?;
    sessions.set_has_pin()?;
    tracing::info!("mpin created");
    Ok(())
}

/// Validates and submits a reset that proves knowledge of the old PIN.
///
/// # Errors
/// Local validation (format, confirmation mismatch, unchanged PIN) or API
/// failures.
pub async fn reset_pin_with_old<A: PinApi>(
    api: &A,
    old: &str,
    new: &str,
    confirm: &str,
) -> Result<(), GoldKitError> {
    let old = Pin::parse(old)?;
    let new = confirmed(new, confirm)?;
    if old.matches(&new) {
        return Err(PinValidationError::Unchanged.into());
    }
    api.reset_pin_with_old(&old, &new).await?;
    tracing::info!("mpin reset with old pin");
    Ok(())
}

/// Validates and submits a reset after OTP re-verification (forgot flow).
///
/// # Errors
/// Local validation, API or storage failures.
pub async fn reset_pin_direct<A: PinApi>(
    api: &A,
    sessions: &SessionStore,
    new: &str,
    confirm: &str,
) -> Result<(), GoldKitError> {
    let new = confirmed(new, confirm)?;
    api.reset_pin_direct(&new).await?;
    sessions.set_has_pin()?;
    tracing::info!("mpin reset after otp verification");
    Ok(())
}

fn confirmed(new: &str, confirm: &str) -> Result<Pin, PinValidationError> {
    let mut setup = PinSetup::new();
    setup.enter(new)?;
    setup.confirm(confirm)
}
