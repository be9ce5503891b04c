//! The MPIN gate as a synchronous state machine.
//!
//! [`PinGate`] performs no I/O. Every operation mutates the state and returns
//! the [`GateEffect`]s a driver has to carry out (start a timer, navigate,
//! ...). [`PinGateController`](super::PinGateController) is the tokio driver.

use std::time::Duration;

use super::attempts::AttemptCounter;
use super::buffer::PinBuffer;
use super::config::GateConfig;
use super::lockout::LockState;
use super::pin::{Pin, PinValidationError, PIN_LENGTH};
use crate::error::GoldKitError;

const NETWORK_MESSAGE: &str = "Unable to reach the server. Please try again";

/// Coarse state of the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, uniffi::Enum)]
pub enum GatePhase {
    /// Nothing typed yet.
    Idle,
    /// Accepting digits.
    Collecting,
    /// A verification request is in flight.
    Submitting,
    /// The PIN was accepted; the screen is about to be left.
    Accepted,
    /// Too many failures; entry suspended until the countdown ends.
    Locked,
    /// The server has no PIN for this account; waiting for create/cancel.
    NotProvisioned,
    /// Waiting for the user to confirm or cancel "forgot MPIN".
    ConfirmingForgot,
}

/// Result of one verify call, as seen by the gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VerifyOutcome {
    /// PIN accepted.
    Success,
    /// Server rejected the PIN.
    InvalidPin {
        /// Server provided reason.
        message: String,
    },
    /// Server has no PIN for this account.
    PinNotFound,
    /// The server could not be reached or failed to answer.
    Transport {
        /// Error description, for logs.
        error: String,
    },
}

impl VerifyOutcome {
    /// Classifies the result of [`PinApi::verify_pin`](crate::api::PinApi::verify_pin).
    ///
    /// Only an explicit rejection is `InvalidPin`. Anything that is not an
    /// answer about the PIN (transport, malformed body, storage) is treated
    /// as `Transport`.
    #[must_use]
    pub fn from_result(result: Result<(), GoldKitError>) -> Self {
        match result {
            Ok(()) => Self::Success,
            Err(GoldKitError::PinNotFound) => Self::PinNotFound,
            Err(GoldKitError::PinRejected { message }) => Self::InvalidPin { message },
            Err(other) => Self::Transport {
                error: other.to_string(),
            },
        }
    }
}

/// Work the driver must perform after an operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateEffect {
    /// Submit the buffer after `delay` unless something else happens first.
    ScheduleSubmit(Duration),
    /// Move keyboard focus to a slot.
    FocusDigit(usize),
    /// Start the one-second lockout countdown.
    StartLockTimer,
    /// Stop the lockout countdown.
    StopLockTimer,
    /// PIN accepted: leave the gate.
    Proceed,
    /// Ask "no MPIN set, create one now?".
    PromptCreatePin,
    /// Ask "reset your MPIN?".
    PromptForgotConfirm,
    /// User chose to create a PIN.
    BeginCreateFlow,
    /// User confirmed the forgot-PIN flow.
    BeginForgotFlow,
}

/// Full observable state, for rendering.
#[derive(Debug, Clone, PartialEq, Eq, uniffi::Record)]
pub struct GateSnapshot {
    /// Coarse state.
    pub phase: GatePhase,
    /// Which slots hold a digit.
    pub filled: Vec<bool>,
    /// Focused slot.
    pub focus: u32,
    /// Rejections counted so far.
    pub attempts: u32,
    /// Rejections left before lockout.
    pub attempts_remaining: u32,
    /// Countdown while locked.
    pub lock_remaining_seconds: Option<u32>,
    /// Inline message for the user.
    pub message: Option<String>,
    /// Whether the keypad accepts input.
    pub input_enabled: bool,
}

/// MPIN entry, verification and lockout state.
#[derive(Debug)]
pub struct PinGate {
    config: GateConfig,
    buffer: PinBuffer,
    attempts: AttemptCounter,
    lock: LockState,
    phase: GatePhase,
    message: Option<String>,
}

impl PinGate {
    /// A gate in [`GatePhase::Idle`].
    #[must_use]
    pub fn new(config: GateConfig) -> Self {
        let attempts = AttemptCounter::new(config.max_attempts);
        Self {
            config,
            buffer: PinBuffer::new(),
            attempts,
            lock: LockState::Unlocked,
            phase: GatePhase::Idle,
            message: None,
        }
    }

    /// Current phase.
    #[must_use]
    pub const fn phase(&self) -> GatePhase {
        self.phase
    }

    /// Rejections counted so far.
    #[must_use]
    pub const fn attempts(&self) -> u32 {
        self.attempts.count()
    }

    /// Lockout state.
    #[must_use]
    pub const fn lock_state(&self) -> LockState {
        self.lock
    }

    /// Inline message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    const fn accepts_input(&self) -> bool {
        matches!(self.phase, GatePhase::Idle | GatePhase::Collecting) && !self.lock.is_locked()
    }

    /// Keystroke on slot `position`. A no-op while input is disabled.
    ///
    /// # Errors
    /// The keystroke was not a single digit, or the position is out of range.
    pub fn append_digit(
        &mut self,
        value: &str,
        position: usize,
    ) -> Result<Vec<GateEffect>, PinValidationError> {
        if !self.accepts_input() {
            return Ok(Vec::new());
        }
        self.buffer.set(position, value)?;
        self.phase = GatePhase::Collecting;
        self.message = None;

        let mut effects = Vec::new();
        if value.is_empty() {
            return Ok(effects);
        }
        if position < PIN_LENGTH - 1 {
            effects.push(GateEffect::FocusDigit(position + 1));
        } else if self.buffer.is_complete() {
            effects.push(GateEffect::ScheduleSubmit(self.config.auto_submit_delay()));
        }
        Ok(effects)
    }

    /// Backspace on slot `position`. A no-op while input is disabled.
    ///
    /// # Errors
    /// Position out of range.
    pub fn backspace(&mut self, position: usize) -> Result<Vec<GateEffect>, PinValidationError> {
        if !self.accepts_input() {
            return Ok(Vec::new());
        }
        self.buffer.backspace(position)?;
        self.phase = GatePhase::Collecting;
        Ok(vec![GateEffect::FocusDigit(self.buffer.focus())])
    }

    /// Starts a verification. Returns `Ok(None)` when one is already in flight
    /// or the gate is not accepting input.
    ///
    /// # Errors
    /// [`PinValidationError::Incomplete`] if fewer than four digits are set.
    pub fn begin_submit(&mut self) -> Result<Option<Pin>, PinValidationError> {
        if !self.accepts_input() {
            return Ok(None);
        }
        match self.buffer.to_pin() {
            Ok(pin) => {
                self.phase = GatePhase::Submitting;
                self.message = None;
                Ok(Some(pin))
            }
            Err(err) => {
                self.message = Some(err.to_string());
                Err(err)
            }
        }
    }

    /// Applies the verify result. Ignored unless a submit is in flight.
    pub fn complete_submit(&mut self, outcome: VerifyOutcome) -> Vec<GateEffect> {
        if self.phase != GatePhase::Submitting {
            return Vec::new();
        }
        self.buffer.clear();

        match outcome {
            VerifyOutcome::Success => {
                self.attempts.reset();
                self.phase = GatePhase::Accepted;
                self.message = None;
                vec![GateEffect::Proceed]
            }
            VerifyOutcome::PinNotFound => {
                self.phase = GatePhase::NotProvisioned;
                self.message = None;
                vec![GateEffect::PromptCreatePin]
            }
            VerifyOutcome::InvalidPin { message } => {
                tracing::debug!(reason = %message, "mpin rejected");
                self.record_rejection()
            }
            VerifyOutcome::Transport { error } => {
                tracing::warn!(%error, "mpin verification could not reach the server");
                if self.config.count_transport_failures {
                    self.record_rejection()
                } else {
                    self.phase = GatePhase::Collecting;
                    self.message = Some(NETWORK_MESSAGE.to_string());
                    vec![GateEffect::FocusDigit(0)]
                }
            }
        }
    }

    fn record_rejection(&mut self) -> Vec<GateEffect> {
        let remaining = self.attempts.record_failure();
        if self.attempts.is_exhausted() {
            self.lock = LockState::locked_for(self.config.lockout_seconds);
            self.phase = GatePhase::Locked;
            self.message = Some(format!(
                "Account locked for {} seconds",
                self.config.lockout_seconds
            ));
            tracing::info!(
                lockout_seconds = self.config.lockout_seconds,
                "mpin entry locked"
            );
            vec![GateEffect::StartLockTimer]
        } else {
            self.phase = GatePhase::Collecting;
            self.message = Some(if remaining == 1 {
                "1 attempt remaining".to_string()
            } else {
                format!("{remaining} attempts remaining")
            });
            vec![GateEffect::FocusDigit(0)]
        }
    }

    /// One second of lockout elapsed.
    pub fn tick_lock_timer(&mut self) -> Vec<GateEffect> {
        if !self.lock.tick() {
            return Vec::new();
        }
        self.attempts.reset();
        self.buffer.clear();
        self.phase = GatePhase::Collecting;
        self.message = None;
        tracing::info!("mpin lockout expired");
        vec![GateEffect::StopLockTimer, GateEffect::FocusDigit(0)]
    }

    /// "Forgot MPIN?" tapped. Refused while locked, while a verification
    /// is in flight, and while the create-or-cancel prompt is up.
    pub fn forgot_pin(&mut self) -> Vec<GateEffect> {
        if self.lock.is_locked()
            || matches!(
                self.phase,
                GatePhase::Submitting
                    | GatePhase::Accepted
                    | GatePhase::ConfirmingForgot
                    | GatePhase::NotProvisioned
            )
        {
            return Vec::new();
        }
        self.phase = GatePhase::ConfirmingForgot;
        vec![GateEffect::PromptForgotConfirm]
    }

    /// Forgot-MPIN confirmed: local PIN state is dropped.
    pub fn confirm_forgot(&mut self) -> Vec<GateEffect> {
        if self.phase != GatePhase::ConfirmingForgot {
            return Vec::new();
        }
        self.buffer.clear();
        self.attempts.reset();
        self.message = None;
        self.phase = GatePhase::Idle;
        vec![GateEffect::BeginForgotFlow]
    }

    /// Forgot-MPIN dismissed: back to an empty keypad. Attempts are kept.
    pub fn cancel_forgot(&mut self) -> Vec<GateEffect> {
        if self.phase != GatePhase::ConfirmingForgot {
            return Vec::new();
        }
        self.reset_to_collecting()
    }

    /// "Create MPIN now" chosen from the not-provisioned prompt.
    pub fn create_pin_now(&mut self) -> Vec<GateEffect> {
        if self.phase != GatePhase::NotProvisioned {
            return Vec::new();
        }
        self.buffer.clear();
        self.phase = GatePhase::Idle;
        vec![GateEffect::BeginCreateFlow]
    }

    /// Not-provisioned prompt dismissed.
    pub fn cancel_not_provisioned(&mut self) -> Vec<GateEffect> {
        if self.phase != GatePhase::NotProvisioned {
            return Vec::new();
        }
        self.reset_to_collecting()
    }

    fn reset_to_collecting(&mut self) -> Vec<GateEffect> {
        self.buffer.clear();
        self.message = None;
        self.phase = GatePhase::Collecting;
        vec![GateEffect::FocusDigit(0)]
    }

    /// Observable state.
    #[must_use]
    #[allow(clippy::cast_possible_truncation)]
    pub fn snapshot(&self) -> GateSnapshot {
        GateSnapshot {
            phase: self.phase,
            filled: self.buffer.filled(),
            focus: self.buffer.focus() as u32,
            attempts: self.attempts.count(),
            attempts_remaining: self.attempts.remaining(),
            lock_remaining_seconds: self.lock.remaining_seconds(),
            message: self.message.clone(),
            input_enabled: self.accepts_input(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gate() -> PinGate {
        PinGate::new(GateConfig::default())
    }

    fn type_pin(gate: &mut PinGate, pin: &str) -> Vec<GateEffect> {
        let mut last = Vec::new();
        for (i, c) in pin.chars().enumerate() {
            last = gate.append_digit(&c.to_string(), i).unwrap();
        }
        last
    }

    fn submit(gate: &mut PinGate, pin: &str, outcome: VerifyOutcome) -> Vec<GateEffect> {
        type_pin(gate, pin);
        gate.begin_submit().unwrap().expect("submit starts");
        gate.complete_submit(outcome)
    }

    fn invalid() -> VerifyOutcome {
        VerifyOutcome::InvalidPin {
            message: "Invalid MPIN".to_string(),
        }
    }

    #[test]
    fn test_fourth_digit_schedules_submit() {
        let mut gate = gate();
        assert_eq!(
            gate.append_digit("1", 0).unwrap(),
            vec![GateEffect::FocusDigit(1)]
        );
        gate.append_digit("2", 1).unwrap();
        gate.append_digit("3", 2).unwrap();
        assert_eq!(
            gate.append_digit("4", 3).unwrap(),
            vec![GateEffect::ScheduleSubmit(Duration::from_millis(150))]
        );
        assert_eq!(gate.phase(), GatePhase::Collecting);
    }

    #[test]
    fn test_last_slot_without_full_buffer_does_not_submit() {
        let mut gate = gate();
        gate.append_digit("1", 0).unwrap();
        assert!(gate.append_digit("4", 3).unwrap().is_empty());
    }

    #[test]
    fn test_incomplete_submit_is_local_error() {
        let mut gate = gate();
        gate.append_digit("1", 0).unwrap();
        assert_eq!(gate.begin_submit().unwrap_err(), PinValidationError::Incomplete);
        assert_eq!(gate.phase(), GatePhase::Collecting);
        assert_eq!(gate.message(), Some("Please enter a 4 digit MPIN"));
    }

    #[test]
    fn test_only_one_submit_in_flight() {
        let mut gate = gate();
        type_pin(&mut gate, "1234");
        assert!(gate.begin_submit().unwrap().is_some());
        assert!(gate.begin_submit().unwrap().is_none());
        assert_eq!(gate.phase(), GatePhase::Submitting);
        // keystrokes are ignored while submitting
        assert!(gate.append_digit("9", 0).unwrap().is_empty());
    }

    #[test]
    fn test_first_rejection_message() {
        let mut gate = gate();
        let effects = submit(&mut gate, "1234", invalid());

        assert_eq!(effects, vec![GateEffect::FocusDigit(0)]);
        assert_eq!(gate.attempts(), 1);
        assert_eq!(gate.phase(), GatePhase::Collecting);
        assert_eq!(gate.message(), Some("4 attempts remaining"));
        let snapshot = gate.snapshot();
        assert_eq!(snapshot.filled, vec![false; 4]);
        assert_eq!(snapshot.focus, 0);
    }

    #[test]
    fn test_fifth_rejection_locks() {
        let mut gate = gate();
        for _ in 0..4 {
            submit(&mut gate, "1234", invalid());
        }
        assert_eq!(gate.message(), Some("1 attempt remaining"));

        let effects = submit(&mut gate, "1234", invalid());
        assert_eq!(effects, vec![GateEffect::StartLockTimer]);
        assert_eq!(gate.phase(), GatePhase::Locked);
        assert_eq!(
            gate.lock_state(),
            LockState::Locked {
                remaining_seconds: 60
            }
        );
        assert_eq!(gate.message(), Some("Account locked for 60 seconds"));
        assert!(!gate.snapshot().input_enabled);

        // input, submit and forgot are all refused while locked
        assert!(gate.append_digit("1", 0).unwrap().is_empty());
        assert!(gate.backspace(0).unwrap().is_empty());
        assert!(gate.begin_submit().unwrap().is_none());
        assert!(gate.forgot_pin().is_empty());
        assert_eq!(gate.snapshot().filled, vec![false; 4]);
    }

    #[test]
    fn test_sixty_ticks_unlock() {
        let mut gate = gate();
        for _ in 0..5 {
            submit(&mut gate, "1234", invalid());
        }

        for _ in 0..59 {
            assert!(gate.tick_lock_timer().is_empty());
        }
        assert_eq!(gate.lock_state().remaining_seconds(), Some(1));

        let effects = gate.tick_lock_timer();
        assert_eq!(
            effects,
            vec![GateEffect::StopLockTimer, GateEffect::FocusDigit(0)]
        );
        assert_eq!(gate.phase(), GatePhase::Collecting);
        assert_eq!(gate.attempts(), 0);
        assert_eq!(gate.lock_state(), LockState::Unlocked);
        let snapshot = gate.snapshot();
        assert_eq!(snapshot.filled, vec![false; 4]);
        assert_eq!(snapshot.focus, 0);
        assert!(snapshot.input_enabled);
        assert!(gate.tick_lock_timer().is_empty());
    }

    #[test]
    fn test_success_first_try() {
        let mut gate = gate();
        let effects = submit(&mut gate, "5678", VerifyOutcome::Success);
        assert_eq!(effects, vec![GateEffect::Proceed]);
        assert_eq!(gate.phase(), GatePhase::Accepted);
        assert_eq!(gate.attempts(), 0);
        // a stray second completion does nothing
        assert!(gate.complete_submit(VerifyOutcome::Success).is_empty());
    }

    #[test]
    fn test_success_resets_attempts() {
        let mut gate = gate();
        submit(&mut gate, "1234", invalid());
        submit(&mut gate, "1234", invalid());
        submit(&mut gate, "5678", VerifyOutcome::Success);
        assert_eq!(gate.attempts(), 0);
    }

    #[test]
    fn test_pin_not_found_does_not_count() {
        let mut gate = gate();
        submit(&mut gate, "1234", invalid());
        let effects = submit(&mut gate, "4321", VerifyOutcome::PinNotFound);

        assert_eq!(effects, vec![GateEffect::PromptCreatePin]);
        assert_eq!(gate.phase(), GatePhase::NotProvisioned);
        assert_eq!(gate.attempts(), 1);
        assert!(gate.append_digit("1", 0).unwrap().is_empty());
        assert!(gate.begin_submit().unwrap().is_none());
    }

    #[test]
    fn test_not_provisioned_exits() {
        let mut gate = gate();
        submit(&mut gate, "1234", VerifyOutcome::PinNotFound);
        assert_eq!(gate.create_pin_now(), vec![GateEffect::BeginCreateFlow]);
        assert_eq!(gate.phase(), GatePhase::Idle);

        let mut gate = self::gate();
        submit(&mut gate, "1234", VerifyOutcome::PinNotFound);
        assert_eq!(gate.cancel_not_provisioned(), vec![GateEffect::FocusDigit(0)]);
        assert_eq!(gate.phase(), GatePhase::Collecting);
        assert!(gate.create_pin_now().is_empty());
    }

    #[test]
    fn test_transport_failure_not_counted_by_default() {
        let mut gate = gate();
        submit(
            &mut gate,
            "1234",
            VerifyOutcome::Transport {
                error: "timeout".to_string(),
            },
        );
        assert_eq!(gate.attempts(), 0);
        assert_eq!(gate.phase(), GatePhase::Collecting);
        assert_eq!(gate.message(), Some(NETWORK_MESSAGE));
    }

    #[test]
    fn test_transport_failure_counted_when_configured() {
        let mut gate = PinGate::new(GateConfig {
            count_transport_failures: true,
            ..GateConfig::default()
        });
        submit(
            &mut gate,
            "1234",
            VerifyOutcome::Transport {
                error: "timeout".to_string(),
            },
        );
        assert_eq!(gate.attempts(), 1);
        assert_eq!(gate.message(), Some("4 attempts remaining"));
    }

    #[test]
    fn test_forgot_then_cancel_returns_to_clean_collecting() {
        let mut gate = gate();
        submit(&mut gate, "1234", invalid());
        gate.append_digit("9", 0).unwrap();
        gate.append_digit("8", 1).unwrap();

        assert_eq!(gate.forgot_pin(), vec![GateEffect::PromptForgotConfirm]);
        assert_eq!(gate.phase(), GatePhase::ConfirmingForgot);
        assert!(gate.append_digit("7", 2).unwrap().is_empty());

        assert_eq!(gate.cancel_forgot(), vec![GateEffect::FocusDigit(0)]);
        let snapshot = gate.snapshot();
        assert_eq!(snapshot.phase, GatePhase::Collecting);
        assert_eq!(snapshot.filled, vec![false; 4]);
        assert_eq!(snapshot.focus, 0);
        assert_eq!(snapshot.attempts, 1);
        assert_eq!(snapshot.lock_remaining_seconds, None);
    }

    #[test]
    fn test_forgot_refused_while_not_provisioned() {
        let mut gate = gate();
        submit(&mut gate, "1234", VerifyOutcome::PinNotFound);

        assert!(gate.forgot_pin().is_empty());
        assert_eq!(gate.phase(), GatePhase::NotProvisioned);
        assert!(gate.cancel_forgot().is_empty());
        assert!(gate.confirm_forgot().is_empty());
        assert_eq!(gate.phase(), GatePhase::NotProvisioned);

        // the prompt's own exits still work
        assert_eq!(gate.create_pin_now(), vec![GateEffect::BeginCreateFlow]);
    }

    #[test]
    fn test_forgot_confirm_clears_state() {
        let mut gate = gate();
        submit(&mut gate, "1234", invalid());
        gate.forgot_pin();
        assert_eq!(gate.confirm_forgot(), vec![GateEffect::BeginForgotFlow]);
        assert_eq!(gate.attempts(), 0);
        assert_eq!(gate.phase(), GatePhase::Idle);
        assert!(gate.confirm_forgot().is_empty());
    }

    #[test]
    fn test_from_result_classification() {
        assert_eq!(VerifyOutcome::from_result(Ok(())), VerifyOutcome::Success);
        assert_eq!(
            VerifyOutcome::from_result(Err(GoldKitError::PinNotFound)),
            VerifyOutcome::PinNotFound
        );
        assert_eq!(
            VerifyOutcome::from_result(Err(GoldKitError::PinRejected {
                message: "Invalid MPIN".to_string()
            })),
            invalid()
        );
        assert!(matches!(
            VerifyOutcome::from_result(Err(GoldKitError::NetworkError {
                url: "u".to_string(),
                status: None,
                error: "connect".to_string(),
            })),
            VerifyOutcome::Transport { .. }
        ));
    }
}
