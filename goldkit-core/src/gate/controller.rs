//! Tokio driver for [`PinGate`].

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::runtime::Handle;

use super::config::GateConfig;
use super::machine::{GateEffect, GateSnapshot, PinGate, VerifyOutcome};
use crate::api::PinApi;
use crate::error::GoldKitError;
use crate::navigation::{Navigator, Route};
use crate::session::SessionStore;
use crate::timer::{Deferred, ScheduledTick, TickControl};

const LOCK_TICK: Duration = Duration::from_secs(1);

#[derive(Default)]
struct Timers {
    lock: Option<ScheduledTick>,
    auto_submit: Option<Deferred>,
    // bumped per scheduled auto-submit so a fired task only releases its own handle
    auto_submit_seq: u64,
}

struct Shared<A> {
    gate: Mutex<PinGate>,
    timers: Mutex<Timers>,
    api: Arc<A>,
    navigator: Arc<dyn Navigator>,
    sessions: SessionStore,
    runtime: Handle,
    disposed: AtomicBool,
}

/// Drives a [`PinGate`] for one MPIN screen: runs verify calls, owns the
/// lockout countdown and the auto-submit delay, and talks to the navigator.
///
/// Dropping the controller (or calling [`Self::dispose`]) cancels its timers;
/// responses that arrive afterwards are discarded.
pub struct PinGateController<A: PinApi> {
    shared: Arc<Shared<A>>,
}

impl<A: PinApi> PinGateController<A> {
    /// Creates a controller bound to the current tokio runtime.
    ///
    /// # Errors
    /// [`GoldKitError::Generic`] when called outside a tokio runtime.
    pub fn new(
        api: Arc<A>,
        navigator: Arc<dyn Navigator>,
        sessions: SessionStore,
        config: GateConfig,
    ) -> Result<Self, GoldKitError> {
        let runtime = Handle::try_current().map_err(|e| GoldKitError::Generic {
            error: format!("a tokio runtime is required: {e}"),
        })?;
        Ok(Self {
            shared: Arc::new(Shared {
                gate: Mutex::new(PinGate::new(config)),
                timers: Mutex::new(Timers::default()),
                api,
                navigator,
                sessions,
                runtime,
                disposed: AtomicBool::new(false),
            }),
        })
    }

    /// Keystroke on slot `position`.
    ///
    /// # Errors
    /// [`GoldKitError::Validation`] for a non-digit or bad position.
    pub fn append_digit(&self, value: &str, position: usize) -> Result<(), GoldKitError> {
        let effects = self.shared.gate().append_digit(value, position)?;
        self.shared.apply(effects);
        Ok(())
    }

    /// Backspace on slot `position`.
    ///
    /// # Errors
    /// [`GoldKitError::Validation`] for a bad position.
    pub fn backspace(&self, position: usize) -> Result<(), GoldKitError> {
        let effects = self.shared.gate().backspace(position)?;
        self.shared.apply(effects);
        Ok(())
    }

    /// Verifies the buffer now, cancelling an auto-submit that is still
    /// waiting out its delay.
    ///
    /// Returns once the response has been applied. A no-op while another
    /// verification (manual or automatic) is in flight or while locked; the
    /// in-flight one completes and updates the gate.
    ///
    /// # Errors
    /// [`GoldKitError::Validation`] when fewer than four digits are entered.
    /// Server outcomes are reflected in [`Self::snapshot`], not returned.
    pub async fn submit(&self) -> Result<(), GoldKitError> {
        if let Some(mut pending) = self.shared.timers().auto_submit.take() {
            pending.cancel();
        }
        self.shared.run_submit().await
    }

    /// "Forgot MPIN?" tapped.
    pub fn forgot_pin(&self) {
        let effects = self.shared.gate().forgot_pin();
        self.shared.apply(effects);
    }

    /// Forgot-MPIN confirmed.
    pub fn confirm_forgot(&self) {
        let effects = self.shared.gate().confirm_forgot();
        self.shared.apply(effects);
    }

    /// Forgot-MPIN dismissed.
    pub fn cancel_forgot(&self) {
        let effects = self.shared.gate().cancel_forgot();
        self.shared.apply(effects);
    }

    /// "Create MPIN now" chosen after the server reported no PIN.
    pub fn create_pin_now(&self) {
        let effects = self.shared.gate().create_pin_now();
        self.shared.apply(effects);
    }

    /// Not-provisioned prompt dismissed.
    pub fn cancel_not_provisioned(&self) {
        let effects = self.shared.gate().cancel_not_provisioned();
        self.shared.apply(effects);
    }

    /// Current state for rendering.
    #[must_use]
    pub fn snapshot(&self) -> GateSnapshot {
        self.shared.gate().snapshot()
    }

    /// Stops timers and ignores any later response. Idempotent.
    pub fn dispose(&self) {
        self.shared.dispose();
    }
}

impl<A: PinApi> Drop for PinGateController<A> {
    fn drop(&mut self) {
        self.shared.dispose();
    }
}

impl<A: PinApi> Shared<A> {
    fn gate(&self) -> MutexGuard<'_, PinGate> {
        self.gate.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn timers(&self) -> MutexGuard<'_, Timers> {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    fn dispose(&self) {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return;
        }
        let mut timers = self.timers();
        if let Some(mut lock) = timers.lock.take() {
            lock.cancel();
        }
        if let Some(mut pending) = timers.auto_submit.take() {
            pending.cancel();
        }
        tracing::debug!("mpin gate disposed");
    }

    async fn run_submit(self: &Arc<Self>) -> Result<(), GoldKitError> {
        if self.is_disposed() {
            return Ok(());
        }
        let pin = self.gate().begin_submit()?;
        let Some(pin) = pin else {
            return Ok(());
        };

        let outcome = VerifyOutcome::from_result(self.api.verify_pin(&pin).await);
        drop(pin);

        if self.is_disposed() {
            tracing::debug!("dropping verify response for disposed gate");
            return Ok(());
        }
        let effects = self.gate().complete_submit(outcome);
        self.apply(effects);
        Ok(())
    }

    fn on_lock_tick(self: &Arc<Self>) -> TickControl {
        if self.is_disposed() {
            return TickControl::Stop;
        }
        let (effects, still_locked) = {
            let mut gate = self.gate();
            let effects = gate.tick_lock_timer();
            (effects, gate.lock_state().is_locked())
        };
        self.apply(effects);
        if still_locked {
            TickControl::Continue
        } else {
            TickControl::Stop
        }
    }

    fn apply(self: &Arc<Self>, effects: Vec<GateEffect>) {
        if self.is_disposed() {
            return;
        }
        for effect in effects {
            match effect {
                GateEffect::ScheduleSubmit(delay) => self.schedule_submit(delay),
                GateEffect::StartLockTimer => self.start_lock_timer(),
                GateEffect::StopLockTimer => {
                    // Called from inside the tick; the loop exits on `Stop`,
                    // so the handle only needs to be released.
                    drop(self.timers().lock.take());
                }
                GateEffect::Proceed => self.navigator.reset(vec![Route::Home]),
                GateEffect::BeginCreateFlow => {
                    self.navigator.navigate_to(Route::CreatePin, HashMap::new());
                }
                GateEffect::BeginForgotFlow => {
                    if let Err(e) = self.sessions.clear_pin_flag() {
                        tracing::warn!(error = %e, "failed to clear mpin flag");
                    }
                    self.navigator.navigate_to(Route::ForgotPin, HashMap::new());
                }
                GateEffect::FocusDigit(_)
                | GateEffect::PromptCreatePin
                | GateEffect::PromptForgotConfirm => {}
            }
        }
    }

    fn schedule_submit(self: &Arc<Self>, delay: Duration) {
        let weak: Weak<Self> = Arc::downgrade(self);
        let mut timers = self.timers();
        timers.auto_submit_seq = timers.auto_submit_seq.wrapping_add(1);
        let seq = timers.auto_submit_seq;
        let task = Deferred::start(&self.runtime, delay, async move {
            let Some(shared) = weak.upgrade() else {
                return;
            };
            // Past the delay the verify must run to completion, so a manual
            // submit from here on joins it rather than aborting it.
            shared.release_auto_submit(seq);
            if let Err(e) = shared.run_submit().await {
                tracing::debug!(error = %e, "auto-submit skipped");
            }
        });
        timers.auto_submit = Some(task);
    }

    fn release_auto_submit(&self, seq: u64) {
        let mut timers = self.timers();
        if timers.auto_submit_seq != seq {
            return;
        }
        if let Some(own) = timers.auto_submit.take() {
            own.detach();
        }
    }

    fn start_lock_timer(self: &Arc<Self>) {
        let weak: Weak<Self> = Arc::downgrade(self);
        let tick = ScheduledTick::start(&self.runtime, LOCK_TICK, move || {
            weak.upgrade()
                .map_or(TickControl::Stop, |shared| shared.on_lock_tick())
        });
        self.timers().lock = Some(tick);
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::sync::atomic::AtomicUsize;

    use super::*;
    use crate::gate::{GatePhase, Pin};
    use crate::navigation::test_support::{NavCall, RecordingNavigator};
    use crate::storage::MemoryStore;

    /// Answers verify calls from a script; `correct` is accepted once the
    /// script runs out.
    struct ScriptedApi {
        correct: &'static str,
        script: Mutex<VecDeque<Result<(), GoldKitError>>>,
        verify_calls: AtomicUsize,
        latency: Duration,
    }

    impl ScriptedApi {
        fn new(correct: &'static str) -> Self {
            Self {
                correct,
                script: Mutex::new(VecDeque::new()),
                verify_calls: AtomicUsize::new(0),
                latency: Duration::from_millis(50),
            }
        }

        fn then(self, result: Result<(), GoldKitError>) -> Self {
            self.script.lock().unwrap().push_back(result);
            self
        }

        fn calls(&self) -> usize {
            self.verify_calls.load(Ordering::SeqCst)
        }
    }

    impl PinApi for ScriptedApi {
        async fn create_pin(&self, _pin: &Pin) -> Result<(), GoldKitError> {
            Ok(())
        }

        async fn verify_pin(&self, pin: &Pin) -> Result<(), GoldKitError> {
            self.verify_calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.latency).await;
            let scripted = self.script.lock().unwrap().pop_front();
            scripted.unwrap_or_else(|| {
                if pin.expose() == self.correct {
                    Ok(())
                } else {
                    Err(GoldKitError::PinRejected {
                        message: "Invalid MPIN".to_string(),
                    })
                }
            })
        }

        async fn reset_pin_with_old(&self, _old: &Pin, _new: &Pin) -> Result<(), GoldKitError> {
            Ok(())
        }

        async fn reset_pin_direct(&self, _new: &Pin) -> Result<(), GoldKitError> {
            Ok(())
        }
    }

    struct Fixture {
        api: Arc<ScriptedApi>,
        navigator: Arc<RecordingNavigator>,
        sessions: SessionStore,
        controller: PinGateController<ScriptedApi>,
    }

    fn fixture(api: ScriptedApi) -> Fixture {
        let api = Arc::new(api);
        let navigator = Arc::new(RecordingNavigator::default());
        let sessions = SessionStore::new(Arc::new(MemoryStore::new()));
        let controller = PinGateController::new(
            api.clone(),
            navigator.clone(),
            sessions.clone(),
            GateConfig::default(),
        )
        .expect("inside runtime");
        Fixture {
            api,
            navigator,
            sessions,
            controller,
        }
    }

    fn type_pin(controller: &PinGateController<ScriptedApi>, pin: &str) {
        for (i, c) in pin.chars().enumerate() {
            controller.append_digit(&c.to_string(), i).unwrap();
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_submit_after_fourth_digit() {
        let f = fixture(ScriptedApi::new("5678"));
        type_pin(&f.controller, "5678");
        assert_eq!(f.api.calls(), 0);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(f.api.calls(), 0, "submit waits for the settle delay");

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(f.api.calls(), 1);
        assert_eq!(f.controller.snapshot().phase, GatePhase::Accepted);
        assert_eq!(f.navigator.calls(), vec![NavCall::Reset(vec![Route::Home])]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_submit_cancels_pending_auto_submit() {
        let f = fixture(ScriptedApi::new("5678"));
        type_pin(&f.controller, "1111");
        f.controller.submit().await.unwrap();
        tokio::time::sleep(Duration::from_secs(1)).await;

        assert_eq!(f.api.calls(), 1);
        let snapshot = f.controller.snapshot();
        assert_eq!(snapshot.attempts, 1);
        assert_eq!(snapshot.message.as_deref(), Some("4 attempts remaining"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_submit_during_auto_verify_lets_it_finish() {
        let mut api = ScriptedApi::new("5678");
        api.latency = Duration::from_secs(2);
        let f = fixture(api);
        type_pin(&f.controller, "5678");

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(f.api.calls(), 1);
        assert_eq!(f.controller.snapshot().phase, GatePhase::Submitting);

        f.controller.submit().await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(f.api.calls(), 1);
        assert_eq!(f.controller.snapshot().phase, GatePhase::Accepted);
        assert_eq!(f.navigator.calls(), vec![NavCall::Reset(vec![Route::Home])]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_manual_submit_during_rejected_auto_verify_reenables_input() {
        let mut api = ScriptedApi::new("5678");
        api.latency = Duration::from_secs(2);
        let f = fixture(api);
        type_pin(&f.controller, "1111");

        tokio::time::sleep(Duration::from_millis(300)).await;
        f.controller.submit().await.unwrap();
        tokio::time::sleep(Duration::from_secs(5)).await;

        let snapshot = f.controller.snapshot();
        assert_eq!(f.api.calls(), 1);
        assert_eq!(snapshot.phase, GatePhase::Collecting);
        assert!(snapshot.input_enabled);
        assert_eq!(snapshot.attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_submit_is_single_flight() {
        let f = fixture(ScriptedApi::new("5678"));
        type_pin(&f.controller, "1111");
        let (a, b) = tokio::join!(f.controller.submit(), f.controller.submit());
        a.unwrap();
        b.unwrap();
        assert_eq!(f.api.calls(), 1);
        assert_eq!(f.controller.snapshot().attempts, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_lockout_counts_down_and_unlocks() {
        let f = fixture(ScriptedApi::new("5678"));
        for _ in 0..5 {
            type_pin(&f.controller, "1111");
            f.controller.submit().await.unwrap();
        }
        let snapshot = f.controller.snapshot();
        assert_eq!(snapshot.phase, GatePhase::Locked);
        assert_eq!(snapshot.lock_remaining_seconds, Some(60));
        assert_eq!(
            snapshot.message.as_deref(),
            Some("Account locked for 60 seconds")
        );

        // keystrokes are ignored while locked
        f.controller.append_digit("5", 0).unwrap();
        assert_eq!(f.controller.snapshot().filled, vec![false; 4]);

        tokio::time::sleep(Duration::from_millis(30_500)).await;
        assert_eq!(f.controller.snapshot().lock_remaining_seconds, Some(30));

        tokio::time::sleep(Duration::from_secs(30)).await;
        let snapshot = f.controller.snapshot();
        assert_eq!(snapshot.phase, GatePhase::Collecting);
        assert_eq!(snapshot.attempts, 0);
        assert_eq!(snapshot.lock_remaining_seconds, None);
        assert!(snapshot.input_enabled);

        type_pin(&f.controller, "5678");
        f.controller.submit().await.unwrap();
        assert_eq!(f.controller.snapshot().phase, GatePhase::Accepted);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dispose_stops_lock_timer() {
        let f = fixture(ScriptedApi::new("5678"));
        for _ in 0..5 {
            type_pin(&f.controller, "1111");
            f.controller.submit().await.unwrap();
        }
        tokio::time::sleep(Duration::from_millis(5_500)).await;
        f.controller.dispose();
        tokio::time::sleep(Duration::from_secs(120)).await;

        let snapshot = f.controller.snapshot();
        assert_eq!(snapshot.phase, GatePhase::Locked);
        assert_eq!(snapshot.lock_remaining_seconds, Some(55));
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_response_after_dispose_is_ignored() {
        let mut api = ScriptedApi::new("5678");
        api.latency = Duration::from_secs(2);
        let f = fixture(api);
        type_pin(&f.controller, "5678");

        // auto-submit fires at 150ms, the response arrives ~2s later
        tokio::time::sleep(Duration::from_millis(500)).await;
        assert_eq!(f.api.calls(), 1);
        f.controller.dispose();
        tokio::time::sleep(Duration::from_secs(5)).await;

        assert_eq!(f.controller.snapshot().phase, GatePhase::Submitting);
        assert!(f.navigator.calls().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_not_provisioned_routes_to_create() {
        let f = fixture(ScriptedApi::new("5678").then(Err(GoldKitError::PinNotFound)));
        type_pin(&f.controller, "1234");
        f.controller.submit().await.unwrap();

        let snapshot = f.controller.snapshot();
        assert_eq!(snapshot.phase, GatePhase::NotProvisioned);
        assert_eq!(snapshot.attempts, 0);

        f.controller.create_pin_now();
        assert_eq!(
            f.navigator.calls(),
            vec![NavCall::NavigateTo(Route::CreatePin, HashMap::new())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_forgot_confirm_clears_flag_and_navigates() {
        let f = fixture(ScriptedApi::new("5678"));
        f.sessions.set_has_pin().unwrap();

        f.controller.forgot_pin();
        assert_eq!(f.controller.snapshot().phase, GatePhase::ConfirmingForgot);
        f.controller.confirm_forgot();

        assert!(!f.sessions.has_pin().unwrap());
        assert_eq!(
            f.navigator.calls(),
            vec![NavCall::NavigateTo(Route::ForgotPin, HashMap::new())]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_error_is_not_counted() {
        let f = fixture(ScriptedApi::new("5678").then(Err(GoldKitError::NetworkError {
            url: "https://api.goldsavings.app/api/v1/mpin/verify".to_string(),
            status: None,
            error: "connect refused".to_string(),
        })));
        type_pin(&f.controller, "5678");
        f.controller.submit().await.unwrap();

        let snapshot = f.controller.snapshot();
        assert_eq!(snapshot.attempts, 0);
        assert_eq!(snapshot.phase, GatePhase::Collecting);
        assert!(f.navigator.calls().is_empty());
    }

    #[test]
    fn test_new_outside_runtime_fails() {
        let result = PinGateController::new(
            Arc::new(ScriptedApi::new("5678")),
            Arc::new(RecordingNavigator::default()),
            SessionStore::new(Arc::new(MemoryStore::new())),
            GateConfig::default(),
        );
        assert!(matches!(result, Err(GoldKitError::Generic { .. })));
    }
}
