//! Navigation seam. The core decides *where* to go; the host's router does the
//! going.

use std::collections::HashMap;

use strum::{AsRefStr, Display};

/// Screens the core can route to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, uniffi::Enum, Display, AsRefStr)]
pub enum Route {
    /// Phone number entry.
    Login,
    /// OTP entry after `send_otp`.
    VerifyOtp,
    /// MPIN gate.
    EnterPin,
    /// First-time MPIN creation.
    CreatePin,
    /// Forgot-MPIN flow (OTP re-verification, then direct reset).
    ForgotPin,
    /// Signed-in landing screen.
    Home,
}

/// Router implemented by the host app.
#[uniffi::export(with_foreign)]
pub trait Navigator: Send + Sync {
    /// Pushes `route` with string `params`.
    fn navigate_to(&self, route: Route, params: HashMap<String, String>);

    /// Replaces the current screen with `route`.
    fn replace(&self, route: Route, params: HashMap<String, String>);

    /// Resets the stack to `routes` (last element on top).
    fn reset(&self, routes: Vec<Route>);
}
