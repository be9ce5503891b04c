//! The MPIN gate: 4-digit PIN entry, server verification, attempt counting,
//! timed lockout and the forgot/create exits.
//!
//! [`PinGate`] is the I/O-free state machine; [`PinGateController`] runs it on
//! tokio against a [`PinApi`](crate::api::PinApi) and a
//! [`Navigator`](crate::navigation::Navigator).
//!
//! Lockout lives in memory only. Restarting the app clears an active lockout.

mod attempts;
mod buffer;
mod config;
mod controller;
mod lockout;
mod machine;
mod pin;
pub mod setup;

pub use attempts::AttemptCounter;
pub use buffer::PinBuffer;
pub use config::GateConfig;
pub use controller::PinGateController;
pub use lockout::LockState;
pub use machine::{GateEffect, GatePhase, GateSnapshot, PinGate, VerifyOutcome};
pub use pin::{Pin, PinValidationError, PIN_LENGTH};
pub use setup::{PinSetup, SetupStep};
