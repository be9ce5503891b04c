use std::time::Duration;

use serde::Deserialize;

use crate::error::GoldKitError;

/// Tunables of the MPIN gate.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, uniffi::Record)]
#[serde(default)]
pub struct GateConfig {
    /// Rejected verifications before lockout.
    pub max_attempts: u32,
    /// Lockout length in seconds.
    pub lockout_seconds: u32,
    /// Delay between the fourth digit and the automatic submit.
    pub auto_submit_delay_ms: u64,
    /// Whether a failure to reach the server counts toward lockout.
    pub count_transport_failures: bool,
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            lockout_seconds: 60,
            auto_submit_delay_ms: 150,
            count_transport_failures: false,
        }
    }
}

impl GateConfig {
    /// Parses a JSON object; missing fields take their defaults.
    ///
    /// # Errors
    /// [`GoldKitError::InvalidInput`] on malformed JSON or a zero
    /// `max_attempts`/`lockout_seconds`.
    pub fn from_json(json: &str) -> Result<Self, GoldKitError> {
        let config: Self = serde_json::from_str(json).map_err(|e| GoldKitError::InvalidInput {
            attribute: "gate_config".to_string(),
            reason: e.to_string(),
        })?;
        if config.max_attempts == 0 || config.lockout_seconds == 0 {
            return Err(GoldKitError::InvalidInput {
                attribute: "gate_config".to_string(),
                reason: "max_attempts and lockout_seconds must be positive".to_string(),
            });
        }
        Ok(config)
    }

    /// [`Self::auto_submit_delay_ms`] as a [`Duration`].
    #[must_use]
    pub const fn auto_submit_delay(&self) -> Duration {
        Duration::from_millis(self.auto_submit_delay_ms)
    }
}
