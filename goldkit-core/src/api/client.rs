use std::sync::RwLock;

use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;

use super::normalize::normalize_auth_response;
use super::types::{
    ErrorBody, MpinBody, RegisterPushBody, ResetPinBody, ResetPinDirectBody, SendOtpBody,
    VerifyOtpBody, CREATE_PIN_PATH, PIN_NOT_FOUND, REGISTER_PUSH_PATH, RESET_PIN_DIRECT_PATH,
    RESET_PIN_PATH, SEND_OTP_PATH, VERIFY_OTP_PATH, VERIFY_PIN_PATH,
};
use super::{AuthApi, PinApi};
use crate::defaults::ApiConfig;
use crate::error::GoldKitError;
use crate::gate::Pin;
use crate::http_request::{Request, RetryPolicy};
use crate::session::AuthSession;

/// `reqwest` client for the gold savings REST API.
pub struct GoldApiClient {
    config: ApiConfig,
    request: Request,
    token: RwLock<Option<SecretString>>,
}

impl GoldApiClient {
    /// Creates a client with no session token.
    #[must_use]
    pub fn new(config: ApiConfig) -> Self {
        let request = Request::new(&config);
        Self {
            config,
            request,
            token: RwLock::new(None),
        }
    }

    fn bearer(&self) -> Option<String> {
        let guard = self
            .token
            .read()
            .unwrap_or_else(std::sync::PoisonError::into_inner);
        guard
            .as_ref()
            .map(|t| format!("Bearer {}", t.expose_secret()))
    }

    /// Posts `body` as JSON and returns the status and raw response text.
    async fn post_json<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
        policy: RetryPolicy,
    ) -> Result<(String, u16, String), GoldKitError> {
        let url = self.config.endpoint(path);
        let mut builder = self.request.post(&url).json(body);
        if let Some(bearer) = self.bearer() {
            builder = builder.header("Authorization", bearer);
        }

        let response = self.request.handle(builder, policy).await?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| GoldKitError::NetworkError {
            url: url.clone(),
            status: Some(status),
            error: format!("failed to read response body: {e}"),
        })?;
        tracing::debug!(path, status, "api response");
        Ok((url, status, text))
    }

    /// Posts `body` and maps the outcome to `Ok(())` or a typed error.
    async fn post_ack<B: Serialize + Sync>(
        &self,
        path: &str,
        body: &B,
        policy: RetryPolicy,
    ) -> Result<(), GoldKitError> {
        let (url, status, text) = self.post_json(path, body, policy).await?;
        interpret(&url, status, &text)
    }
}

/// Maps an HTTP status and body to the error convention documented on
/// [`PinApi`]. A 2xx carrying an `error` field is still a rejection.
///
/// 401 (expired session), 408 and 429 say nothing about the submitted PIN
/// and surface as [`GoldKitError::NetworkError`] so they never count as a
/// failed attempt.
fn interpret(url: &str, status: u16, text: &str) -> Result<(), GoldKitError> {
    let body = ErrorBody::parse(text);
    match status {
        200..=299 => match body.error.as_deref().filter(|e| !e.trim().is_empty()) {
            Some(reason) => Err(domain_error(reason)),
            None => Ok(()),
        },
        401 | 408 | 429 => Err(GoldKitError::NetworkError {
            url: url.to_string(),
            status: Some(status),
            error: body.reason().unwrap_or("request not processed").to_string(),
        }),
        400..=499 => Err(domain_error(body.reason().unwrap_or("request rejected"))),
        _ => Err(GoldKitError::NetworkError {
            url: url.to_string(),
            status: Some(status),
            error: body.reason().unwrap_or(text).to_string(),
        }),
    }
}

fn domain_error(reason: &str) -> GoldKitError {
    if reason.to_ascii_lowercase().contains(PIN_NOT_FOUND) {
        GoldKitError::PinNotFound
    } else {
        GoldKitError::PinRejected {
            message: reason.to_string(),
        }
    }
}

impl PinApi for GoldApiClient {
    async fn create_pin(&self, pin: &Pin) -> Result<(), GoldKitError> {
        self.post_ack(
            CREATE_PIN_PATH,
            &MpinBody { mpin: pin.expose() },
            RetryPolicy::Transient,
        )
        .await
    }

    async fn verify_pin(&self, pin: &Pin) -> Result<(), GoldKitError> {
        self.post_ack(
            VERIFY_PIN_PATH,
            &MpinBody { mpin: pin.expose() },
            RetryPolicy::ConnectOnly,
        )
        .await
    }

    async fn reset_pin_with_old(&self, old: &Pin, new: &Pin) -> Result<(), GoldKitError> {
        self.post_ack(
            RESET_PIN_PATH,
            &ResetPinBody {
                old_mpin: old.expose(),
                new_mpin: new.expose(),
            },
            RetryPolicy::ConnectOnly,
        )
        .await
    }

    async fn reset_pin_direct(&self, new: &Pin) -> Result<(), GoldKitError> {
        self.post_ack(
            RESET_PIN_DIRECT_PATH,
            &ResetPinDirectBody {
                new_mpin: new.expose(),
            },
            RetryPolicy::Transient,
        )
        .await
    }
}

impl AuthApi for GoldApiClient {
    fn set_auth_token(&self, token: Option<SecretString>) {
        match self.token.write() {
            Ok(mut guard) => *guard = token,
            Err(poisoned) => *poisoned.into_inner() = token,
        }
    }

    async fn send_otp(&self, phone: &str) -> Result<(), GoldKitError> {
        self.post_ack(SEND_OTP_PATH, &SendOtpBody { phone }, RetryPolicy::ConnectOnly)
            .await
    }

    async fn verify_otp(&self, phone: &str, otp: &str) -> Result<AuthSession, GoldKitError> {
        let (url, status, text) = self
            .post_json(
                VERIFY_OTP_PATH,
                &VerifyOtpBody { phone, otp },
                RetryPolicy::ConnectOnly,
            )
            .await?;
        interpret(&url, status, &text)?;
        let body: serde_json::Value = serde_json::from_str(&text)?;
        normalize_auth_response(VERIFY_OTP_PATH, &body)
    }

    async fn register_push_token(&self, token: &str, platform: &str) -> Result<(), GoldKitError> {
        self.post_ack(
            REGISTER_PUSH_PATH,
            &RegisterPushBody { token, platform },
            RetryPolicy::Transient,
        )
        .await
    }
}
