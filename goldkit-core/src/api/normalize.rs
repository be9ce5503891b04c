//! Normalization of login responses into [`AuthSession`].
//!
//! Required shape:
//!
//! ```json
//! {
//!   "token": "<string>",
//!   "user": {
//!     "id": "<string | number>",
//!     "phone": "<string>",
//!     "name": "<string, optional>",
//!     "email": "<string, optional>"
//!   }
//! }
//! ```
//!
//! Anything else is a [`GoldKitError::MalformedResponse`] naming the first
//! offending field. Unknown extra fields are ignored.

use secrecy::SecretString;
use serde_json::Value;

use crate::error::GoldKitError;
use crate::session::{AuthSession, UserProfile};

/// Turns a login response body into an [`AuthSession`].
///
/// # Errors
/// [`GoldKitError::MalformedResponse`] when a required field is missing,
/// empty, or of the wrong type.
pub fn normalize_auth_response(
    endpoint: &str,
    body: &Value,
) -> Result<AuthSession, GoldKitError> {
    let missing = |field: &str| GoldKitError::MalformedResponse {
        endpoint: endpoint.to_string(),
        field: field.to_string(),
    };

    let token = non_empty_str(body.get("token")).ok_or_else(|| missing("token"))?;
    let user = body
        .get("user")
        .filter(|u| u.is_object())
        .ok_or_else(|| missing("user"))?;

    let id = match user.get("id") {
        Some(Value::String(s)) if !s.is_empty() => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => return Err(missing("user.id")),
    };
    let phone = non_empty_str(user.get("phone")).ok_or_else(|| missing("user.phone"))?;

    Ok(AuthSession {
        token: SecretString::from(token),
        user: UserProfile {
            id,
            phone: phone.to_string(),
            name: non_empty_str(user.get("name")).map(str::to_string),
            email: non_empty_str(user.get("email")).map(str::to_string),
        },
    })
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;
    use serde_json::json;
    use test_case::test_case;

    const ENDPOINT: &str = "/api/v1/auth/verify-otp";

    #[test]
    fn test_full_response() {
        let session = normalize_auth_response(
            ENDPOINT,
            &json!({
                "token": "abc",
                "user": {"id": 7, "phone": "9876543210", "name": "Ravi", "email": "", "kyc": true}
            }),
        )
        .expect("valid response");

        assert_eq!(session.token.expose_secret(), "abc");
        assert_eq!(session.user.id, "7");
        assert_eq!(session.user.phone, "9876543210");
        assert_eq!(session.user.name.as_deref(), Some("Ravi"));
        assert_eq!(session.user.email, None);
    }

    #[test_case(json!({"user": {"id": "1", "phone": "1"}}), "token" ; "no token")]
    #[test_case(json!({"token": "", "user": {"id": "1", "phone": "1"}}), "token" ; "empty token")]
    #[test_case(json!({"token": 5, "user": {"id": "1", "phone": "1"}}), "token" ; "numeric token")]
    #[test_case(json!({"token": "t"}), "user" ; "no user")]
    #[test_case(json!({"token": "t", "user": "bob"}), "user" ; "user not object")]
    #[test_case(json!({"token": "t", "user": {"phone": "1"}}), "user.id" ; "no id")]
    #[test_case(json!({"token": "t", "user": {"id": true, "phone": "1"}}), "user.id" ; "bool id")]
    #[test_case(json!({"token": "t", "user": {"id": "1", "mobile": "1"}}), "user.phone" ; "phone under another name")]
    fn test_missing_required_field(body: Value, expected: &str) {
        match normalize_auth_response(ENDPOINT, &body) {
            Err(GoldKitError::MalformedResponse { endpoint, field }) => {
                assert_eq!(endpoint, ENDPOINT);
                assert_eq!(field, expected);
            }
            other => panic!("expected MalformedResponse, got {other:?}"),
        }
    }
}
