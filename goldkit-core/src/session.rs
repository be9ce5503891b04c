//! Persisted login state: auth token, user record and the "has MPIN" flag.

use std::sync::Arc;

use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::error::GoldKitError;
use crate::storage::{
    KeyValueStore, StorageError, AUTH_TOKEN_KEY, HAS_MPIN_KEY, USER_KEY,
};

/// The signed-in user as returned by the login endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, uniffi::Record)]
pub struct UserProfile {
    /// Server-side user id.
    pub id: String,
    /// Registered mobile number.
    pub phone: String,
    /// Display name.
    pub name: Option<String>,
    /// Contact email.
    pub email: Option<String>,
}

/// A normalized login result.
#[derive(Debug, Clone)]
pub struct AuthSession {
    /// Bearer token for subsequent API calls.
    pub token: SecretString,
    /// The signed-in user.
    pub user: UserProfile,
}

/// Typed access to the session keys in a [`KeyValueStore`].
#[derive(Clone)]
pub struct SessionStore {
    store: Arc<dyn KeyValueStore>,
}

impl SessionStore {
    /// Wraps a platform store.
    #[must_use]
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    /// Persists the token and user record of `session`.
    ///
    /// # Errors
    /// Storage write failures.
    pub fn save(&self, session: &AuthSession) -> Result<(), GoldKitError> {
        let user = serde_json::to_string(&session.user)?;
        self.store.set(
            AUTH_TOKEN_KEY.to_string(),
            session.token.expose_secret().to_string(),
        )?;
        self.store.set(USER_KEY.to_string(), user)?;
        Ok(())
    }

    /// Loads the stored session. A token without a user record (or the
    /// reverse) is treated as signed out.
    ///
    /// # Errors
    /// Storage read failures, or a user record that no longer decodes.
    pub fn load(&self) -> Result<Option<AuthSession>, GoldKitError> {
        let token = self.store.get(AUTH_TOKEN_KEY.to_string())?;
        let user = self.store.get(USER_KEY.to_string())?;
        match (token, user) {
            (Some(token), Some(user)) => {
                let user: UserProfile = serde_json::from_str(&user)
                    .map_err(|e| StorageError::Serialization(e.to_string()))?;
                Ok(Some(AuthSession {
                    token: SecretString::from(token),
                    user,
                }))
            }
            _ => Ok(None),
        }
    }

    /// Whether an MPIN has been provisioned from this device.
    ///
    /// # Errors
    /// Storage read failures.
    pub fn has_pin(&self) -> Result<bool, GoldKitError> {
        Ok(self
            .store
            .get(HAS_MPIN_KEY.to_string())?
            .is_some_and(|v| v == "true"))
    }

    /// Records that an MPIN now exists.
    ///
    /// # Errors
    /// Storage write failures.
    pub fn set_has_pin(&self) -> Result<(), GoldKitError> {
        self.store
            .set(HAS_MPIN_KEY.to_string(), "true".to_string())?;
        Ok(())
    }

    /// Forgets the MPIN flag, e.g. when the user starts the forgot-PIN flow.
    ///
    /// # Errors
    /// Storage write failures.
    pub fn clear_pin_flag(&self) -> Result<(), GoldKitError> {
        self.store.remove(HAS_MPIN_KEY.to_string())?;
        Ok(())
    }

    /// Removes every session key (logout).
    ///
    /// # Errors
    /// Storage write failures. Keys removed before the failure stay removed.
    pub fn clear(&self) -> Result<(), GoldKitError> {
        for key in [AUTH_TOKEN_KEY, USER_KEY, HAS_MPIN_KEY] {
            self.store.remove(key.to_string())?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn session() -> AuthSession {
        AuthSession {
            token: SecretString::from("tok-123"),
            user: UserProfile {
                id: "42".to_string(),
                phone: "9876543210".to_string(),
                name: Some("Asha".to_string()),
                email: None,
            },
        }
    }

    #[test]
    fn test_save_and_load() {
        let sessions = SessionStore::new(Arc::new(MemoryStore::new()));
        assert!(sessions.load().unwrap().is_none());

        sessions.save(&session()).unwrap();
        let loaded = sessions.load().unwrap().expect("session stored");
        assert_eq!(loaded.token.expose_secret(), "tok-123");
        assert_eq!(loaded.user, session().user);
    }

    #[test]
    fn test_pin_flag_lifecycle() {
        let sessions = SessionStore::new(Arc::new(MemoryStore::new()));
        assert!(!sessions.has_pin().unwrap());
        sessions.set_has_pin().unwrap();
        assert!(sessions.has_pin().unwrap());
        sessions.clear_pin_flag().unwrap();
        assert!(!sessions.has_pin().unwrap());
    }

    #[test]
    fn test_clear_removes_everything() {
        let store = Arc::new(MemoryStore::new());
        let sessions = SessionStore::new(store.clone());
        sessions.save(&session()).unwrap();
        sessions.set_has_pin().unwrap();

        sessions.clear().unwrap();

        assert!(sessions.load().unwrap().is_none());
        assert!(!sessions.has_pin().unwrap());
        assert!(store.get(USER_KEY.to_string()).unwrap().is_none());
    }

    #[test]
    fn test_corrupt_user_record_is_an_error() {
        let store = Arc::new(MemoryStore::new());
        store.set(AUTH_TOKEN_KEY.to_string(), "t".to_string()).unwrap();
        store.set(USER_KEY.to_string(), "{not json".to_string()).unwrap();
        let err = SessionStore::new(store).load().unwrap_err();
        assert!(matches!(
            err,
            GoldKitError::Storage(StorageError::Serialization(_))
        ));
    }
}
