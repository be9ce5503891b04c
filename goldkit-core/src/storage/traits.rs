//! Platform interface for persistent key-value storage.

use super::error::StorageResult;

/// String key-value store provided by the host app (`AsyncStorage`,
/// `SharedPreferences`, `UserDefaults`, Keychain, ...).
///
/// Each key is assumed to be written atomically; concurrent writers to the same
/// key resolve last-write-wins.
#[uniffi::export(with_foreign)]
pub trait KeyValueStore: Send + Sync {
    /// Reads the value stored under `key`, if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the read fails.
    fn get(&self, key: String) -> StorageResult<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the write fails.
    fn set(&self, key: String, value: String) -> StorageResult<()>;

    /// Removes `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the delete fails.
    fn remove(&self, key: String) -> StorageResult<()>;
}
