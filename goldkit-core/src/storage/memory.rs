//! In-memory [`KeyValueStore`], used by tests and by hosts that do not need
//! persistence across restarts.

use std::collections::HashMap;
use std::sync::Mutex;

use super::{KeyValueStore, StorageError, StorageResult};

/// Process-local store backed by a `HashMap`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: String) -> StorageResult<Option<String>> {
        let guard = self
            .values
            .lock()
            .map_err(|_| StorageError::Read("mutex poisoned".to_string()))?;
        Ok(guard.get(&key).cloned())
    }

    fn set(&self, key: String, value: String) -> StorageResult<()> {
        self.values
            .lock()
            .map_err(|_| StorageError::Write("mutex poisoned".to_string()))?
            .insert(key, value);
        Ok(())
    }

    fn remove(&self, key: String) -> StorageResult<()> {
        self.values
            .lock()
            .map_err(|_| StorageError::Write("mutex poisoned".to_string()))?
            .remove(&key);
        Ok(())
    }
}
