//! JSON file-backed [`KeyValueStore`] for the terminal.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use goldkit_core::storage::{KeyValueStore, StorageError, StorageResult};

/// All keys live in one JSON object, rewritten on every change.
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileStore {
    /// Opens (or starts) `dir/session.json`.
    ///
    /// # Errors
    /// The directory cannot be created or the file is not a JSON object of
    /// strings.
    pub fn open(dir: &Path) -> StorageResult<Self> {
        fs::create_dir_all(dir).map_err(|e| StorageError::Write(e.to_string()))?;
        let path = dir.join("session.json");
        let entries = match fs::read_to_string(&path) {
            Ok(text) => serde_json::from_str(&text)
                .map_err(|e| StorageError::Serialization(e.to_string()))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::new(),
            Err(e) => return Err(StorageError::Read(e.to_string())),
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    fn persist(&self, entries: &HashMap<String, String>) -> StorageResult<()> {
        let text = serde_json::to_string_pretty(entries)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, text).map_err(|e| StorageError::Write(e.to_string()))?;
        fs::rename(&tmp, &self.path).map_err(|e| StorageError::Write(e.to_string()))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: String) -> StorageResult<Option<String>> {
        let entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(entries.get(&key).cloned())
    }

    fn set(&self, key: String, value: String) -> StorageResult<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(key, value);
        self.persist(&entries)
    }

    fn remove(&self, key: String) -> StorageResult<()> {
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        if entries.remove(&key).is_some() {
            self.persist(&entries)?;
        }
        Ok(())
    }
}
