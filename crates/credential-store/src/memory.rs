//! In-memory storage backend.

use crate::{SecureStore, StoreResult};
use std::collections::HashMap;
use std::sync::Mutex;

/// In-memory credential store.
///
/// Nothing survives the process; intended for tests and for ephemeral
/// sessions that should never touch disk.
pub struct MemoryStore {
    data: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self {
            data: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SecureStore for MemoryStore {
    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        self.data
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.data.lock().unwrap().get(key).cloned())
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        Ok(self.data.lock().unwrap().remove(key).is_some())
    }
}
