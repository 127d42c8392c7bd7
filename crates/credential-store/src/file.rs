//! File-backed storage backend.
//!
//! Stores all keys in a single JSON document. Writes are
//! read-modify-write under a lock, and the file is created with `0o600`
//! on Unix so credentials are only readable by the owning user.

use crate::{SecureStore, StoreError, StoreResult};
use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::{Read, Write};
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::path::PathBuf;
use std::sync::Mutex;

/// Default location for the credential file under the platform data dir.
pub fn default_store_path() -> StoreResult<PathBuf> {
    let base = dirs::data_dir()
        .ok_or_else(|| StoreError::Backend("could not determine data directory".to_string()))?;
    Ok(base.join("authgate").join("credentials.json"))
}

/// File-backed credential store.
pub struct FileStore {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process.
    lock: Mutex<()>,
}

impl FileStore {
    /// Create a store backed by the given file.
    ///
    /// The file and its parent directories are created lazily on first
    /// write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &PathBuf {
        &self.path
    }

    fn read_document(&self) -> StoreResult<HashMap<String, String>> {
        let mut file = match std::fs::File::open(&self.path) {
            Ok(f) => f,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                return Ok(HashMap::new());
            }
            Err(err) => return Err(err.into()),
        };

        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        if contents.trim().is_empty() {
            return Ok(HashMap::new());
        }

        serde_json::from_str(&contents).map_err(|e| StoreError::Encoding(e.to_string()))
    }

    fn write_document(&self, document: &HashMap<String, String>) -> StoreResult<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let json_data = serde_json::to_string_pretty(document)
            .map_err(|e| StoreError::Encoding(e.to_string()))?;

        let mut options = OpenOptions::new();
        options.truncate(true).write(true).create(true);
        #[cfg(unix)]
        {
            options.mode(0o600);
        }
        let mut file = options.open(&self.path)?;
        file.write_all(json_data.as_bytes())?;
        file.flush()?;
        Ok(())
    }
}

impl SecureStore for FileStore {
    fn set(&self, key: &str, value: &str) -> StoreResult<()> {
        let _guard = self.lock.lock().unwrap();
        let mut document = self.read_document()?;
        document.insert(key.to_string(), value.to_string());
        self.write_document(&document)
    }

    fn get(&self, key: &str) -> StoreResult<Option<String>> {
        let _guard = self.lock.lock().unwrap();
        Ok(self.read_document()?.get(key).cloned())
    }

    fn delete(&self, key: &str) -> StoreResult<bool> {
        let _guard = self.lock.lock().unwrap();
        let mut document = self.read_document()?;
        let existed = document.remove(key).is_some();
        if existed {
            self.write_document(&document)?;
        }
        Ok(existed)
    }
}
