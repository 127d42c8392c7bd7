//! Credential persistence for session tokens.
//!
//! This crate provides:
//! - A `SecureStore` trait for key/value credential backends
//! - An in-memory backend for tests and ephemeral sessions
//! - A file backend storing one JSON document with `0o600` permissions
//! - A typed `CredentialVault` API over any backend

use thiserror::Error;

mod file;
mod keys;
mod memory;
mod traits;
mod vault;

pub use file::{default_store_path, FileStore};
pub use keys::CredentialKeys;
pub use memory::MemoryStore;
pub use traits::SecureStore;
pub use vault::{CredentialVault, StoredSessionMeta};

/// Errors from credential store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Backend-specific storage error
    #[error("Backend storage error: {0}")]
    Backend(String),

    /// Key not found
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Encoding/decoding error
    #[error("Encoding error: {0}")]
    Encoding(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for credential store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Create the default file-backed store at the platform data directory.
pub fn create_store() -> StoreResult<Box<dyn SecureStore>> {
    let path = default_store_path()?;
    Ok(Box::new(FileStore::new(path)))
}
