//! High-level API for managing session credentials.

use crate::{CredentialKeys, SecureStore, StoreError, StoreResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Persisted session metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredSessionMeta {
    /// User ID from the auth server
    pub user_id: String,
    /// User email if available
    #[serde(default)]
    pub email: Option<String>,
    /// When the access token was issued
    pub issued_at: DateTime<Utc>,
    /// When the access token expires
    pub expires_at: DateTime<Utc>,
}

/// High-level API for storing and retrieving session credentials
pub struct CredentialVault {
    store: Box<dyn SecureStore>,
}

impl CredentialVault {
    /// Create a new vault with the given storage backend
    pub fn new(store: Box<dyn SecureStore>) -> Self {
        Self { store }
    }

    /// Store a complete session: both tokens and metadata
    pub fn set_session(
        &self,
        access_token: &str,
        refresh_token: &str,
        meta: &StoredSessionMeta,
    ) -> StoreResult<()> {
        self.store.set(CredentialKeys::ACCESS_TOKEN, access_token)?;
        self.store
            .set(CredentialKeys::REFRESH_TOKEN, refresh_token)?;
        self.set_session_meta(meta)
    }

    /// Retrieve the access token
    pub fn get_access_token(&self) -> StoreResult<Option<String>> {
        self.store.get(CredentialKeys::ACCESS_TOKEN)
    }

    /// Store the access token
    pub fn set_access_token(&self, token: &str) -> StoreResult<()> {
        self.store.set(CredentialKeys::ACCESS_TOKEN, token)
    }

    /// Retrieve the refresh token
    pub fn get_refresh_token(&self) -> StoreResult<Option<String>> {
        self.store.get(CredentialKeys::REFRESH_TOKEN)
    }

    /// Store the refresh token
    pub fn set_refresh_token(&self, token: &str) -> StoreResult<()> {
        self.store.set(CredentialKeys::REFRESH_TOKEN, token)
    }

    /// Retrieve session metadata.
    ///
    /// Returns an `Encoding` error when the stored document cannot be
    /// decoded; callers rehydrating a session should clear the vault in
    /// that case rather than trust half a session.
    pub fn get_session_meta(&self) -> StoreResult<Option<StoredSessionMeta>> {
        match self.store.get(CredentialKeys::SESSION_META)? {
            Some(raw) => {
                let meta = serde_json::from_str(&raw)
                    .map_err(|e| StoreError::Encoding(e.to_string()))?;
                Ok(Some(meta))
            }
            None => Ok(None),
        }
    }

    /// Store session metadata
    pub fn set_session_meta(&self, meta: &StoredSessionMeta) -> StoreResult<()> {
        let raw =
            serde_json::to_string(meta).map_err(|e| StoreError::Encoding(e.to_string()))?;
        self.store.set(CredentialKeys::SESSION_META, &raw)
    }

    /// Check whether both session tokens are present
    pub fn has_session(&self) -> StoreResult<bool> {
        Ok(self.store.has(CredentialKeys::ACCESS_TOKEN)?
            && self.store.has(CredentialKeys::REFRESH_TOKEN)?)
    }

    /// Check whether the persisted session is expired by the local clock.
    ///
    /// Missing or undecodable metadata counts as expired.
    pub fn is_session_expired(&self) -> StoreResult<bool> {
        let raw = match self.store.get(CredentialKeys::SESSION_META)? {
            Some(raw) => raw,
            None => return Ok(true),
        };

        match serde_json::from_str::<StoredSessionMeta>(&raw) {
            Ok(meta) => Ok(Utc::now() >= meta.expires_at),
            Err(e) => {
                warn!(error = %e, "stored session meta is undecodable, treating as expired");
                Ok(true)
            }
        }
    }

    /// Remove all session credentials
    pub fn clear_session(&self) -> StoreResult<()> {
        self.store.delete(CredentialKeys::ACCESS_TOKEN)?;
        self.store.delete(CredentialKeys::REFRESH_TOKEN)?;
        self.store.delete(CredentialKeys::SESSION_META)?;
        Ok(())
    }
}
