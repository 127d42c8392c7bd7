//! Refresh operation seam.
//!
//! The coordinator does not know how tokens are actually refreshed; it
//! drives a `RefreshOperation` and reduces its result to the boolean
//! outcome shared with every waiting caller.

use annie::UserProfile;
use async_trait::async_trait;
use thiserror::Error;

/// Errors from a token refresh attempt.
#[derive(Debug, Error)]
pub enum RefreshError {
    /// The auth server rejected the refresh credential.
    ///
    /// Not retried: a denied refresh token will not become valid by asking
    /// again.
    #[error("Refresh denied: {0}")]
    Denied(String),

    /// The auth server failed on its side (5xx).
    #[error("Auth server unavailable: {0}")]
    Unavailable(String),

    /// Network or transport-level HTTP error from reqwest.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Credential storage failed while rotating tokens.
    #[error("Storage error: {0}")]
    Store(#[from] credential_store::StoreError),

    /// Every allowed attempt failed with a transient error.
    #[error("Token refresh failed after {0} attempts")]
    Exhausted(u32),
}

impl RefreshError {
    /// Whether retrying the refresh may succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            RefreshError::Unavailable(_) => true,
            RefreshError::Http(e) => {
                e.is_connect()
                    || e.is_timeout()
                    || e.status().map(|s| s.is_server_error()).unwrap_or(false)
            }
            _ => false,
        }
    }
}

/// Convenience Result type alias for refresh operations.
pub type RefreshResult<T> = Result<T, RefreshError>;

/// A fresh set of credentials produced by a successful refresh.
#[derive(Debug, Clone)]
pub struct RefreshGrant {
    /// The new access token.
    pub access_token: String,
    /// Lifetime of the new token in seconds.
    pub expires_in: i64,
    /// Updated user profile, when the auth server returns one.
    pub user: Option<UserProfile>,
}

/// Trait for the auth server's token refresh call.
///
/// Implementors own the refresh credential and its rotation; the
/// coordinator only sees the resulting grant or error.
#[async_trait]
pub trait RefreshOperation: Send + Sync {
    /// Perform one refresh attempt against the auth server.
    async fn perform_refresh(&self) -> RefreshResult<RefreshGrant>;
}
