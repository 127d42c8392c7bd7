//! Session data types.

use crate::machine::SessionStatus;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Identity of the authenticated user, as reported by the auth server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    /// User ID from the auth server.
    pub id: String,
    /// User email if available.
    #[serde(default)]
    pub email: Option<String>,
}

impl UserProfile {
    /// Create a profile with just an ID.
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
        }
    }

    /// Attach an email to the profile.
    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }
}

/// Issuance and expiry metadata for an access token.
///
/// `issued_at <= expires_at` holds by construction: token lifetimes are
/// clamped at zero, so a non-positive `expires_in` yields a token that is
/// already expired rather than one that expires before it was issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMeta {
    /// When the access token was issued.
    pub issued_at: DateTime<Utc>,
    /// When the access token expires.
    pub expires_at: DateTime<Utc>,
}

impl TokenMeta {
    /// Metadata for a token issued now with the given lifetime in seconds.
    pub fn starting_now(expires_in_seconds: i64) -> Self {
        let now = Utc::now();
        Self {
            issued_at: now,
            expires_at: now + Duration::seconds(expires_in_seconds.max(0)),
        }
    }

    /// Whether the token has expired by the local clock.
    ///
    /// Advisory only: the server's 401 is the authority on token validity.
    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

/// One consistent view of the whole session, captured atomically.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSnapshot {
    /// Current session status.
    pub status: SessionStatus,
    /// Authenticated user, if any.
    pub user: Option<UserProfile>,
    /// Current access token, if any.
    pub access_token: Option<String>,
    /// Token metadata, present exactly when a token is present.
    pub meta: Option<TokenMeta>,
}
