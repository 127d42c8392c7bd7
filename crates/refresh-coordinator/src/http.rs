//! Token refresh against an HTTP auth endpoint.

use crate::operation::{RefreshError, RefreshGrant, RefreshOperation, RefreshResult};
use annie::UserProfile;
use async_trait::async_trait;
use chrono::{Duration, Utc};
use credential_store::{CredentialVault, StoredSessionMeta};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;
use url::Url;

/// Where to send refresh requests.
#[derive(Debug, Clone)]
pub struct RefreshEndpoint {
    /// Full URL of the token refresh endpoint.
    pub url: Url,
    /// Value for the `apikey` header, if the endpoint requires one.
    pub api_key: Option<String>,
}

impl RefreshEndpoint {
    pub fn new(url: Url) -> Self {
        Self { url, api_key: None }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }
}

#[derive(Debug, Serialize)]
struct RefreshRequest {
    refresh_token: String,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    access_token: String,
    refresh_token: String,
    expires_in: i64,
    user: RefreshUser,
}

#[derive(Debug, Deserialize)]
struct RefreshUser {
    id: String,
    #[serde(default)]
    email: Option<String>,
}

/// Exchanges the persisted refresh token for a new access token.
///
/// On success the vault is rotated to the new token pair before the grant
/// is returned, so a crash after refresh never leaves stale credentials on
/// disk.
pub struct HttpRefreshOperation {
    client: reqwest::Client,
    endpoint: RefreshEndpoint,
    vault: Arc<CredentialVault>,
}

impl HttpRefreshOperation {
    pub fn new(endpoint: RefreshEndpoint, vault: Arc<CredentialVault>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint,
            vault,
        }
    }
}

#[async_trait]
impl RefreshOperation for HttpRefreshOperation {
    async fn perform_refresh(&self) -> RefreshResult<RefreshGrant> {
        let refresh_token = self
            .vault
            .get_refresh_token()?
            .ok_or_else(|| RefreshError::Denied("no refresh token available".to_string()))?;

        debug!(url = %self.endpoint.url, "requesting token refresh");

        let mut request = self
            .client
            .post(self.endpoint.url.clone())
            .json(&RefreshRequest { refresh_token });
        if let Some(api_key) = &self.endpoint.api_key {
            request = request.header("apikey", api_key);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            if status.is_server_error() {
                return Err(RefreshError::Unavailable(format!(
                    "refresh endpoint returned {status}: {body}"
                )));
            }
            return Err(RefreshError::Denied(format!(
                "refresh rejected with {status}: {body}"
            )));
        }

        let payload: RefreshResponse = response.json().await?;

        let issued_at = Utc::now();
        let meta = StoredSessionMeta {
            user_id: payload.user.id.clone(),
            email: payload.user.email.clone(),
            issued_at,
            expires_at: issued_at + Duration::seconds(payload.expires_in.max(0)),
        };
        self.vault
            .set_session(&payload.access_token, &payload.refresh_token, &meta)?;

        Ok(RefreshGrant {
            access_token: payload.access_token,
            expires_in: payload.expires_in,
            user: Some(UserProfile {
                id: payload.user.id,
                email: payload.user.email,
            }),
        })
    }
}
