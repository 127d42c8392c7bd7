//! Wiring for a complete authenticated-request stack.

use crate::authenticator::RequestAuthenticator;
use crate::transport::{OutboundRequest, Transport, TransportResponse, TransportResult};
use annie::{SessionSnapshot, SessionStore, TokenMeta, UserProfile};
use credential_store::{CredentialVault, StoreError, StoredSessionMeta};
use refresh_coordinator::{RefreshCoordinator, RefreshOperation, RefreshPolicy};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Errors from session lifecycle operations.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Credential persistence failed.
    #[error("credential store error: {0}")]
    Store(#[from] StoreError),
}

pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// One fully wired authentication stack: session store, credential vault,
/// refresh coordinator, and the authenticated request path.
///
/// Construct one per account/backend pair and share it via `Arc`; nothing
/// here is process-global.
pub struct AuthRuntime {
    store: Arc<SessionStore>,
    vault: Arc<CredentialVault>,
    coordinator: Arc<RefreshCoordinator>,
    authenticator: RequestAuthenticator,
}

impl AuthRuntime {
    pub fn new(
        vault: Arc<CredentialVault>,
        operation: Arc<dyn RefreshOperation>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self::with_policy(vault, operation, transport, RefreshPolicy::default())
    }

    pub fn with_policy(
        vault: Arc<CredentialVault>,
        operation: Arc<dyn RefreshOperation>,
        transport: Arc<dyn Transport>,
        policy: RefreshPolicy,
    ) -> Self {
        let store = Arc::new(SessionStore::new());
        let coordinator = Arc::new(
            RefreshCoordinator::new(store.clone(), operation)
                .with_policy(policy)
                .with_persistence(vault.clone()),
        );
        let authenticator =
            RequestAuthenticator::new(store.clone(), coordinator.clone(), transport);
        Self {
            store,
            vault,
            coordinator,
            authenticator,
        }
    }

    /// The in-memory session store.
    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// The refresh coordinator.
    pub fn coordinator(&self) -> &Arc<RefreshCoordinator> {
        &self.coordinator
    }

    /// One consistent view of the session.
    pub fn snapshot(&self) -> SessionSnapshot {
        self.store.snapshot()
    }

    /// Execute a request through the authenticated path.
    pub async fn execute(&self, request: OutboundRequest) -> TransportResult<TransportResponse> {
        self.authenticator.execute(request).await
    }

    /// Load the persisted session into memory.
    ///
    /// Returns true when the runtime ends up authenticated. An expired
    /// persisted token is refreshed eagerly; incomplete or corrupt
    /// credentials are cleared rather than restored.
    pub async fn restore_session(&self) -> RuntimeResult<bool> {
        let access_token = self.vault.get_access_token()?;
        let refresh_token = self.vault.get_refresh_token()?;
        let meta = match self.vault.get_session_meta() {
            Ok(meta) => meta,
            Err(StoreError::Encoding(e)) => {
                warn!(error = %e, "persisted session metadata is corrupt");
                None
            }
            Err(e) => return Err(e.into()),
        };

        let (access_token, meta) = match (access_token, refresh_token, meta) {
            (Some(access_token), Some(_), Some(meta)) => (access_token, meta),
            (None, None, None) => {
                debug!("no persisted session");
                self.store.set_unauthenticated();
                return Ok(false);
            }
            _ => {
                // Half a session is no session
                warn!("incomplete persisted session, clearing");
                self.vault.clear_session()?;
                self.store.set_unauthenticated();
                return Ok(false);
            }
        };

        let user = UserProfile {
            id: meta.user_id,
            email: meta.email,
        };
        let token_meta = TokenMeta {
            issued_at: meta.issued_at,
            expires_at: meta.expires_at,
        };
        let expired = token_meta.is_expired();
        self.store
            .restore_authenticated(user, &access_token, token_meta);

        if expired {
            debug!("restored session has an expired token, refreshing");
            return Ok(self.coordinator.refresh().await);
        }

        info!("session restored");
        Ok(true)
    }

    /// Install a fresh session and persist its credentials.
    pub fn login(
        &self,
        user: UserProfile,
        access_token: &str,
        refresh_token: &str,
        expires_in: i64,
    ) -> RuntimeResult<()> {
        let meta = TokenMeta::starting_now(expires_in);
        let stored = StoredSessionMeta {
            user_id: user.id.clone(),
            email: user.email.clone(),
            issued_at: meta.issued_at,
            expires_at: meta.expires_at,
        };
        // Persist before touching memory so a failure leaves no half state
        self.vault.set_session(access_token, refresh_token, &stored)?;
        self.store.restore_authenticated(user, access_token, meta);
        info!(user_id = %stored.user_id, "logged in");
        Ok(())
    }

    /// Clear the session in memory and on disk.
    pub fn logout(&self) -> RuntimeResult<()> {
        self.store.set_unauthenticated();
        self.vault.clear_session()?;
        info!("logged out");
        Ok(())
    }
}
