//! The authenticated request path.

use crate::transport::{OutboundRequest, Transport, TransportResponse, TransportResult};
use annie::SessionStore;
use refresh_coordinator::RefreshCoordinator;
use std::sync::Arc;
use tracing::debug;

/// Sends requests with the session's bearer token and transparently
/// recovers from token expiry.
///
/// The recovery path is straight-line: one refresh, one replay. There is
/// no loop, so a request is never replayed twice regardless of how the
/// replay turns out.
pub struct RequestAuthenticator {
    store: Arc<SessionStore>,
    coordinator: Arc<RefreshCoordinator>,
    transport: Arc<dyn Transport>,
}

impl RequestAuthenticator {
    pub fn new(
        store: Arc<SessionStore>,
        coordinator: Arc<RefreshCoordinator>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            store,
            coordinator,
            transport,
        }
    }

    /// Attach the current access token, if the session holds one.
    fn authorize(&self, request: OutboundRequest) -> OutboundRequest {
        match self.store.access_token() {
            Some(token) => request.bearer(&token),
            None => request,
        }
    }

    /// Execute a request, refreshing the session and replaying once if the
    /// server rejects the token.
    pub async fn execute(&self, request: OutboundRequest) -> TransportResult<TransportResponse> {
        let initial = self.authorize(request.clone());
        let denial = match self.transport.execute(initial).await {
            Ok(response) => return Ok(response),
            Err(e) if e.is_authorization_failure() => e,
            // Anything that is not a credential problem passes through
            Err(e) => return Err(e),
        };

        if !self.store.is_authenticated() {
            // No session to repair, so the denial stands
            return Err(denial);
        }

        debug!(
            method = request.method.as_str(),
            path = %request.path,
            "request denied, refreshing session"
        );

        if !self.coordinator.refresh().await {
            return Err(denial);
        }

        // Replay once with the token the refresh installed. The outcome is
        // final either way: a second denial comes back to the caller as-is.
        let replay = self.authorize(request);
        self.transport.execute(replay).await
    }
}
