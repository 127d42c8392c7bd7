//! Integration tests for the authenticated request path.
//!
//! - `scenarios.rs`   - Request outcomes across session states
//! - `concurrency.rs` - Single-flight refresh under parallel requests
//! - `restore.rs`     - Persisted session restore

mod restore;

use crate::authenticator::RequestAuthenticator;
use crate::runtime::AuthRuntime;
use crate::transport::{
    OutboundRequest, Transport, TransportError, TransportResponse, TransportResult,
};
use annie::{SessionStore, UserProfile};
use async_trait::async_trait;
use credential_store::{CredentialVault, MemoryStore};
use refresh_coordinator::{
    RefreshCoordinator, RefreshError, RefreshGrant, RefreshOperation, RefreshResult,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Transport that accepts exactly one bearer token and records every
/// request it sees. Response bodies carry the call number so tests can
/// tell an original response from a replay.
struct TokenAwareTransport {
    valid_token: Mutex<Option<String>>,
    requests: Mutex<Vec<OutboundRequest>>,
}

impl TokenAwareTransport {
    fn accepting(token: &str) -> Arc<Self> {
        Arc::new(Self {
            valid_token: Mutex::new(Some(token.to_string())),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// A transport that rejects every token.
    fn rejecting_all() -> Arc<Self> {
        Arc::new(Self {
            valid_token: Mutex::new(None),
            requests: Mutex::new(Vec::new()),
        })
    }

    fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn recorded(&self) -> Vec<OutboundRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn seen_authorization(&self) -> Vec<Option<String>> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|request| request.authorization().map(str::to_string))
            .collect()
    }
}

#[async_trait]
impl Transport for TokenAwareTransport {
    async fn execute(&self, request: OutboundRequest) -> TransportResult<TransportResponse> {
        let call = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request.clone());
            requests.len()
        };

        let expected = self
            .valid_token
            .lock()
            .unwrap()
            .as_ref()
            .map(|token| format!("Bearer {token}"));
        match (request.authorization(), expected.as_deref()) {
            (Some(sent), Some(valid)) if sent == valid => Ok(TransportResponse {
                status: 200,
                body: format!("ok call {call}"),
            }),
            _ => Err(TransportError::Status {
                status: 401,
                body: format!("unauthorized call {call}"),
            }),
        }
    }
}

/// Transport that answers every request with one fixed status.
struct StatusTransport(u16);

#[async_trait]
impl Transport for StatusTransport {
    async fn execute(&self, _request: OutboundRequest) -> TransportResult<TransportResponse> {
        if (200..300).contains(&self.0) {
            Ok(TransportResponse {
                status: self.0,
                body: String::new(),
            })
        } else {
            Err(TransportError::Status {
                status: self.0,
                body: String::new(),
            })
        }
    }
}

/// Transport that only ever reports the endpoint as unreachable.
struct OutageTransport;

#[async_trait]
impl Transport for OutageTransport {
    async fn execute(&self, _request: OutboundRequest) -> TransportResult<TransportResponse> {
        Err(TransportError::Unavailable("endpoint down".to_string()))
    }
}

enum RefreshScript {
    Grant(&'static str),
    Deny,
}

/// Refresh operation with a fixed scripted outcome.
struct ScriptedRefresh {
    calls: AtomicUsize,
    delay: Duration,
    script: RefreshScript,
}

impl ScriptedRefresh {
    fn granting(token: &'static str) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
            script: RefreshScript::Grant(token),
        })
    }

    fn granting_slowly(token: &'static str, delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay,
            script: RefreshScript::Grant(token),
        })
    }

    fn denying() -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay: Duration::ZERO,
            script: RefreshScript::Deny,
        })
    }

    fn denying_slowly(delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            calls: AtomicUsize::new(0),
            delay,
            script: RefreshScript::Deny,
        })
    }

    fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RefreshOperation for ScriptedRefresh {
    async fn perform_refresh(&self) -> RefreshResult<RefreshGrant> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match self.script {
            RefreshScript::Grant(token) => Ok(RefreshGrant {
                access_token: token.to_string(),
                expires_in: 3600,
                user: None,
            }),
            RefreshScript::Deny => Err(RefreshError::Denied("refresh denied".to_string())),
        }
    }
}

/// A store and an authenticator wired to the given fakes.
fn gate(
    transport: Arc<dyn Transport>,
    operation: Arc<dyn RefreshOperation>,
) -> (Arc<SessionStore>, RequestAuthenticator) {
    let store = Arc::new(SessionStore::new());
    let coordinator = Arc::new(RefreshCoordinator::new(store.clone(), operation));
    let authenticator = RequestAuthenticator::new(store.clone(), coordinator, transport);
    (store, authenticator)
}

/// Like [`gate`], with a session already holding `tok1`.
fn authenticated_gate(
    transport: Arc<dyn Transport>,
    operation: Arc<dyn RefreshOperation>,
) -> (Arc<SessionStore>, RequestAuthenticator) {
    let (store, authenticator) = gate(transport, operation);
    store.set_authenticated(UserProfile::new("user-1"), "tok1", 3600);
    (store, authenticator)
}

/// Basic workflow: login, call, logout.
#[tokio::test]
async fn basic_workflow() {
    let vault = Arc::new(CredentialVault::new(Box::new(MemoryStore::new())));
    let transport = TokenAwareTransport::accepting("tok1");
    let operation = ScriptedRefresh::denying();
    let runtime = AuthRuntime::new(vault.clone(), operation.clone(), transport.clone());

    runtime
        .login(
            UserProfile::new("user-1").with_email("a@b.test"),
            "tok1",
            "refresh-1",
            3600,
        )
        .unwrap();
    assert!(runtime.store().is_authenticated());
    assert!(vault.has_session().unwrap());

    let response = runtime
        .execute(OutboundRequest::get("/v1/me"))
        .await
        .unwrap();
    assert_eq!(response.status, 200);

    runtime.logout().unwrap();
    assert!(!runtime.store().is_authenticated());
    assert!(!vault.has_session().unwrap());

    // A call after logout is denied without any refresh attempt
    let denied = runtime.execute(OutboundRequest::get("/v1/me")).await;
    assert!(matches!(
        denied,
        Err(TransportError::Status { status: 401, .. })
    ));
    assert_eq!(operation.calls(), 0);
}
