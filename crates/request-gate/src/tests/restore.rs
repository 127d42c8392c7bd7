//! Persisted session restore.

use super::{ScriptedRefresh, TokenAwareTransport};
use crate::runtime::AuthRuntime;
use crate::transport::OutboundRequest;
use annie::{SessionStatus, UserProfile};
use chrono::{Duration, Utc};
use credential_store::{
    CredentialKeys, CredentialVault, MemoryStore, SecureStore, StoredSessionMeta,
};
use std::sync::Arc;

/// A vault holding a full session whose token expires in the given number
/// of seconds (negative for already expired).
fn vault_with_session(expires_in_seconds: i64) -> Arc<CredentialVault> {
    let vault = Arc::new(CredentialVault::new(Box::new(MemoryStore::new())));
    vault
        .set_session(
            "tok1",
            "refresh-1",
            &StoredSessionMeta {
                user_id: "user-1".to_string(),
                email: Some("a@b.test".to_string()),
                issued_at: Utc::now() - Duration::seconds(60),
                expires_at: Utc::now() + Duration::seconds(expires_in_seconds),
            },
        )
        .unwrap();
    vault
}

#[tokio::test]
async fn test_restore_valid_session() {
    let vault = vault_with_session(3600);
    let transport = TokenAwareTransport::accepting("tok1");
    let operation = ScriptedRefresh::denying();
    let runtime = AuthRuntime::new(vault, operation.clone(), transport);

    assert!(runtime.restore_session().await.unwrap());

    assert_eq!(runtime.store().status(), SessionStatus::Authenticated);
    assert_eq!(runtime.store().access_token().as_deref(), Some("tok1"));
    let user = runtime.store().user().unwrap();
    assert_eq!(user.id, "user-1");
    assert_eq!(user.email.as_deref(), Some("a@b.test"));
    // A live token needs no eager refresh
    assert_eq!(operation.calls(), 0);
}

#[tokio::test]
async fn test_restore_empty_vault() {
    let vault = Arc::new(CredentialVault::new(Box::new(MemoryStore::new())));
    let runtime = AuthRuntime::new(
        vault,
        ScriptedRefresh::denying(),
        TokenAwareTransport::accepting("tok1"),
    );

    assert!(!runtime.restore_session().await.unwrap());
    assert_eq!(runtime.store().status(), SessionStatus::Unauthenticated);
}

#[tokio::test]
async fn test_restore_incomplete_credentials_clears_vault() {
    let vault = Arc::new(CredentialVault::new(Box::new(MemoryStore::new())));
    vault.set_access_token("tok1").unwrap();

    let runtime = AuthRuntime::new(
        vault.clone(),
        ScriptedRefresh::denying(),
        TokenAwareTransport::accepting("tok1"),
    );

    assert!(!runtime.restore_session().await.unwrap());
    assert_eq!(runtime.store().status(), SessionStatus::Unauthenticated);
    assert!(vault.get_access_token().unwrap().is_none());
}

#[tokio::test]
async fn test_restore_corrupt_meta_clears_vault() {
    let store = MemoryStore::new();
    store.set(CredentialKeys::SESSION_META, "{not json").unwrap();
    let vault = Arc::new(CredentialVault::new(Box::new(store)));
    vault.set_access_token("tok1").unwrap();
    vault.set_refresh_token("refresh-1").unwrap();

    let runtime = AuthRuntime::new(
        vault.clone(),
        ScriptedRefresh::denying(),
        TokenAwareTransport::accepting("tok1"),
    );

    assert!(!runtime.restore_session().await.unwrap());
    assert_eq!(runtime.store().status(), SessionStatus::Unauthenticated);
    assert!(vault.get_access_token().unwrap().is_none());
}

#[tokio::test]
async fn test_restore_expired_session_refreshes_eagerly() {
    let vault = vault_with_session(-60);
    let transport = TokenAwareTransport::accepting("tok2");
    let operation = ScriptedRefresh::granting("tok2");
    let runtime = AuthRuntime::new(vault, operation.clone(), transport);

    assert!(runtime.restore_session().await.unwrap());

    assert_eq!(operation.calls(), 1);
    assert_eq!(runtime.store().status(), SessionStatus::Authenticated);
    assert_eq!(runtime.store().access_token().as_deref(), Some("tok2"));

    // The request path needs no further refresh
    let response = runtime
        .execute(OutboundRequest::get("/v1/me"))
        .await
        .unwrap();
    assert_eq!(response.status, 200);
    assert_eq!(operation.calls(), 1);
}

#[tokio::test]
async fn test_restore_expired_session_with_failing_refresh_clears() {
    let vault = vault_with_session(-60);
    let operation = ScriptedRefresh::denying();
    let runtime = AuthRuntime::new(
        vault.clone(),
        operation.clone(),
        TokenAwareTransport::accepting("tok1"),
    );

    assert!(!runtime.restore_session().await.unwrap());

    assert_eq!(runtime.store().status(), SessionStatus::Unauthenticated);
    // The default policy drops the persisted credentials too
    assert!(!vault.has_session().unwrap());
}

#[tokio::test]
async fn test_login_persists_for_restore() {
    let vault = Arc::new(CredentialVault::new(Box::new(MemoryStore::new())));

    {
        let runtime = AuthRuntime::new(
            vault.clone(),
            ScriptedRefresh::denying(),
            TokenAwareTransport::accepting("tok1"),
        );
        runtime
            .login(UserProfile::new("user-1"), "tok1", "refresh-1", 3600)
            .unwrap();
    }

    let runtime = AuthRuntime::new(
        vault,
        ScriptedRefresh::denying(),
        TokenAwareTransport::accepting("tok1"),
    );

    assert!(runtime.restore_session().await.unwrap());
    assert_eq!(runtime.store().user().unwrap().id, "user-1");
    assert_eq!(runtime.store().access_token().as_deref(), Some("tok1"));
}
