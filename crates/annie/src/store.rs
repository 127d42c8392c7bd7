//! In-memory session store with FSM-backed status tracking.
//!
//! The store is the single writer for session state: status, user, access
//! token and token metadata always change together under one lock, so
//! readers can never observe a token without its user or metadata.

use crate::machine::{
    SessionMachine, SessionMachineInput, SessionMachineState, SessionStateChangedPayload,
    SessionStatus,
};
use crate::types::{SessionSnapshot, TokenMeta, UserProfile};
use std::sync::Mutex;
use tracing::{debug, warn};

/// Callback type for session state change notifications.
pub type SessionStateCallback = Box<dyn Fn(SessionStateChangedPayload) + Send + Sync>;

struct Inner {
    machine: SessionMachine,
    user: Option<UserProfile>,
    access_token: Option<String>,
    meta: Option<TokenMeta>,
}

impl Inner {
    fn status(&self) -> SessionStatus {
        SessionStatus::from(self.machine.state())
    }

    fn clear_data(&mut self) {
        self.user = None;
        self.access_token = None;
        self.meta = None;
    }
}

/// Session store for one logical session.
///
/// Holds the status machine and the session data behind a single mutex so
/// every mutation is atomic. Readers are synchronous and cheap; mutations
/// are driven by the login/logout flows and the refresh coordinator.
/// Instantiate one store per session and share it via `Arc`.
pub struct SessionStore {
    inner: Mutex<Inner>,
    /// Optional callback for state change notifications.
    state_callback: Mutex<Option<SessionStateCallback>>,
}

impl SessionStore {
    /// Create a store in the `Unknown` status with no session data.
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                machine: SessionMachine::new(),
                user: None,
                access_token: None,
                meta: None,
            }),
            state_callback: Mutex::new(None),
        }
    }

    /// Set a callback to be notified whenever the status changes.
    ///
    /// Useful for broadcasting session changes to an IPC or UI layer.
    pub fn set_state_callback(&self, callback: SessionStateCallback) {
        let mut cb = self.state_callback.lock().unwrap();
        *cb = Some(callback);
    }

    /// Current session status.
    pub fn status(&self) -> SessionStatus {
        self.inner.lock().unwrap().status()
    }

    /// Whether the session counts as authenticated.
    ///
    /// True for `Authenticated` and for `Refreshing`: a session whose token
    /// is being refreshed is still live.
    pub fn is_authenticated(&self) -> bool {
        self.status().is_authenticated()
    }

    /// Current access token, if any.
    ///
    /// While refreshing, this still returns the stale token.
    pub fn access_token(&self) -> Option<String> {
        self.inner.lock().unwrap().access_token.clone()
    }

    /// Authenticated user, if any.
    pub fn user(&self) -> Option<UserProfile> {
        self.inner.lock().unwrap().user.clone()
    }

    /// Token metadata, present exactly when a token is present.
    pub fn meta(&self) -> Option<TokenMeta> {
        self.inner.lock().unwrap().meta.clone()
    }

    /// Capture one consistent view of the whole session.
    pub fn snapshot(&self) -> SessionSnapshot {
        let inner = self.inner.lock().unwrap();
        SessionSnapshot {
            status: inner.status(),
            user: inner.user.clone(),
            access_token: inner.access_token.clone(),
            meta: inner.meta.clone(),
        }
    }

    /// Install an authenticated session with a token issued now.
    ///
    /// Succeeds from any status. Token metadata spans
    /// `expires_in_seconds` from the current instant; non-positive
    /// lifetimes produce an already-expired token, never a panic.
    pub fn set_authenticated(
        &self,
        user: UserProfile,
        access_token: &str,
        expires_in_seconds: i64,
    ) {
        self.install_session(user, access_token, TokenMeta::starting_now(expires_in_seconds));
    }

    /// Install an authenticated session with previously issued metadata.
    ///
    /// Used when rehydrating a persisted session at startup.
    pub fn restore_authenticated(&self, user: UserProfile, access_token: &str, meta: TokenMeta) {
        self.install_session(user, access_token, meta);
    }

    fn install_session(&self, user: UserProfile, access_token: &str, meta: TokenMeta) {
        let mut inner = self.inner.lock().unwrap();
        let old = inner.status();
        // Authenticate is legal from every state
        let _ = inner.machine.consume(&SessionMachineInput::Authenticate);
        inner.user = Some(user);
        inner.access_token = Some(access_token.to_string());
        inner.meta = Some(meta);
        let new = inner.status();
        let user = inner.user.clone();
        drop(inner);

        self.notify_if_changed(old, new, &user);
    }

    /// Clear the session entirely.
    ///
    /// Idempotent: clearing an already-unauthenticated session changes
    /// nothing and fires no notification.
    pub fn set_unauthenticated(&self) {
        let mut inner = self.inner.lock().unwrap();
        let old = inner.status();
        // Clear is legal from every state
        let _ = inner.machine.consume(&SessionMachineInput::Clear);
        inner.clear_data();
        let new = inner.status();
        drop(inner);

        self.notify_if_changed(old, new, &None);
    }

    /// Mark the session as refreshing.
    ///
    /// Only legal while `Authenticated`; user, token and metadata are
    /// retained so readers keep seeing the stale token until settlement.
    /// Returns false (and changes nothing) from any other status. Called by
    /// the refresh coordinator, which is also responsible for settling the
    /// refreshing state it set.
    pub fn begin_refresh(&self) -> bool {
        let mut inner = self.inner.lock().unwrap();
        let old = inner.status();
        if inner
            .machine
            .consume(&SessionMachineInput::BeginRefresh)
            .is_err()
        {
            debug!(status = ?old, "begin_refresh ignored without an active session");
            return false;
        }
        let new = inner.status();
        let user = inner.user.clone();
        drop(inner);

        self.notify_if_changed(old, new, &user);
        true
    }

    /// Install a fresh access token, settling a refresh if one is in flight.
    ///
    /// Refresh responses may carry an updated profile; passing `Some(user)`
    /// replaces the stored one. Ignored once the session has been cleared:
    /// a refresh that settles after logout must not resurrect the session.
    pub fn update_token(
        &self,
        access_token: &str,
        expires_in_seconds: i64,
        user: Option<UserProfile>,
    ) {
        let mut inner = self.inner.lock().unwrap();
        let old = inner.status();
        let input = match inner.machine.state() {
            SessionMachineState::Refreshing => SessionMachineInput::RefreshSucceeded,
            SessionMachineState::Authenticated => SessionMachineInput::Authenticate,
            SessionMachineState::Unknown | SessionMachineState::Unauthenticated => {
                warn!(status = ?old, "dropping token update for a cleared session");
                return;
            }
        };
        let _ = inner.machine.consume(&input);
        inner.access_token = Some(access_token.to_string());
        inner.meta = Some(TokenMeta::starting_now(expires_in_seconds));
        if let Some(user) = user {
            inner.user = Some(user);
        }
        let new = inner.status();
        let user = inner.user.clone();
        drop(inner);

        self.notify_if_changed(old, new, &user);
    }

    /// Settle a failed refresh while keeping the session.
    ///
    /// Returns the status to `Authenticated` with the stale credentials
    /// intact. No-op unless a refresh is in flight.
    pub fn abort_refresh(&self) {
        let mut inner = self.inner.lock().unwrap();
        let old = inner.status();
        if inner
            .machine
            .consume(&SessionMachineInput::RefreshAborted)
            .is_err()
        {
            return;
        }
        let new = inner.status();
        let user = inner.user.clone();
        drop(inner);

        self.notify_if_changed(old, new, &user);
    }

    /// Log the transition and notify the callback when the status changed.
    fn notify_if_changed(
        &self,
        old: SessionStatus,
        new: SessionStatus,
        user: &Option<UserProfile>,
    ) {
        if old == new {
            return;
        }

        debug!(
            old_status = ?old,
            new_status = ?new,
            "session status transition"
        );

        let cb = self.state_callback.lock().unwrap();
        if let Some(callback) = cb.as_ref() {
            let (user_id, email) = user
                .as_ref()
                .map(|u| (Some(u.id.clone()), u.email.clone()))
                .unwrap_or((None, None));

            callback(SessionStateChangedPayload {
                status: new,
                user_id,
                email,
            });
        }
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}
