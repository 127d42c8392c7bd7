//! Single-flight refresh coordination.
//!
//! At most one token refresh runs at a time. The in-flight cycle is a
//! broadcast channel: the first caller becomes the leader and runs the
//! refresh, every caller arriving while it runs subscribes and awaits the
//! shared boolean outcome. The slot is cleared before the outcome is
//! delivered, so a caller arriving after settlement starts the next cycle
//! instead of observing a stale result.

use crate::operation::{RefreshError, RefreshGrant, RefreshOperation, RefreshResult};
use annie::SessionStore;
use credential_store::CredentialVault;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// What happens to the session when a refresh ultimately fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureAction {
    /// Force the session to unauthenticated and drop persisted credentials.
    ClearSession,
    /// Keep the stale session; the next authorized request simply fails
    /// again.
    KeepSession,
}

/// Configuration for refresh retry and failure behavior.
#[derive(Debug, Clone)]
pub struct RefreshPolicy {
    /// Maximum number of attempts within one refresh cycle.
    pub max_attempts: u32,
    /// Initial delay between attempts in milliseconds.
    pub initial_delay_ms: u64,
    /// Maximum delay between attempts in milliseconds.
    pub max_delay_ms: u64,
    /// Session handling when the cycle fails.
    pub on_failure: FailureAction,
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay_ms: 500,
            max_delay_ms: 5000,
            on_failure: FailureAction::ClearSession,
        }
    }
}

impl RefreshPolicy {
    /// Calculate the delay for a given attempt number (0-indexed).
    pub fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let delay_ms = self.initial_delay_ms.saturating_mul(2u64.pow(attempt));
        let capped_ms = delay_ms.min(self.max_delay_ms);
        Duration::from_millis(capped_ms)
    }
}

/// Coordinates token refreshes for one session.
///
/// Instantiate one coordinator per session store and share it via `Arc`;
/// there is no process-wide refresh state. `refresh()` is infallible by
/// design: operation errors collapse into the boolean outcome so a refresh
/// failure can never surface as its own error to request callers.
pub struct RefreshCoordinator {
    store: Arc<SessionStore>,
    operation: Arc<dyn RefreshOperation>,
    policy: RefreshPolicy,
    /// Cleared alongside the session when a failed refresh forces logout.
    persistence: Option<Arc<CredentialVault>>,
    /// None while idle, the current cycle's sender while a refresh runs.
    in_flight: Mutex<Option<broadcast::Sender<bool>>>,
}

impl RefreshCoordinator {
    /// Create a coordinator with the default policy and no persistence.
    pub fn new(store: Arc<SessionStore>, operation: Arc<dyn RefreshOperation>) -> Self {
        Self {
            store,
            operation,
            policy: RefreshPolicy::default(),
            persistence: None,
            in_flight: Mutex::new(None),
        }
    }

    /// Replace the retry/failure policy.
    pub fn with_policy(mut self, policy: RefreshPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Attach a credential vault to clear when a failed refresh forces the
    /// session to unauthenticated.
    pub fn with_persistence(mut self, vault: Arc<CredentialVault>) -> Self {
        self.persistence = Some(vault);
        self
    }

    /// Whether a refresh cycle is currently in flight.
    pub fn is_refreshing(&self) -> bool {
        self.in_flight.lock().unwrap().is_some()
    }

    /// Refresh the access token, sharing any in-flight cycle.
    ///
    /// Returns true when the session ends up holding a fresh token.
    /// Callers arriving while a refresh runs await that cycle's outcome;
    /// they never start a second refresh.
    pub async fn refresh(&self) -> bool {
        // Join the in-flight cycle or become the leader of a new one. The
        // lock covers only the slot check, never an await.
        let waiter = {
            let mut in_flight = self.in_flight.lock().unwrap();
            match in_flight.as_ref() {
                Some(sender) => Some(sender.subscribe()),
                None => {
                    let (sender, _) = broadcast::channel(1);
                    *in_flight = Some(sender);
                    None
                }
            }
        };

        match waiter {
            Some(mut outcome) => {
                debug!("joining in-flight token refresh");
                // A closed cycle counts as failure
                outcome.recv().await.unwrap_or(false)
            }
            None => {
                let outcome = self.run_cycle().await;
                self.settle(outcome);
                outcome
            }
        }
    }

    /// Run one full refresh cycle as the leader.
    async fn run_cycle(&self) -> bool {
        if !self.store.begin_refresh() {
            debug!("refresh requested without an active session");
            return false;
        }

        match self.attempt_with_backoff().await {
            Ok(grant) => {
                self.store
                    .update_token(&grant.access_token, grant.expires_in, grant.user);
                // A logout that landed mid-flight wins over the grant
                let settled = self.store.is_authenticated();
                if settled {
                    info!("token refresh succeeded");
                } else {
                    warn!("token refresh completed after the session was cleared");
                }
                settled
            }
            Err(e) => {
                warn!(error = %e, "token refresh failed");
                self.handle_failure();
                false
            }
        }
    }

    /// Attempt the refresh, retrying transient errors with backoff.
    async fn attempt_with_backoff(&self) -> RefreshResult<RefreshGrant> {
        let mut last_error = None;

        for attempt in 0..self.policy.max_attempts {
            match self.operation.perform_refresh().await {
                Ok(grant) => return Ok(grant),
                Err(e) if e.is_transient() => {
                    last_error = Some(e);

                    if attempt + 1 < self.policy.max_attempts {
                        let delay = self.policy.delay_for_attempt(attempt);
                        debug!(
                            attempt = attempt + 1,
                            max_attempts = self.policy.max_attempts,
                            delay_ms = delay.as_millis() as u64,
                            "transient refresh failure, retrying"
                        );
                        tokio::time::sleep(delay).await;
                    }
                }
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or(RefreshError::Exhausted(self.policy.max_attempts)))
    }

    fn handle_failure(&self) {
        match self.policy.on_failure {
            FailureAction::ClearSession => {
                self.store.set_unauthenticated();
                if let Some(vault) = &self.persistence {
                    if let Err(e) = vault.clear_session() {
                        warn!(error = %e, "failed to clear persisted credentials");
                    }
                }
            }
            FailureAction::KeepSession => {
                self.store.abort_refresh();
            }
        }
    }

    /// Clear the in-flight slot, then deliver the outcome to this cycle's
    /// waiters. Arrivals after the slot is cleared start the next cycle.
    fn settle(&self, outcome: bool) {
        let sender = self.in_flight.lock().unwrap().take();
        if let Some(sender) = sender {
            // Zero receivers is fine: the leader may have run alone
            let _ = sender.send(outcome);
        }
    }
}
