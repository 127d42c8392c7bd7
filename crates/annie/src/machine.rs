//! Session status machine using rust-fsm.
//!
//! This module defines an explicit finite state machine for the session
//! lifecycle, so status is tracked directly instead of being derived from
//! whichever credentials happen to be present.
//!
//! ## State Diagram
//!
//! ```text
//! ┌─────────────────┐
//! │     Unknown     │ (initial; persisted session not checked yet)
//! └────────┬────────┘
//!          │ Authenticate / Clear
//!          ▼
//! ┌─────────────────┐    Authenticate    ┌─────────────────┐
//! │ Unauthenticated │ ─────────────────► │  Authenticated  │
//! └─────────────────┘ ◄───────────────── └────────┬────────┘
//!          ▲                Clear                 │ BeginRefresh
//!          │                                      ▼
//!          │ RefreshFailed               ┌─────────────────┐
//!          └───────────────────────────  │   Refreshing    │
//!                                        └────────┬────────┘
//!                                                 │ RefreshSucceeded /
//!                                                 │ RefreshAborted
//!                                                 ▼
//!                                           Authenticated
//! ```

use rust_fsm::*;
use serde::{Deserialize, Serialize};

// Define the FSM using rust-fsm's declarative macro.
// This generates a module `session_machine` with:
// - session_machine::State (enum)
// - session_machine::Input (enum)
// - session_machine::StateMachine (type alias)
// - session_machine::Impl (trait impl)
state_machine! {
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub session_machine(Unknown)

    Unknown => {
        Authenticate => Authenticated,
        Clear => Unauthenticated
    },
    Unauthenticated => {
        Authenticate => Authenticated,
        Clear => Unauthenticated
    },
    Authenticated => {
        Authenticate => Authenticated,
        Clear => Unauthenticated,
        BeginRefresh => Refreshing
    },
    Refreshing => {
        Authenticate => Authenticated,
        Clear => Unauthenticated,
        RefreshSucceeded => Authenticated,
        RefreshAborted => Authenticated,
        RefreshFailed => Unauthenticated
    }
}

// Re-export the generated types with clearer names
pub use session_machine::Input as SessionMachineInput;
pub use session_machine::State as SessionMachineState;
pub use session_machine::StateMachine as SessionMachine;

/// User-facing session status for external consumption.
///
/// This is a simplified view of the FSM state for snapshots, persistence
/// and state-change notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Initial status; a persisted session may exist but has not been checked.
    Unknown,
    /// Definitively no session.
    Unauthenticated,
    /// Live session with a usable access token.
    Authenticated,
    /// A coordinated token refresh is in progress.
    Refreshing,
}

impl SessionStatus {
    /// Returns true if the session counts as authenticated.
    ///
    /// A refreshing session still counts: its token may be stale, but the
    /// session itself is live and requests may proceed.
    pub fn is_authenticated(&self) -> bool {
        matches!(self, SessionStatus::Authenticated | SessionStatus::Refreshing)
    }

    /// Returns true if the status is transient and will resolve on its own
    /// (startup restore for `Unknown`, settlement for `Refreshing`).
    pub fn is_transient(&self) -> bool {
        matches!(self, SessionStatus::Unknown | SessionStatus::Refreshing)
    }
}

impl From<&SessionMachineState> for SessionStatus {
    fn from(state: &SessionMachineState) -> Self {
        match state {
            SessionMachineState::Unknown => SessionStatus::Unknown,
            SessionMachineState::Unauthenticated => SessionStatus::Unauthenticated,
            SessionMachineState::Authenticated => SessionStatus::Authenticated,
            SessionMachineState::Refreshing => SessionStatus::Refreshing,
        }
    }
}

/// Payload for session state change notifications.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStateChangedPayload {
    /// Current session status.
    pub status: SessionStatus,
    /// User ID if a session is present.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    /// User email if available.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}
