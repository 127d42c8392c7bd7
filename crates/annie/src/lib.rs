//! Session state for the authenticated request pipeline.
//!
//! This crate provides:
//! - An explicit FSM for the session lifecycle (unknown, unauthenticated,
//!   authenticated, refreshing)
//! - An in-memory `SessionStore` that owns status, user, access token and
//!   token metadata as one atomic unit
//! - State change notifications for embedding layers
//!
//! The store is intentionally free of IO: persistence and refresh live in
//! sibling crates and drive the store through its mutation API.

mod machine;
mod store;
mod types;

pub use machine::session_machine;
pub use machine::{
    SessionMachine, SessionMachineInput, SessionMachineState, SessionStateChangedPayload,
    SessionStatus,
};
pub use store::{SessionStateCallback, SessionStore};
pub use types::{SessionSnapshot, TokenMeta, UserProfile};
