//! Single-flight token refresh.
//!
//! This crate owns the refresh side of session management: when an access
//! token stops working, exactly one refresh cycle runs no matter how many
//! requests hit the expiry at once, and every waiting caller receives the
//! same boolean outcome.
//!
//! - [`RefreshCoordinator`] — single-flight gate and outcome fan-out
//! - [`RefreshOperation`] — the pluggable exchange itself
//! - [`HttpRefreshOperation`] — exchange against an HTTP auth endpoint
//! - [`RefreshPolicy`] — retry/backoff and failure handling

pub mod coordinator;
pub mod http;
pub mod operation;

pub use coordinator::{FailureAction, RefreshCoordinator, RefreshPolicy};
pub use http::{HttpRefreshOperation, RefreshEndpoint};
pub use operation::{RefreshError, RefreshGrant, RefreshOperation, RefreshResult};
