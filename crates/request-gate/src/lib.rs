//! Authenticated request path.
//!
//! Everything here composes around one rule: a request that comes back 401
//! gets at most one session refresh and one replay, then its outcome is
//! final.
//!
//! - [`transport`] - Request/response model and the [`Transport`] seam
//! - [`authenticator`] - Refresh-and-replay on token rejection
//! - [`http`] - reqwest-backed transport
//! - [`runtime`] - One fully wired authentication stack

pub mod authenticator;
pub mod http;
pub mod runtime;
pub mod transport;

#[cfg(test)]
mod tests;

pub use authenticator::RequestAuthenticator;
pub use http::HttpTransport;
pub use runtime::{AuthRuntime, RuntimeError, RuntimeResult};
pub use transport::{
    OutboundRequest, RequestMethod, Transport, TransportError, TransportResponse, TransportResult,
};
