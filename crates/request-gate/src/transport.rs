//! Transport abstraction for outbound requests.
//!
//! Requests are described independently of any HTTP client so the
//! authenticated request path can be exercised against fakes. A transport
//! maps non-success statuses to [`TransportError::Status`]; `Ok` always
//! carries a success response.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use thiserror::Error;

/// Errors surfaced by a transport.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The server answered with a non-success HTTP status.
    #[error("request failed with status {status}: {body}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Raw response body.
        body: String,
    },

    /// The endpoint could not be reached.
    #[error("endpoint unavailable: {0}")]
    Unavailable(String),

    /// HTTP client failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body decoding failed.
    #[error("failed to decode response body: {0}")]
    Json(#[from] serde_json::Error),

    /// The transport was misconfigured.
    #[error("transport configuration error: {0}")]
    Config(String),
}

impl TransportError {
    /// Whether the server refused the caller's credentials.
    pub fn is_authorization_failure(&self) -> bool {
        match self {
            TransportError::Status { status, .. } => *status == 401,
            TransportError::Http(e) => e.status().map(|s| s.as_u16() == 401).unwrap_or(false),
            _ => false,
        }
    }
}

pub type TransportResult<T> = Result<T, TransportError>;

/// HTTP method of an outbound request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl RequestMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestMethod::Get => "GET",
            RequestMethod::Post => "POST",
            RequestMethod::Put => "PUT",
            RequestMethod::Patch => "PATCH",
            RequestMethod::Delete => "DELETE",
        }
    }
}

/// An outbound request.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: RequestMethod,
    /// Path relative to the transport's base URL.
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl OutboundRequest {
    pub fn new(method: RequestMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(RequestMethod::Get, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(RequestMethod::Post, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(RequestMethod::Put, path)
    }

    pub fn patch(path: impl Into<String>) -> Self {
        Self::new(RequestMethod::Patch, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(RequestMethod::Delete, path)
    }

    /// Set a header, replacing any existing value. Names compare
    /// case-insensitively.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        let name = name.into();
        self.headers
            .retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
        self.headers.push((name, value.into()));
        self
    }

    /// Look up a header value by case-insensitive name.
    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    /// Attach a JSON body.
    pub fn json(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }

    /// Attach a bearer token, replacing any existing Authorization header.
    pub fn bearer(self, token: &str) -> Self {
        self.header("Authorization", format!("Bearer {token}"))
    }

    /// The Authorization header value, if one is attached.
    pub fn authorization(&self) -> Option<&str> {
        self.header_value("Authorization")
    }
}

/// A successful response.
#[derive(Debug, Clone)]
pub struct TransportResponse {
    /// HTTP status code.
    pub status: u16,
    /// Raw response body.
    pub body: String,
}

impl TransportResponse {
    /// Decode the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> TransportResult<T> {
        Ok(serde_json::from_str(&self.body)?)
    }
}

/// Executes outbound requests.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: OutboundRequest) -> TransportResult<TransportResponse>;
}
