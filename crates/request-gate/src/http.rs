//! Transport backed by a reqwest client.

use crate::transport::{
    OutboundRequest, RequestMethod, Transport, TransportError, TransportResponse, TransportResult,
};
use async_trait::async_trait;
use tracing::trace;
use url::Url;

/// [`Transport`] that sends requests over HTTP.
///
/// The base URL is validated at construction; request paths are appended
/// to it verbatim.
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: Url,
    default_headers: Vec<(String, String)>,
}

impl HttpTransport {
    pub fn new(base_url: impl AsRef<str>) -> TransportResult<Self> {
        let base_url = Url::parse(base_url.as_ref())
            .map_err(|e| TransportError::Config(format!("invalid base URL: {e}")))?;
        Ok(Self {
            client: reqwest::Client::new(),
            base_url,
            default_headers: Vec::new(),
        })
    }

    /// Attach a header to every request, e.g. an `apikey`.
    pub fn with_default_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.default_headers.push((name.into(), value.into()));
        self
    }

    fn request_url(&self, path: &str) -> String {
        let base = self.base_url.as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: OutboundRequest) -> TransportResult<TransportResponse> {
        let url = self.request_url(&request.path);
        trace!(method = request.method.as_str(), url = %url, "sending request");

        let mut builder = match request.method {
            RequestMethod::Get => self.client.get(&url),
            RequestMethod::Post => self.client.post(&url),
            RequestMethod::Put => self.client.put(&url),
            RequestMethod::Patch => self.client.patch(&url),
            RequestMethod::Delete => self.client.delete(&url),
        };
        for (name, value) in &self.default_headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(TransportResponse {
            status: status.as_u16(),
            body,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_rejects_invalid_base_url() {
        let result = HttpTransport::new("not a url");
        assert!(matches!(result, Err(TransportError::Config(_))));
    }

    #[test]
    fn test_request_url_joins_without_double_slash() {
        let transport = HttpTransport::new("https://api.example.test/").unwrap();
        assert_eq!(
            transport.request_url("/v1/items"),
            "https://api.example.test/v1/items"
        );
        assert_eq!(
            transport.request_url("v1/items"),
            "https://api.example.test/v1/items"
        );
    }
}
