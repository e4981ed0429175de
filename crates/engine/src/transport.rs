//! The underlying HTTP call.
//!
//! [`HttpTransport`] is the single seam between the bridge and the network.
//! It knows nothing about script profiles: it takes a [`WireRequest`] and
//! returns a [`WireResponse`] for any status code. [`ReqwestTransport`] is
//! the production implementation.

use async_trait::async_trait;
use scripthost_core::body::Body;
use scripthost_core::request::{Headers, WireRequest, WireResponse};

/// Failures of an HTTP call as scripts see them.
///
/// [`HttpTransport`] implementations return any status as a response; the
/// bridge turns a non-2xx status into [`TransportError::Status`].
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TransportError {
    #[error("request timed out")]
    Timeout,

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// The server answered outside the 2xx range.
    #[error("Request failed with status code {0}")]
    Status(u16),

    /// The request went out but no usable response came back.
    #[error("no response: {0}")]
    NoResponse(String),

    #[error("HTTP request failed: {0}")]
    Other(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if err.is_connect() {
            Self::Connect(err.to_string())
        } else if err.is_builder() {
            Self::InvalidRequest(err.to_string())
        } else {
            Self::Other(err.to_string())
        }
    }
}

/// A generic async HTTP call with timeout, status, headers, and body.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: WireRequest) -> Result<WireResponse, TransportError>;
}

// ---------------------------------------------------------------------------
// ReqwestTransport
// ---------------------------------------------------------------------------

/// [`HttpTransport`] backed by a shared `reqwest::Client`.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new() -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("scripthost/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self { client })
    }

    /// Wrap an already-configured client.
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: WireRequest) -> Result<WireResponse, TransportError> {
        let method = reqwest::Method::from_bytes(request.method.as_bytes())
            .map_err(|e| TransportError::InvalidRequest(e.to_string()))?;

        let mut builder = self
            .client
            .request(method, request.url.as_str())
            .timeout(request.timeout);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.to_wire_bytes());
        }

        let response = builder.send().await?;
        let status = response.status().as_u16();
        let headers: Headers = response
            .headers()
            .iter()
            .map(|(name, value)| {
                (
                    name.as_str().to_string(),
                    String::from_utf8_lossy(value.as_bytes()).into_owned(),
                )
            })
            .collect();

        let bytes = response.bytes().await.map_err(|e| {
            if e.is_timeout() {
                TransportError::Timeout
            } else {
                TransportError::NoResponse(e.to_string())
            }
        })?;

        Ok(WireResponse {
            status,
            headers,
            body: Body::from_bytes(bytes.to_vec()),
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn new_does_not_fail() {
        assert!(ReqwestTransport::new().is_ok());
    }

    #[test]
    fn error_display() {
        assert_eq!(TransportError::Timeout.to_string(), "request timed out");
        assert_eq!(
            TransportError::NoResponse("closed".into()).to_string(),
            "no response: closed"
        );
    }

    #[test]
    fn builder_error_maps_to_invalid_request() {
        let req_err = reqwest::Client::new()
            .get("://bad")
            .build()
            .expect_err("invalid url");
        assert_matches!(TransportError::from(req_err), TransportError::InvalidRequest(_));
    }

    #[tokio::test]
    async fn invalid_method_is_rejected_before_sending() {
        let transport = ReqwestTransport::new().expect("transport");
        let result = transport
            .send(WireRequest {
                method: "NOT A METHOD".to_string(),
                url: "http://127.0.0.1:9/".to_string(),
                headers: Headers::new(),
                body: None,
                timeout: Duration::from_millis(100),
            })
            .await;
        assert_matches!(result, Err(TransportError::InvalidRequest(_)));
    }
}
