//! Translates script HTTP calls into transport calls and back.
//!
//! [`HttpBridge`] is async and profile-aware: each entry point has its own
//! request translation and its own way of reporting failure. Script code runs
//! on a blocking thread, so it reaches the bridge through [`BlockingBridge`],
//! which drives the async calls on the host runtime.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use scripthost_core::request::{NormalizedResponse, RequestSpec, ScriptRequest, WireResponse};
use serde_json::Value;
use tokio::runtime::Handle;

use crate::transport::{HttpTransport, TransportError};

/// What an http-client `get`/`post` hands to its callback.
///
/// Always delivered, whether the call succeeded or not.
#[derive(Debug, Clone, PartialEq)]
pub struct ClientReply {
    /// Failure description, `None` on success.
    pub error: Option<String>,
    pub response: Option<NormalizedResponse>,
    /// Response body on success, an error message otherwise.
    pub body: String,
}

impl ClientReply {
    fn from_result(label: &str, result: Result<WireResponse, TransportError>) -> Self {
        match result {
            Ok(wire) => {
                let response = wire.normalize();
                Self {
                    error: None,
                    body: response.body_text(),
                    response: Some(response),
                }
            }
            Err(err) => Self {
                error: Some(err.to_string()),
                response: None,
                body: format!("{label} has no response"),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// HttpBridge
// ---------------------------------------------------------------------------

pub struct HttpBridge {
    transport: Arc<dyn HttpTransport>,
    timeout: Duration,
}

impl HttpBridge {
    pub fn new(transport: Arc<dyn HttpTransport>, timeout: Duration) -> Self {
        Self { transport, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// One wire call. A non-2xx status fails the call, so every entry point
    /// reports it through its own failure path.
    async fn send(&self, request: ScriptRequest) -> Result<WireResponse, TransportError> {
        let wire = request.into_wire(self.timeout);
        tracing::debug!(method = %wire.method, url = %wire.url, "Bridging script request");
        let response = self.transport.send(wire).await?;
        if !(200..300).contains(&response.status) {
            return Err(TransportError::Status(response.status));
        }
        Ok(response)
    }

    /// Generic request. Returns the raw `{status, headers, data}` response,
    /// or `None` after logging the failure.
    pub async fn generic(&self, spec: RequestSpec) -> Option<Value> {
        let url = spec.url.clone();
        match self.send(ScriptRequest::Generic(spec)).await {
            Ok(response) => Some(response.to_raw_value()),
            Err(err) => {
                tracing::error!(url = %url, error = %err, "Script request failed");
                None
            }
        }
    }

    /// Http-client `get`.
    pub async fn client_get(&self, spec: RequestSpec) -> ClientReply {
        let result = self.send(ScriptRequest::ClientGet(spec)).await;
        ClientReply::from_result("__httpClient.get", result)
    }

    /// Http-client `post`.
    pub async fn client_post(&self, spec: RequestSpec) -> ClientReply {
        let result = self.send(ScriptRequest::ClientPost(spec)).await;
        ClientReply::from_result("__httpClient.post", result)
    }

    /// Task fetch. A missing response resolves to the placeholder; every
    /// other transport failure rejects.
    pub async fn task_fetch(&self, spec: RequestSpec) -> Result<NormalizedResponse, TransportError> {
        match self.send(ScriptRequest::TaskFetch(spec)).await {
            Ok(response) => Ok(response.normalize()),
            Err(TransportError::NoResponse(reason)) => {
                tracing::warn!(reason = %reason, "Fetch got no response");
                Ok(NormalizedResponse::no_response())
            }
            Err(err) => Err(err),
        }
    }
}

// ---------------------------------------------------------------------------
// BlockingBridge
// ---------------------------------------------------------------------------

/// Synchronous view of an [`HttpBridge`] for code running on a blocking
/// thread. Must not be used from inside an async task.
#[derive(Clone)]
pub struct BlockingBridge {
    bridge: Arc<HttpBridge>,
    runtime: Handle,
}

impl BlockingBridge {
    pub fn new(bridge: Arc<HttpBridge>, runtime: Handle) -> Self {
        Self { bridge, runtime }
    }

    fn block<F: Future>(&self, future: F) -> F::Output {
        self.runtime.block_on(future)
    }

    pub fn generic(&self, spec: RequestSpec) -> Option<Value> {
        self.block(self.bridge.generic(spec))
    }

    pub fn client_get(&self, spec: RequestSpec) -> ClientReply {
        self.block(self.bridge.client_get(spec))
    }

    pub fn client_post(&self, spec: RequestSpec) -> ClientReply {
        self.block(self.bridge.client_post(spec))
    }

    pub fn task_fetch(&self, spec: RequestSpec) -> Result<NormalizedResponse, TransportError> {
        self.block(self.bridge.task_fetch(spec))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
