//! Caller-supplied context for a run that handles an intercepted HTTP
//! transaction.
//!
//! The transport-level fields (`requestOptions.headers`, `requestData`,
//! `header`) are flattened in place into the `headers`/`body` fields
//! scripts read, then everything is exposed as top-level script bindings.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::body::Body;
use crate::request::Headers;

/// Script binding name for the intercepted request.
pub const BINDING_REQUEST: &str = "request";
/// Script binding name for the intercepted response.
pub const BINDING_RESPONSE: &str = "response";

/// Transport-level request options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestOptions {
    #[serde(default)]
    pub headers: Headers,
}

/// An intercepted outgoing request.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterceptedRequest {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub method: String,
    #[serde(default)]
    pub request_options: RequestOptions,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_data: Option<Body>,
    /// Flattened copy of `request_options.headers`.
    #[serde(default)]
    pub headers: Headers,
    /// Flattened text of `request_data`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// An intercepted incoming response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InterceptedResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    /// Transport-level header map.
    #[serde(default)]
    pub header: Headers,
    /// Flattened copy of `header`.
    #[serde(default)]
    pub headers: Headers,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body: Option<Body>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Everything a caller may merge over the baseline script context.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExternalContext {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request: Option<InterceptedRequest>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub response: Option<InterceptedResponse>,
    /// Any other top-level bindings.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ExternalContext {
    /// Copy transport-level headers into the flat `headers` fields and
    /// serialize the raw request body into the flat `body` field.
    pub fn flatten(&mut self) {
        if let Some(request) = self.request.as_mut() {
            request.headers = request.request_options.headers.clone();
            request.body = Some(
                request
                    .request_data
                    .as_ref()
                    .map(Body::to_script_value)
                    .unwrap_or(Value::Null),
            );
        }
        if let Some(response) = self.response.as_mut() {
            response.headers = response.header.clone();
        }
    }

    /// Top-level bindings in merge order. Later entries shadow earlier ones
    /// and all of them shadow the baseline context.
    pub fn bindings(&self) -> Vec<(String, Value)> {
        let mut out = Vec::new();
        if let Some(request) = &self.request {
            out.push((BINDING_REQUEST.to_string(), to_value(request)));
        }
        if let Some(response) = &self.response {
            let mut value = to_value(response);
            if let (Value::Object(map), Some(body)) = (&mut value, &response.body) {
                map.insert("body".to_string(), body.to_script_value());
            }
            out.push((BINDING_RESPONSE.to_string(), value));
        }
        for (key, value) in &self.extra {
            out.push((key.clone(), value.clone()));
        }
        out
    }
}

fn to_value<T: Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap_or(Value::Null)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
