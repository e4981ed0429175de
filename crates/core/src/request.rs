//! Script-side request shapes and their translation to one wire request.
//!
//! Scripts describe requests in three incompatible ways (the generic
//! `axios` shape, the http-client `get`/`post` shape, and the task `fetch`
//! shape). Each shape is a [`ScriptRequest`] variant and translates to a
//! single profile-agnostic [`WireRequest`] through [`ScriptRequest::into_wire`].
//! Responses travel back the other way through [`WireResponse::normalize`]
//! and [`WireResponse::to_raw_value`].

use std::collections::BTreeMap;
use std::time::Duration;

use serde::Serialize;
use serde_json::{json, Value};

use crate::body::Body;
use crate::error::CoreError;

/// HTTP header map as seen by scripts (lower-cased names, string values).
pub type Headers = BTreeMap<String, String>;

// ---------------------------------------------------------------------------
// Script-side request description
// ---------------------------------------------------------------------------

/// A request as described by a script, before any profile translation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestSpec {
    pub url: String,
    pub method: Option<String>,
    pub headers: Headers,
    /// The `body` field used by both profile shapes.
    pub body: Option<Body>,
    /// The `data` field used by the generic shape.
    pub data: Option<Body>,
}

impl RequestSpec {
    /// Shorthand for a bare URL request.
    pub fn url(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Self::default()
        }
    }

    /// Build a spec from a script value: either a URL string or an object
    /// with `url`, optional `method`, `headers`, `body`, and `data`.
    pub fn from_value(value: &Value) -> Result<Self, CoreError> {
        match value {
            Value::String(url) => Ok(Self::url(url.clone())),
            Value::Object(map) => {
                let url = map
                    .get("url")
                    .and_then(Value::as_str)
                    .filter(|u| !u.is_empty())
                    .ok_or_else(|| {
                        CoreError::Validation("request requires a non-empty 'url'".to_string())
                    })?
                    .to_string();

                let method = map
                    .get("method")
                    .and_then(Value::as_str)
                    .map(str::to_string);

                let headers = match map.get("headers") {
                    Some(Value::Object(h)) => h
                        .iter()
                        .map(|(k, v)| {
                            let v = match v {
                                Value::String(s) => s.clone(),
                                other => other.to_string(),
                            };
                            (k.clone(), v)
                        })
                        .collect(),
                    _ => Headers::new(),
                };

                Ok(Self {
                    url,
                    method,
                    headers,
                    body: present_body(map.get("body")),
                    data: present_body(map.get("data")),
                })
            }
            other => Err(CoreError::Validation(format!(
                "request must be a URL string or an object, got {other}"
            ))),
        }
    }
}

/// A body field is present unless it is null or an empty string.
fn present_body(value: Option<&Value>) -> Option<Body> {
    match value {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) if s.is_empty() => None,
        Some(v) => Some(Body::from(v.clone())),
    }
}

/// Split a URL on its first `?` into the path portion and the query string.
pub fn split_query(url: &str) -> (&str, Option<&str>) {
    match url.split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (url, None),
    }
}

// ---------------------------------------------------------------------------
// Tagged union of request shapes
// ---------------------------------------------------------------------------

/// The request shapes the bridge accepts, one per entry point.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptRequest {
    /// Generic `axios(request, cb)`: method as given, body from `data`.
    Generic(RequestSpec),
    /// Http-client `get`: forced GET, `body` mapped onto the wire body.
    ClientGet(RequestSpec),
    /// Http-client `post`: URL split on `?`, query string as fallback body.
    ClientPost(RequestSpec),
    /// Task `fetch`: POST behaves like `ClientPost`, anything else keeps its
    /// method and maps `body` onto the wire body.
    TaskFetch(RequestSpec),
}

/// The one request shape the transport understands.
#[derive(Debug, Clone, PartialEq)]
pub struct WireRequest {
    /// Upper-case HTTP method.
    pub method: String,
    pub url: String,
    pub headers: Headers,
    pub body: Option<Body>,
    pub timeout: Duration,
}

impl ScriptRequest {
    /// Translate the shape into a wire request with the given timeout.
    pub fn into_wire(self, timeout: Duration) -> WireRequest {
        match self {
            Self::Generic(spec) => WireRequest {
                method: upper_method(spec.method.as_deref()),
                url: spec.url,
                headers: spec.headers,
                body: spec.data,
                timeout,
            },
            Self::ClientGet(spec) => WireRequest {
                method: "GET".to_string(),
                url: spec.url,
                headers: spec.headers,
                body: spec.body.or(spec.data),
                timeout,
            },
            Self::ClientPost(spec) => post_with_query_fallback(spec, timeout),
            Self::TaskFetch(spec) => {
                let is_post = spec
                    .method
                    .as_deref()
                    .is_some_and(|m| m.to_ascii_lowercase().contains("post"));
                if is_post {
                    post_with_query_fallback(spec, timeout)
                } else {
                    WireRequest {
                        method: upper_method(spec.method.as_deref()),
                        url: spec.url,
                        headers: spec.headers,
                        body: spec.body.or(spec.data),
                        timeout,
                    }
                }
            }
        }
    }
}

fn upper_method(method: Option<&str>) -> String {
    method
        .filter(|m| !m.trim().is_empty())
        .map(|m| m.trim().to_ascii_uppercase())
        .unwrap_or_else(|| "GET".to_string())
}

fn post_with_query_fallback(spec: RequestSpec, timeout: Duration) -> WireRequest {
    let (path, query) = split_query(&spec.url);
    let body = spec
        .body
        .or_else(|| query.filter(|q| !q.is_empty()).map(Body::from))
        .unwrap_or_default();
    WireRequest {
        method: "POST".to_string(),
        url: path.to_string(),
        headers: spec.headers,
        body: Some(body),
        timeout,
    }
}

// ---------------------------------------------------------------------------
// Responses
// ---------------------------------------------------------------------------

/// The response the transport hands back.
#[derive(Debug, Clone, PartialEq)]
pub struct WireResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: Body,
}

/// A response flattened into the shape the profile entry points deliver.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<Headers>,
    pub body: Value,
}

impl NormalizedResponse {
    /// The placeholder a task fetch resolves to when nothing came back.
    pub fn no_response() -> Self {
        Self {
            status: None,
            headers: None,
            body: Value::String("no response".to_string()),
        }
    }

    /// The body as text, for the third callback argument.
    pub fn body_text(&self) -> String {
        match &self.body {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}

impl WireResponse {
    /// Flatten status, headers, and the coerced body.
    pub fn normalize(&self) -> NormalizedResponse {
        NormalizedResponse {
            status: Some(self.status),
            headers: Some(self.headers.clone()),
            body: self.body.to_script_value(),
        }
    }

    /// The untranslated response handed to generic callbacks: `data` keeps
    /// its parsed JSON structure.
    pub fn to_raw_value(&self) -> Value {
        let data = match &self.body {
            Body::Json(value) => value.clone(),
            other => other.to_script_value(),
        };
        json!({
            "status": self.status,
            "headers": self.headers,
            "data": data,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
