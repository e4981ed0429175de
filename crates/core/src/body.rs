//! Message bodies and their coercion to script-visible text.
//!
//! A [`Body`] is whatever the transport or the caller produced: plain text,
//! parsed JSON, or raw bytes. Scripts always see the coerced form returned
//! by [`Body::to_script_value`].

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

/// A request or response body as carried through the host.
#[derive(Debug, Clone, PartialEq)]
pub enum Body {
    /// UTF-8 text, passed through untouched.
    Text(String),
    /// A structured JSON value (object, array, or scalar).
    Json(Value),
    /// Raw bytes of unknown encoding.
    Binary(Vec<u8>),
}

impl Body {
    /// Interpret raw transport bytes the way an HTTP client library does:
    /// anything that parses as JSON becomes [`Body::Json`], other UTF-8
    /// becomes [`Body::Text`], the rest stays [`Body::Binary`].
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        if let Ok(value) = serde_json::from_slice::<Value>(&bytes) {
            return Self::Json(value);
        }
        match String::from_utf8(bytes) {
            Ok(text) => Self::Text(text),
            Err(err) => Self::Binary(err.into_bytes()),
        }
    }

    /// Coerce the body into the value a script observes.
    ///
    /// - objects and arrays become their JSON text
    /// - binary becomes its (lossily) decoded text
    /// - text and JSON scalars pass through unchanged
    pub fn to_script_value(&self) -> Value {
        match self {
            Self::Text(text) => Value::String(text.clone()),
            Self::Json(value @ (Value::Object(_) | Value::Array(_))) => {
                Value::String(value.to_string())
            }
            Self::Json(value) => value.clone(),
            Self::Binary(bytes) => Value::String(String::from_utf8_lossy(bytes).into_owned()),
        }
    }

    /// Coerce the body into text, rendering JSON scalars with `to_string`.
    pub fn to_text(&self) -> String {
        match self.to_script_value() {
            Value::String(text) => text,
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }

    /// Bytes to put on the wire for an outgoing request.
    pub fn to_wire_bytes(&self) -> Vec<u8> {
        match self {
            Self::Binary(bytes) => bytes.clone(),
            other => other.to_text().into_bytes(),
        }
    }

    /// Whether the body carries nothing worth sending.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Text(text) => text.is_empty(),
            Self::Json(Value::Null) => true,
            Self::Json(_) => false,
            Self::Binary(bytes) => bytes.is_empty(),
        }
    }
}

impl Default for Body {
    fn default() -> Self {
        Self::Text(String::new())
    }
}

impl From<Value> for Body {
    fn from(value: Value) -> Self {
        match value {
            Value::String(text) => Self::Text(text),
            other => Self::Json(other),
        }
    }
}

impl From<&str> for Body {
    fn from(text: &str) -> Self {
        Self::Text(text.to_string())
    }
}

impl From<String> for Body {
    fn from(text: String) -> Self {
        Self::Text(text)
    }
}

impl Serialize for Body {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Self::Text(text) => serializer.serialize_str(text),
            Self::Json(value) => value.serialize(serializer),
            Self::Binary(bytes) => serializer.serialize_str(&String::from_utf8_lossy(bytes)),
        }
    }
}

impl<'de> Deserialize<'de> for Body {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn object_body_becomes_json_text() {
        let body = Body::Json(json!({"a": 1}));
        assert_eq!(body.to_script_value(), json!(r#"{"a":1}"#));
    }

    #[test]
    fn binary_body_becomes_decoded_text() {
        let body = Body::Binary(b"hello bytes".to_vec());
        assert_eq!(body.to_script_value(), json!("hello bytes"));
    }

    #[test]
    fn string_body_passes_through() {
        let body = Body::Text("plain".to_string());
        assert_eq!(body.to_script_value(), json!("plain"));
    }

    #[test]
    fn json_scalar_passes_through() {
        assert_eq!(Body::Json(json!(42)).to_script_value(), json!(42));
        assert_eq!(Body::Json(json!(true)).to_text(), "true");
    }

    #[test]
    fn from_bytes_prefers_json() {
        assert_eq!(
            Body::from_bytes(br#"{"ok":true}"#.to_vec()),
            Body::Json(json!({"ok": true}))
        );
        assert_eq!(
            Body::from_bytes(b"not json".to_vec()),
            Body::Text("not json".to_string())
        );
        assert_eq!(
            Body::from_bytes(vec![0xff, 0xfe, 0x00]),
            Body::Binary(vec![0xff, 0xfe, 0x00])
        );
    }

    #[test]
    fn deserializes_strings_as_text() {
        let body: Body = serde_json::from_value(json!("abc")).expect("deserialize");
        assert_eq!(body, Body::Text("abc".to_string()));
        let body: Body = serde_json::from_value(json!({"k": "v"})).expect("deserialize");
        assert_eq!(body, Body::Json(json!({"k": "v"})));
    }

    #[test]
    fn emptiness() {
        assert!(Body::default().is_empty());
        assert!(Body::Json(Value::Null).is_empty());
        assert!(!Body::Json(json!({})).is_empty());
    }
}
