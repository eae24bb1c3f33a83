//! Requests, notifications-on-the-wire, and their parameters.
//!
//! `Envelope` is the request-or-notification union as it appears in a frame:
//! the two shapes differ only in whether `id` is present and non-null. The
//! public [`Request`] type guarantees an id; [`crate::Notification`]
//! guarantees the lack of one.

use std::collections::BTreeMap;

use serde::de::Error as _;
use serde::ser::{Error as _, SerializeStruct};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ProtocolError;
use crate::types::Version;
use crate::value::JsonValue;

/// Parameters of a request or notification.
///
/// Named parameters only exist in JSON-RPC 2.0; version 1 peers understand
/// positional parameters exclusively.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Params {
    /// Positional parameters as an array
    Positional(Vec<JsonValue>),
    /// Named parameters as an object
    Named(BTreeMap<String, JsonValue>),
}

impl Params {
    /// Get a parameter by name (for named params only)
    pub fn get(&self, key: &str) -> Option<&JsonValue> {
        match self {
            Params::Named(map) => map.get(key),
            Params::Positional(_) => None,
        }
    }

    /// Get a parameter by index (for positional params only)
    pub fn get_index(&self, index: usize) -> Option<&JsonValue> {
        match self {
            Params::Positional(values) => values.get(index),
            Params::Named(_) => None,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Params::Positional(values) => values.len(),
            Params::Named(map) => map.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<Vec<JsonValue>> for Params {
    fn from(values: Vec<JsonValue>) -> Self {
        Params::Positional(values)
    }
}

impl From<BTreeMap<String, JsonValue>> for Params {
    fn from(map: BTreeMap<String, JsonValue>) -> Self {
        Params::Named(map)
    }
}

/// A request or notification as it appears on the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub version: Version,
    pub id: Option<i64>,
    pub method: String,
    pub params: Option<Params>,
}

impl Envelope {
    /// A call expecting a response.
    pub fn request(
        version: Version,
        id: i64,
        method: impl Into<String>,
        params: Option<Params>,
    ) -> Self {
        Self::new(version, Some(id), method, params)
    }

    /// A fire-and-forget call.
    pub fn notification(version: Version, method: impl Into<String>, params: Option<Params>) -> Self {
        Self::new(version, None, method, params)
    }

    fn new(version: Version, id: Option<i64>, method: impl Into<String>, params: Option<Params>) -> Self {
        Self {
            version,
            id,
            method: method.into(),
            // Empty parameter lists collapse to "no parameters".
            params: params.filter(|p| !p.is_empty()),
        }
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    /// Encode for the wire, applying the version-specific field rules.
    pub fn to_wire(&self) -> Result<Vec<u8>, ProtocolError> {
        if self.version == Version::V1 && matches!(self.params, Some(Params::Named(_))) {
            return Err(ProtocolError::NamedParamsInV1);
        }
        Ok(serde_json::to_vec(self)?)
    }
}

impl Serialize for Envelope {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self.version {
            Version::V2 => {
                let params = self.params.as_ref().filter(|p| !p.is_empty());
                let mut s =
                    serializer.serialize_struct("Envelope", 3 + usize::from(params.is_some()))?;
                s.serialize_field("jsonrpc", Version::WIRE_V2)?;
                s.serialize_field("id", &self.id)?;
                s.serialize_field("method", &self.method)?;
                if let Some(params) = params {
                    s.serialize_field("params", params)?;
                }
                s.end()
            }
            Version::V1 => {
                let mut s = serializer.serialize_struct("Envelope", 3)?;
                s.serialize_field("id", &self.id)?;
                s.serialize_field("method", &self.method)?;
                match &self.params {
                    Some(Params::Positional(values)) => s.serialize_field("params", values)?,
                    Some(Params::Named(_)) => {
                        return Err(S::Error::custom("JSON-RPC v1 does not support named parameters"));
                    }
                    // Version 1 always sends params, an empty array if need be.
                    None => s.serialize_field("params", &[] as &[JsonValue])?,
                }
                s.end()
            }
        }
    }
}

#[derive(Deserialize)]
struct RawEnvelope {
    jsonrpc: Option<String>,
    id: Option<i64>,
    method: String,
    params: Option<Params>,
}

impl<'de> Deserialize<'de> for Envelope {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawEnvelope::deserialize(deserializer)?;
        let version = Version::from_wire(raw.jsonrpc.as_deref()).ok_or_else(|| {
            D::Error::custom(format!("invalid JSON-RPC version: {:?}", raw.jsonrpc))
        })?;
        Ok(Envelope {
            version,
            id: raw.id,
            method: raw.method,
            params: raw.params,
        })
    }
}

/// A call that expects exactly one response.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub version: Version,
    pub id: i64,
    pub method: String,
    pub params: Option<Params>,
}

impl Request {
    pub fn new(version: Version, id: i64, method: impl Into<String>, params: Option<Params>) -> Self {
        Self {
            version,
            id,
            method: method.into(),
            params: params.filter(|p| !p.is_empty()),
        }
    }

    /// Get a parameter by name (if params are named)
    pub fn get_param(&self, name: &str) -> Option<&JsonValue> {
        self.params.as_ref()?.get(name)
    }

    /// Get a parameter by index (if params are positional)
    pub fn get_param_index(&self, index: usize) -> Option<&JsonValue> {
        self.params.as_ref()?.get_index(index)
    }
}

impl From<Request> for Envelope {
    fn from(request: Request) -> Self {
        Envelope {
            version: request.version,
            id: Some(request.id),
            method: request.method,
            params: request.params,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn positional(values: Vec<JsonValue>) -> Option<Params> {
        Some(Params::Positional(values))
    }

    #[test]
    fn v2_request_encodes_version_and_omits_empty_params() {
        let envelope = Envelope::request(Version::V2, 1, "echo", None);
        let bytes = envelope.to_wire().unwrap();
        assert_eq!(bytes, br#"{"jsonrpc":"2.0","id":1,"method":"echo"}"#);

        let empty = Envelope::request(Version::V2, 1, "echo", positional(vec![]));
        assert_eq!(empty.to_wire().unwrap(), bytes);
    }

    #[test]
    fn v2_request_with_positional_params() {
        let envelope = Envelope::request(
            Version::V2,
            3,
            "echo",
            positional(vec![JsonValue::from("Hello JSON-RPC"), JsonValue::Int(2)]),
        );
        assert_eq!(
            envelope.to_wire().unwrap(),
            br#"{"jsonrpc":"2.0","id":3,"method":"echo","params":["Hello JSON-RPC",2]}"#
        );
    }

    #[test]
    fn v2_request_with_named_params() {
        let mut named = BTreeMap::new();
        named.insert("times".to_string(), JsonValue::Int(2));
        let envelope = Envelope::request(Version::V2, 4, "repeat", Some(Params::Named(named)));
        assert_eq!(
            envelope.to_wire().unwrap(),
            br#"{"jsonrpc":"2.0","id":4,"method":"repeat","params":{"times":2}}"#
        );
    }

    #[test]
    fn v2_notification_encodes_null_id() {
        let envelope = Envelope::notification(Version::V2, "ping", None);
        assert_eq!(
            envelope.to_wire().unwrap(),
            br#"{"jsonrpc":"2.0","id":null,"method":"ping"}"#
        );
    }

    #[test]
    fn v1_request_has_no_version_and_always_sends_params() {
        let envelope = Envelope::request(Version::V1, 1, "echo", None);
        let bytes = envelope.to_wire().unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();
        assert!(!text.contains("jsonrpc"));
        assert_eq!(bytes, br#"{"id":1,"method":"echo","params":[]}"#);
    }

    #[test]
    fn v1_request_rejects_named_params() {
        let mut named = BTreeMap::new();
        named.insert("key".to_string(), JsonValue::Int(1));
        let envelope = Envelope {
            version: Version::V1,
            id: Some(1),
            method: "echo".to_string(),
            params: Some(Params::Named(named)),
        };
        assert!(matches!(envelope.to_wire(), Err(ProtocolError::NamedParamsInV1)));
    }

    #[test]
    fn decodes_v2_request_without_params() {
        let envelope: Envelope =
            serde_json::from_slice(br#"{"jsonrpc":"2.0", "method": "echo", "id": 1}"#).unwrap();
        assert_eq!(envelope.version, Version::V2);
        assert_eq!(envelope.id, Some(1));
        assert_eq!(envelope.method, "echo");
        assert!(envelope.params.is_none());
    }

    #[test]
    fn decodes_v2_request_with_empty_positional_params() {
        let envelope: Envelope =
            serde_json::from_slice(br#"{"jsonrpc":"2.0", "method": "echo", "params": [], "id": 1}"#)
                .unwrap();
        assert_eq!(envelope.params, Some(Params::Positional(vec![])));
    }

    #[test]
    fn decodes_v1_request_with_positional_params() {
        let envelope: Envelope =
            serde_json::from_slice(br#"{"method":"echo","params":["hi"],"id":1}"#).unwrap();
        assert_eq!(envelope.version, Version::V1);
        assert_eq!(envelope.id, Some(1));
        assert_eq!(envelope.method, "echo");
        assert_eq!(
            envelope.params,
            Some(Params::Positional(vec![JsonValue::from("hi")]))
        );
    }

    #[test]
    fn decodes_null_id_as_notification_shape() {
        let envelope: Envelope =
            serde_json::from_slice(br#"{"jsonrpc":"2.0","id":null,"method":"ping"}"#).unwrap();
        assert!(envelope.is_notification());
    }

    #[test]
    fn rejects_unknown_version_tag() {
        let result: Result<Envelope, _> =
            serde_json::from_slice(br#"{"jsonrpc":"3.0","id":1,"method":"echo"}"#);
        assert!(result.is_err());
    }

    #[test]
    fn named_params_accessors() {
        let envelope: Envelope = serde_json::from_slice(
            br#"{"jsonrpc":"2.0","id":1,"method":"set","params":{"key":"k","value":7}}"#,
        )
        .unwrap();
        let params = envelope.params.unwrap();
        assert_eq!(params.len(), 2);
        assert_eq!(params.get("value"), Some(&JsonValue::Int(7)));
        assert_eq!(params.get_index(0), None);
    }
}
