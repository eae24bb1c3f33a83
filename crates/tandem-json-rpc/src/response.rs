//! Responses and the result/error exclusivity rule.

use serde::de::Error as _;
use serde::ser::{Error as _, SerializeStruct};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{ErrorObject, ProtocolError};
use crate::request::Request;
use crate::types::Version;
use crate::value::JsonValue;

/// The answer to a request.
///
/// Exactly one of `result`/`error` is populated; the constructors maintain
/// that, and decoding rejects frames that violate it. `id` is `None` only
/// for protocol-violating id-less responses, which the session layer
/// tolerates as a broadcast.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub version: Version,
    pub id: Option<i64>,
    pub result: Option<JsonValue>,
    pub error: Option<ErrorObject>,
}

impl Response {
    pub fn success(version: Version, id: i64, result: JsonValue) -> Self {
        Self {
            version,
            id: Some(id),
            result: Some(result),
            error: None,
        }
    }

    pub fn error(version: Version, id: Option<i64>, error: impl Into<ErrorObject>) -> Self {
        Self {
            version,
            id,
            result: None,
            error: Some(error.into()),
        }
    }

    /// A success response answering `request`, inheriting its version and id.
    pub fn success_for(request: &Request, result: JsonValue) -> Self {
        Self::success(request.version, request.id, result)
    }

    /// An error response answering `request`.
    pub fn error_for(request: &Request, error: impl Into<ErrorObject>) -> Self {
        Self::error(request.version, Some(request.id), error)
    }

    /// A success response whose result is any serializable application type.
    pub fn success_for_typed<T: Serialize>(request: &Request, result: &T) -> Result<Self, ProtocolError> {
        Ok(Self::success_for(request, JsonValue::from_typed(result)?))
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Encode for the wire, applying the version-specific field rules.
    pub fn to_wire(&self) -> Result<Vec<u8>, ProtocolError> {
        Ok(serde_json::to_vec(self)?)
    }
}

impl Serialize for Response {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        if self.result.is_some() == self.error.is_some() {
            return Err(S::Error::custom(
                "response must carry exactly one of result or error",
            ));
        }
        match self.version {
            Version::V2 => {
                let mut s = serializer.serialize_struct("Response", 3)?;
                s.serialize_field("jsonrpc", Version::WIRE_V2)?;
                s.serialize_field("id", &self.id)?;
                match (&self.result, &self.error) {
                    (Some(result), None) => s.serialize_field("result", result)?,
                    (None, Some(error)) => s.serialize_field("error", error)?,
                    _ => unreachable!(),
                }
                s.end()
            }
            Version::V1 => {
                // Version 1 sends both keys, the unused one as null.
                let mut s = serializer.serialize_struct("Response", 3)?;
                s.serialize_field("id", &self.id)?;
                s.serialize_field("result", &self.result)?;
                s.serialize_field("error", &self.error)?;
                s.end()
            }
        }
    }
}

#[derive(Deserialize)]
struct RawResponse {
    jsonrpc: Option<String>,
    id: Option<i64>,
    result: Option<JsonValue>,
    error: Option<ErrorObject>,
}

impl<'de> Deserialize<'de> for Response {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = RawResponse::deserialize(deserializer)?;
        let version = Version::from_wire(raw.jsonrpc.as_deref()).ok_or_else(|| {
            D::Error::custom(format!("invalid JSON-RPC version: {:?}", raw.jsonrpc))
        })?;
        // A JSON null result is "no result"; v1 responses carry it explicitly.
        let result = raw.result.filter(|value| !value.is_null());
        match (result.is_some(), raw.error.is_some()) {
            (true, true) => Err(D::Error::custom("response carries both result and error")),
            (false, false) => Err(D::Error::custom("response carries neither result nor error")),
            _ => Ok(Response {
                version,
                id: raw.id,
                result,
                error: raw.error,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;

    #[test]
    fn v2_success_wire_shape() {
        let response = Response::success(Version::V2, 1, JsonValue::from("bar"));
        assert_eq!(
            response.to_wire().unwrap(),
            br#"{"jsonrpc":"2.0","id":1,"result":"bar"}"#
        );
    }

    #[test]
    fn v2_error_wire_shape_omits_result() {
        let response = Response::error(Version::V2, Some(7), ErrorCode::MethodNotFound);
        let json = String::from_utf8(response.to_wire().unwrap()).unwrap();
        assert!(!json.contains("result"));
        assert!(json.contains(r#""code":-32601"#));
    }

    #[test]
    fn v1_success_carries_null_error() {
        let response = Response::success(Version::V1, 2, JsonValue::Int(5));
        assert_eq!(
            response.to_wire().unwrap(),
            br#"{"id":2,"result":5,"error":null}"#
        );
    }

    #[test]
    fn v1_error_carries_null_result() {
        let response = Response::error(Version::V1, Some(2), ErrorCode::InternalError);
        let json = String::from_utf8(response.to_wire().unwrap()).unwrap();
        assert!(json.starts_with(r#"{"id":2,"result":null,"error":{"#));
    }

    #[test]
    fn decode_rejects_both_result_and_error() {
        let bytes = br#"{"jsonrpc":"2.0","id":1,"result":1,"error":{"code":1,"message":"x"}}"#;
        assert!(serde_json::from_slice::<Response>(bytes).is_err());
    }

    #[test]
    fn decode_rejects_neither_result_nor_error() {
        assert!(serde_json::from_slice::<Response>(br#"{"jsonrpc":"2.0","id":1}"#).is_err());
        // v1 shape with both members null is just as empty
        assert!(serde_json::from_slice::<Response>(br#"{"id":1,"result":null,"error":null}"#).is_err());
    }

    #[test]
    fn decodes_v1_success() {
        let response: Response =
            serde_json::from_slice(br#"{"id":3,"result":["hi"],"error":null}"#).unwrap();
        assert_eq!(response.version, Version::V1);
        assert_eq!(response.id, Some(3));
        assert_eq!(
            response.result,
            Some(JsonValue::Array(vec![JsonValue::from("hi")]))
        );
        assert!(response.error.is_none());
    }

    #[test]
    fn decodes_id_less_response() {
        let response: Response =
            serde_json::from_slice(br#"{"jsonrpc":"2.0","result":"broadcast"}"#).unwrap();
        assert_eq!(response.id, None);
    }

    #[test]
    fn typed_result_helper() {
        let request = Request::new(Version::V2, 9, "sum", None);
        let response = Response::success_for_typed(&request, &vec![1, 2, 3]).unwrap();
        assert_eq!(
            response.result,
            Some(JsonValue::Array(vec![
                JsonValue::Int(1),
                JsonValue::Int(2),
                JsonValue::Int(3)
            ]))
        );
    }
}
