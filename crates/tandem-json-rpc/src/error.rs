//! JSON-RPC error vocabulary and codec failures.

use std::fmt;

use serde::ser::SerializeStruct;
use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

use crate::value::JsonValue;

/// The fixed JSON-RPC error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
}

impl ErrorCode {
    pub fn code(self) -> i64 {
        match self {
            ErrorCode::ParseError => -32700,
            ErrorCode::InvalidRequest => -32600,
            ErrorCode::MethodNotFound => -32601,
            ErrorCode::InvalidParams => -32602,
            ErrorCode::InternalError => -32603,
        }
    }

    pub fn message(self) -> &'static str {
        match self {
            ErrorCode::ParseError => "Invalid JSON was received by the server.",
            ErrorCode::InvalidRequest => "The JSON sent is not a valid Request object.",
            ErrorCode::MethodNotFound => "The method does not exist or is not available.",
            ErrorCode::InvalidParams => "Invalid method parameter(s).",
            ErrorCode::InternalError => "Internal JSON-RPC error.",
        }
    }

    pub fn from_code(code: i64) -> Option<ErrorCode> {
        match code {
            -32700 => Some(ErrorCode::ParseError),
            -32600 => Some(ErrorCode::InvalidRequest),
            -32601 => Some(ErrorCode::MethodNotFound),
            -32602 => Some(ErrorCode::InvalidParams),
            -32603 => Some(ErrorCode::InternalError),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

/// The `error` member of a response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ErrorObject {
    pub code: i64,
    pub message: String,
    #[serde(default)]
    pub data: Option<JsonValue>,
}

impl ErrorObject {
    pub fn new(code: i64, message: impl Into<String>, data: Option<JsonValue>) -> Self {
        Self {
            code,
            message: message.into(),
            data,
        }
    }

    /// A standard error carrying extra diagnostic data.
    pub fn with_data(code: ErrorCode, data: JsonValue) -> Self {
        Self::new(code.code(), code.message(), Some(data))
    }
}

impl From<ErrorCode> for ErrorObject {
    fn from(code: ErrorCode) -> Self {
        Self::new(code.code(), code.message(), None)
    }
}

// The `data` key is always present on the wire, an empty string standing in
// for "no data".
impl Serialize for ErrorObject {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut s = serializer.serialize_struct("ErrorObject", 3)?;
        s.serialize_field("code", &self.code)?;
        s.serialize_field("message", &self.message)?;
        match &self.data {
            Some(data) => s.serialize_field("data", data)?,
            None => s.serialize_field("data", "")?,
        }
        s.end()
    }
}

impl fmt::Display for ErrorObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "JSON-RPC error {}: {}", self.code, self.message)
    }
}

/// Failures produced by the message codec itself.
#[derive(Debug, Error)]
pub enum ProtocolError {
    #[error("JSON codec error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("JSON-RPC v1 does not support named parameters")]
    NamedParamsInV1,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_table() {
        assert_eq!(ErrorCode::ParseError.code(), -32700);
        assert_eq!(ErrorCode::InvalidRequest.code(), -32600);
        assert_eq!(ErrorCode::MethodNotFound.code(), -32601);
        assert_eq!(ErrorCode::InvalidParams.code(), -32602);
        assert_eq!(ErrorCode::InternalError.code(), -32603);
        assert_eq!(ErrorCode::from_code(-32601), Some(ErrorCode::MethodNotFound));
        assert_eq!(ErrorCode::from_code(0), None);
    }

    #[test]
    fn absent_data_encodes_as_empty_string() {
        let error = ErrorObject::from(ErrorCode::MethodNotFound);
        let json = serde_json::to_string(&error).unwrap();
        assert_eq!(
            json,
            r#"{"code":-32601,"message":"The method does not exist or is not available.","data":""}"#
        );
    }

    #[test]
    fn data_round_trips() {
        let error = ErrorObject::with_data(ErrorCode::InvalidParams, JsonValue::Int(9));
        let json = serde_json::to_vec(&error).unwrap();
        let decoded: ErrorObject = serde_json::from_slice(&json).unwrap();
        assert_eq!(decoded, error);
    }

    #[test]
    fn decode_accepts_absent_data() {
        let decoded: ErrorObject = serde_json::from_slice(br#"{"code":-32700,"message":"bad"}"#).unwrap();
        assert_eq!(decoded.code, -32700);
        assert_eq!(decoded.data, None);
    }
}
