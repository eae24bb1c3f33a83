//! Classification of inbound frames.
//!
//! A frame is one JSON document; its meaning is inferred from shape alone.
//! Attempts run in a fixed order: single request/notification, single
//! response, batch of requests/notifications, batch of responses. Valid
//! JSON matching none of these is an invalid request; bytes that are not
//! JSON at all are a parse error. The two failure classes map to different
//! standard error codes, so they are kept apart here.

use serde::Deserialize;

use crate::error::ErrorCode;
use crate::notification::Notification;
use crate::request::{Envelope, Request};
use crate::response::Response;

/// A decoded call, split by whether it expects a response.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Request(Request),
    Notification(Notification),
}

impl Envelope {
    /// Splits a decoded call into its request or notification form.
    pub fn into_call(self) -> Call {
        match self.id {
            Some(id) => Call::Request(Request {
                version: self.version,
                id,
                method: self.method,
                params: self.params,
            }),
            None => Call::Notification(Notification {
                version: self.version,
                method: self.method,
                params: self.params,
            }),
        }
    }
}

/// One successfully classified inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Incoming {
    /// A single request or notification
    Call(Envelope),
    /// A single response
    Reply(Response),
    /// An array of requests/notifications (never empty)
    CallBatch(Vec<Envelope>),
    /// An array of responses (never empty)
    ReplyBatch(Vec<Response>),
}

/// Why a frame could not be classified.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeFailure {
    /// The bytes are not valid JSON.
    Parse,
    /// Valid JSON, but not a shape the protocol knows.
    UnrecognizedShape,
}

impl DecodeFailure {
    /// The standard error code to answer this failure with.
    pub fn error_code(self) -> ErrorCode {
        match self {
            DecodeFailure::Parse => ErrorCode::ParseError,
            DecodeFailure::UnrecognizedShape => ErrorCode::InvalidRequest,
        }
    }
}

impl Incoming {
    pub fn decode(bytes: &[u8]) -> Result<Incoming, DecodeFailure> {
        let Ok(value) = serde_json::from_slice::<serde_json::Value>(bytes) else {
            return Err(DecodeFailure::Parse);
        };
        match &value {
            serde_json::Value::Object(_) => {
                if let Ok(envelope) = Envelope::deserialize(&value) {
                    return Ok(Incoming::Call(envelope));
                }
                if let Ok(response) = Response::deserialize(&value) {
                    return Ok(Incoming::Reply(response));
                }
                Err(DecodeFailure::UnrecognizedShape)
            }
            // An empty array is not an empty batch; it is invalid.
            serde_json::Value::Array(items) if !items.is_empty() => {
                if let Ok(envelopes) = Vec::<Envelope>::deserialize(&value) {
                    return Ok(Incoming::CallBatch(envelopes));
                }
                if let Ok(responses) = Vec::<Response>::deserialize(&value) {
                    return Ok(Incoming::ReplyBatch(responses));
                }
                Err(DecodeFailure::UnrecognizedShape)
            }
            _ => Err(DecodeFailure::UnrecognizedShape),
        }
    }
}
