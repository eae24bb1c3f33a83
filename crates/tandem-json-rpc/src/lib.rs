//! # JSON-RPC 1.0/2.0 message model
//!
//! Transport-agnostic message types for both JSON-RPC wire protocols. This
//! crate provides the dynamic JSON value model, the request/notification/
//! response grammar with the version-specific encoding rules, and the
//! classification of raw frames into the shapes a dispatcher cares about.
//! It contains no I/O; the `tandem-rpc` crate supplies framing, sessions,
//! and the server on top of it.
//!
//! The two protocol versions disagree about more than the `"jsonrpc"` tag:
//! v1 always sends `params` as an array (never named), and its responses
//! carry both `result` and `error` keys with exactly one non-null, while v2
//! omits absent fields entirely. Those quirks are preserved byte-for-byte
//! here because peers in the wild check for them.

pub mod error;
pub mod message;
pub mod notification;
pub mod request;
pub mod response;
pub mod types;
pub mod value;

pub use error::{ErrorCode, ErrorObject, ProtocolError};
pub use message::{Call, DecodeFailure, Incoming};
pub use notification::Notification;
pub use request::{Envelope, Params, Request};
pub use response::Response;
pub use types::Version;
pub use value::JsonValue;
