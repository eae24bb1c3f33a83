//! Engine-level errors.

use thiserror::Error;

use tandem_json_rpc::ProtocolError;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A batch must contain at least one request or notification before it
    /// can be sent; this is the local invalid-request outcome for an empty
    /// one.
    #[error("a batch must contain at least one request or notification")]
    EmptyBatch,

    #[error("server accept loop is already running")]
    AlreadyStarted,
}

pub type Result<T> = std::result::Result<T, RpcError>;
