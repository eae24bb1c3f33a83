//! # Bidirectional JSON-RPC over byte streams
//!
//! The session engine on top of [`tandem_json_rpc`]: newline-delimited
//! framing, a per-connection dispatch state machine with id-based response
//! correlation, batch semantics, and a listening server with session
//! lifecycle management. Both ends of a connection are symmetric — each
//! peer can expose methods through a [`SessionDelegate`] while issuing its
//! own requests, notifications, and batches through the [`Session`] handle.
//!
//! ```no_run
//! use std::sync::Arc;
//! use tandem_rpc::{NullDelegate, RpcAddress, Session};
//!
//! # async fn example() -> tandem_rpc::Result<()> {
//! let address = RpcAddress::Tcp("127.0.0.1:9000".parse().unwrap());
//! let session = Session::connect(&address, Arc::new(NullDelegate)).await?;
//! let response = session.call("ping", None).await;
//! println!("{:?}", response.result);
//! # Ok(())
//! # }
//! ```

pub mod batch;
pub mod delegate;
pub mod error;
pub mod framing;
pub mod server;
pub mod session;
pub mod transport;

pub use batch::Batch;
pub use delegate::{DelegateError, NullDelegate, SessionDelegate};
pub use error::{Result, RpcError};
pub use framing::FrameReader;
pub use server::{Server, TerminationSchedule};
pub use session::{Session, SessionState};
pub use transport::{Connection, RpcAddress};

pub use tandem_json_rpc as protocol;
