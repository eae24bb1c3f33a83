//! Socket addresses and connection glue.
//!
//! Sessions operate on boxed byte streams, so the engine is indifferent to
//! whether a peer arrived over TCP, a Unix-domain socket, or an in-memory
//! pipe in tests.

use std::fmt;
use std::io;
use std::net::SocketAddr;
#[cfg(unix)]
use std::path::PathBuf;

use tokio::io::{AsyncRead, AsyncWrite, ReadHalf, WriteHalf};
use tokio::net::{TcpListener, TcpStream};
#[cfg(unix)]
use tokio::net::{UnixListener, UnixStream};
use tracing::warn;

/// Network location of a peer or listener.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum RpcAddress {
    /// IPv4 or IPv6 TCP endpoint
    Tcp(SocketAddr),
    /// Unix-domain socket path
    #[cfg(unix)]
    Unix(PathBuf),
}

impl RpcAddress {
    /// Removes the filesystem artifact a Unix-domain listener leaves behind.
    pub(crate) fn remove_stale_socket(&self) {
        #[cfg(unix)]
        if let RpcAddress::Unix(path) = self {
            if let Err(error) = std::fs::remove_file(path) {
                if error.kind() != io::ErrorKind::NotFound {
                    warn!(
                        "unable to remove Unix socket path {}: {}",
                        path.display(),
                        error
                    );
                }
            }
        }
    }
}

impl fmt::Display for RpcAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RpcAddress::Tcp(addr) => write!(f, "{addr}"),
            #[cfg(unix)]
            RpcAddress::Unix(path) => write!(f, "{}", path.display()),
        }
    }
}

impl From<SocketAddr> for RpcAddress {
    fn from(addr: SocketAddr) -> Self {
        RpcAddress::Tcp(addr)
    }
}

/// Byte stream shared by both halves of a session.
pub(crate) trait AsyncStream: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> AsyncStream for T {}

pub(crate) type StreamReadHalf = ReadHalf<Box<dyn AsyncStream>>;
pub(crate) type StreamWriteHalf = WriteHalf<Box<dyn AsyncStream>>;

/// An established peer connection.
pub struct Connection {
    stream: Box<dyn AsyncStream>,
}

impl Connection {
    /// Open a client connection to a listening peer.
    pub async fn connect(address: &RpcAddress) -> io::Result<Connection> {
        match address {
            RpcAddress::Tcp(addr) => Ok(Self::from_stream(TcpStream::connect(addr).await?)),
            #[cfg(unix)]
            RpcAddress::Unix(path) => Ok(Self::from_stream(UnixStream::connect(path).await?)),
        }
    }

    pub(crate) fn from_stream(stream: impl AsyncRead + AsyncWrite + Send + Unpin + 'static) -> Connection {
        Connection {
            stream: Box::new(stream),
        }
    }

    pub(crate) fn split(self) -> (StreamReadHalf, StreamWriteHalf) {
        tokio::io::split(self.stream)
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection").finish_non_exhaustive()
    }
}

/// A bound listening socket.
pub(crate) enum Listener {
    Tcp(TcpListener),
    #[cfg(unix)]
    Unix(UnixListener),
}

impl Listener {
    pub async fn bind(address: &RpcAddress) -> io::Result<Listener> {
        match address {
            RpcAddress::Tcp(addr) => Ok(Listener::Tcp(TcpListener::bind(addr).await?)),
            #[cfg(unix)]
            RpcAddress::Unix(path) => Ok(Listener::Unix(UnixListener::bind(path)?)),
        }
    }

    /// The actual bound address; distinct from the requested one when
    /// binding TCP port 0.
    pub fn local_addr(&self) -> io::Result<RpcAddress> {
        match self {
            Listener::Tcp(listener) => Ok(RpcAddress::Tcp(listener.local_addr()?)),
            #[cfg(unix)]
            Listener::Unix(listener) => {
                let addr = listener.local_addr()?;
                Ok(RpcAddress::Unix(
                    addr.as_pathname().map(PathBuf::from).unwrap_or_default(),
                ))
            }
        }
    }

    pub async fn accept(&self) -> io::Result<(Connection, RpcAddress)> {
        match self {
            Listener::Tcp(listener) => {
                let (stream, peer) = listener.accept().await?;
                Ok((Connection::from_stream(stream), RpcAddress::Tcp(peer)))
            }
            #[cfg(unix)]
            Listener::Unix(listener) => {
                let (stream, peer) = listener.accept().await?;
                // Unix peers are usually unnamed; an empty path stands in.
                let peer = peer.as_pathname().map(PathBuf::from).unwrap_or_default();
                Ok((Connection::from_stream(stream), RpcAddress::Unix(peer)))
            }
        }
    }
}
