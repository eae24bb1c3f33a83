//! Listening server and session registry.

use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::delegate::SessionDelegate;
use crate::error::{Result, RpcError};
use crate::session::Session;
use crate::transport::{Listener, RpcAddress};

/// How `terminate` treats sessions that are still alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminationSchedule {
    /// Stop accepting and tear down every live session now.
    Immediately,
    /// Stop accepting, then wait for live sessions to end on their own.
    AfterCurrentSessionsFinish,
}

type DelegateFactory = dyn Fn() -> Arc<dyn SessionDelegate> + Send + Sync;

/// Live sessions of one server. Sessions hold a weak reference and remove
/// themselves when their read loop exits; dropping the server never keeps
/// sessions alive, and vice versa.
pub(crate) struct Registry {
    sessions: Mutex<HashMap<Uuid, Session>>,
}

impl Registry {
    fn new() -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn insert(&self, session: Session) {
        self.sessions.lock().insert(session.id(), session);
    }

    pub(crate) fn session_ended(&self, id: Uuid) {
        if self.sessions.lock().remove(&id).is_some() {
            debug!("session {} removed from registry", id);
        }
    }

    fn drain(&self) -> Vec<Session> {
        self.sessions.lock().drain().map(|(_, session)| session).collect()
    }

    fn len(&self) -> usize {
        self.sessions.lock().len()
    }

    fn is_empty(&self) -> bool {
        self.sessions.lock().is_empty()
    }
}

/// A listening JSON-RPC endpoint.
///
/// Each accepted connection gets its own [`Session`] wired to a fresh
/// delegate from the injected factory, and runs until the peer goes away
/// or the server is terminated.
pub struct Server {
    address: RpcAddress,
    listener: Mutex<Option<Listener>>,
    registry: Arc<Registry>,
    delegate_factory: Arc<DelegateFactory>,
    shutdown: CancellationToken,
    accept_task: Mutex<Option<JoinHandle<()>>>,
}

impl Server {
    /// Bind the listening transport. The accept loop does not run until
    /// [`start`](Server::start) is called.
    pub async fn bind<F>(address: RpcAddress, delegate_factory: F) -> Result<Server>
    where
        F: Fn() -> Arc<dyn SessionDelegate> + Send + Sync + 'static,
    {
        let listener = Listener::bind(&address).await.map_err(|failure| {
            error!("unable to bind listener on {}: {}", address, failure);
            RpcError::from(failure)
        })?;
        let address = listener.local_addr()?;
        Ok(Server {
            address,
            listener: Mutex::new(Some(listener)),
            registry: Arc::new(Registry::new()),
            delegate_factory: Arc::new(delegate_factory),
            shutdown: CancellationToken::new(),
            accept_task: Mutex::new(None),
        })
    }

    /// The actual bound address; useful after binding TCP port 0.
    pub fn local_addr(&self) -> &RpcAddress {
        &self.address
    }

    pub fn session_count(&self) -> usize {
        self.registry.len()
    }

    /// Launch the accept loop.
    pub fn start(&self) -> Result<()> {
        let Some(listener) = self.listener.lock().take() else {
            return Err(RpcError::AlreadyStarted);
        };
        info!("server listening on {}", self.address);

        let registry = Arc::clone(&self.registry);
        let delegate_factory = Arc::clone(&self.delegate_factory);
        let shutdown = self.shutdown.clone();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    accepted = listener.accept() => match accepted {
                        Ok((connection, peer)) => {
                            debug!("accepted connection from {}", peer);
                            let delegate = (delegate_factory)();
                            let session = Session::new(
                                connection,
                                peer,
                                delegate,
                                Arc::downgrade(&registry),
                            );
                            registry.insert(session.clone());
                            session.start().await;
                        }
                        Err(failure) if is_transient(&failure) => {
                            warn!("unable to accept connection: {}", failure);
                        }
                        Err(failure) => {
                            error!("listener failed, stopping accept loop: {}", failure);
                            break;
                        }
                    },
                }
            }
        });
        *self.accept_task.lock() = Some(handle);
        Ok(())
    }

    /// Stop the server.
    ///
    /// Accepting stops in either mode. `Immediately` also signals every
    /// registered session to terminate; `AfterCurrentSessionsFinish`
    /// leaves them alone and blocks, rechecking the registry at a short
    /// interval, until it is empty.
    pub async fn terminate(&self, schedule: TerminationSchedule) {
        self.shutdown.cancel();
        drop(self.listener.lock().take());
        let accept_task = self.accept_task.lock().take();
        if let Some(accept_task) = accept_task {
            let _ = accept_task.await;
        }

        match schedule {
            TerminationSchedule::Immediately => {
                for session in self.registry.drain() {
                    session.terminate();
                }
                info!("server on {} terminated", self.address);
            }
            TerminationSchedule::AfterCurrentSessionsFinish => {
                // Sleep-and-recheck; session counts are expected to stay
                // small enough that a condition variable buys nothing.
                while !self.registry.is_empty() {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                }
                info!("server on {} drained and terminated", self.address);
            }
        }
        self.address.remove_stale_socket();
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        self.shutdown.cancel();
        self.address.remove_stale_socket();
    }
}

fn is_transient(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::ConnectionAborted
            | io::ErrorKind::ConnectionReset
            | io::ErrorKind::Interrupted
            | io::ErrorKind::WouldBlock
    )
}