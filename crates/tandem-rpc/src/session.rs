//! Per-connection dispatch state machine.
//!
//! A session owns one byte-stream connection and drives everything that
//! happens on it: a read loop pulling frames, shape classification,
//! delegate callbacks for inbound traffic, and id correlation for the
//! responses to its own outbound requests. Both sides of a connection run
//! the same machinery; "client" and "server" only differ in who connected.

use std::collections::HashMap;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Weak};

use futures::future::join_all;
use parking_lot::Mutex;
use tokio::io::AsyncWriteExt;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use tandem_json_rpc::{
    Call, Envelope, ErrorCode, ErrorObject, Incoming, JsonValue, Notification, Params, Request,
    Response, Version,
};

use crate::batch::Batch;
use crate::delegate::SessionDelegate;
use crate::error::{Result, RpcError};
use crate::framing::FrameReader;
use crate::server::Registry;
use crate::transport::{Connection, RpcAddress, StreamReadHalf, StreamWriteHalf};

/// Caller-supplied handler invoked exactly once when a sent request's
/// response (real or synthesized) becomes available.
pub(crate) type Completion = Arc<dyn Fn(Response) + Send + Sync>;

/// Lifecycle of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Initialized,
    Started,
    Quitting,
    Terminated,
}

/// One logical connection. Cheap to clone; all clones share the state.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    id: Uuid,
    peer: RpcAddress,
    /// Version used for outbound requests and notifications. Inbound
    /// requests are always answered in the version they arrived with.
    version: Version,
    delegate: Arc<dyn SessionDelegate>,
    reader: Mutex<Option<FrameReader<StreamReadHalf>>>,
    writer: tokio::sync::Mutex<StreamWriteHalf>,
    next_request_id: AtomicI64,
    pending: Mutex<HashMap<i64, Completion>>,
    state: Mutex<SessionState>,
    quit: CancellationToken,
    done: CancellationToken,
    registry: Weak<Registry>,
}

impl Session {
    /// Connects to a listening peer and starts the read loop. Returns only
    /// once the loop is actually running.
    pub async fn connect(
        address: &RpcAddress,
        delegate: Arc<dyn SessionDelegate>,
    ) -> Result<Session> {
        let connection = Connection::connect(address).await.map_err(|error| {
            error!("unable to connect to {}: {}", address, error);
            RpcError::from(error)
        })?;
        let session = Session::new(connection, address.clone(), delegate, Weak::new());
        session.start().await;
        Ok(session)
    }

    pub(crate) fn new(
        connection: Connection,
        peer: RpcAddress,
        delegate: Arc<dyn SessionDelegate>,
        registry: Weak<Registry>,
    ) -> Session {
        let (read_half, write_half) = connection.split();
        Session {
            inner: Arc::new(SessionInner {
                id: Uuid::new_v4(),
                peer,
                version: Version::default(),
                delegate,
                reader: Mutex::new(Some(FrameReader::new(read_half))),
                writer: tokio::sync::Mutex::new(write_half),
                next_request_id: AtomicI64::new(1),
                pending: Mutex::new(HashMap::new()),
                state: Mutex::new(SessionState::Initialized),
                quit: CancellationToken::new(),
                done: CancellationToken::new(),
                registry,
            }),
        }
    }

    /// Spawns the read loop and waits for it to come up.
    pub(crate) async fn start(&self) {
        let Some(reader) = self.inner.reader.lock().take() else {
            return;
        };
        let (ready_tx, ready_rx) = oneshot::channel();
        let session = self.clone();
        tokio::spawn(async move { session.run(reader, ready_tx).await });
        let _ = ready_rx.await;
    }

    pub fn id(&self) -> Uuid {
        self.inner.id
    }

    pub fn peer_address(&self) -> &RpcAddress {
        &self.inner.peer
    }

    pub fn state(&self) -> SessionState {
        *self.inner.state.lock()
    }

    /// Asks the session to stop. Idempotent; the read loop finalizes the
    /// transport and fires the terminate hooks.
    pub fn terminate(&self) {
        {
            let mut state = self.inner.state.lock();
            if matches!(*state, SessionState::Quitting | SessionState::Terminated) {
                return;
            }
            *state = SessionState::Quitting;
        }
        info!("session {} termination requested", self.inner.id);
        self.inner.quit.cancel();
    }

    /// Resolves once the read loop has exited and the session is finalized.
    pub async fn terminated(&self) {
        self.inner.done.cancelled().await;
    }

    // --- read loop

    async fn run(self, mut reader: FrameReader<StreamReadHalf>, ready: oneshot::Sender<()>) {
        self.inner.delegate.session_will_start(&self).await;
        *self.inner.state.lock() = SessionState::Started;
        info!("started session with {}", self.inner.peer);
        let _ = ready.send(());
        self.inner.delegate.session_did_start(&self).await;

        loop {
            tokio::select! {
                _ = self.inner.quit.cancelled() => break,
                frame = reader.read_frame() => match frame {
                    Ok(Some(frame)) => self.dispatch(&frame).await,
                    Ok(None) => {
                        debug!("peer {} closed the connection", self.inner.peer);
                        break;
                    }
                    Err(error) => {
                        warn!("unable to read from peer {}: {}", self.inner.peer, error);
                        break;
                    }
                },
            }
        }

        self.finish().await;
    }

    async fn finish(&self) {
        {
            let mut state = self.inner.state.lock();
            if *state == SessionState::Terminated {
                return;
            }
            *state = SessionState::Quitting;
        }
        self.inner.delegate.session_will_terminate(self).await;
        {
            let mut writer = self.inner.writer.lock().await;
            if let Err(error) = writer.shutdown().await {
                debug!(
                    "unable to shut down transport for {}: {}",
                    self.inner.peer, error
                );
            }
        }
        self.fail_pending();
        info!("ended session with {}", self.inner.peer);
        self.inner.delegate.session_did_terminate(self).await;
        *self.inner.state.lock() = SessionState::Terminated;
        if let Some(registry) = self.inner.registry.upgrade() {
            registry.session_ended(self.inner.id);
        }
        self.inner.done.cancel();
    }

    /// Answers every still-pending request with a synthesized internal
    /// error once the connection is gone. Keeps the one-invocation
    /// contract for requests whose responses can no longer arrive.
    fn fail_pending(&self) {
        let pending: Vec<(i64, Completion)> = self.inner.pending.lock().drain().collect();
        if pending.is_empty() {
            return;
        }
        warn!(
            "session with {} ended with {} requests still pending",
            self.inner.peer,
            pending.len()
        );
        for (id, completion) in pending {
            let response = Response::error(self.inner.version, Some(id), ErrorCode::InternalError);
            tokio::spawn(async move { completion(response) });
        }
    }

    // --- inbound dispatch

    async fn dispatch(&self, frame: &[u8]) {
        match Incoming::decode(frame) {
            Ok(Incoming::Call(envelope)) => match envelope.into_call() {
                Call::Request(request) => self.handle_request(request),
                Call::Notification(notification) => self.handle_notification(notification),
            },
            Ok(Incoming::Reply(response)) => self.route_response(response),
            Ok(Incoming::CallBatch(envelopes)) => self.handle_call_batch(envelopes),
            Ok(Incoming::ReplyBatch(responses)) => {
                for response in responses {
                    self.route_response(response);
                }
            }
            Err(failure) => {
                debug!("peer {} sent an undecodable frame", self.inner.peer);
                self.send_response(Response::error(
                    self.inner.version,
                    None,
                    failure.error_code(),
                ))
                .await;
            }
        }
    }

    fn handle_request(&self, request: Request) {
        let session = self.clone();
        tokio::spawn(async move {
            let response = session.response_for(request).await;
            session.send_response(response).await;
        });
    }

    fn handle_notification(&self, notification: Notification) {
        let session = self.clone();
        tokio::spawn(async move {
            session
                .inner
                .delegate
                .handle_notification(&session, notification)
                .await;
        });
    }

    /// Runs the delegate for one request and normalizes its outcome into a
    /// response: decline becomes method-not-found, an explicit error
    /// response passes through, and an unexpected failure is wrapped as an
    /// internal error carrying a truncated description.
    async fn response_for(&self, request: Request) -> Response {
        let (version, id) = (request.version, request.id);
        match self.inner.delegate.respond(self, request).await {
            Ok(Some(response)) => response,
            Ok(None) => Response::error(version, Some(id), ErrorCode::MethodNotFound),
            Err(failure) => {
                warn!("request handler failed: {}", failure);
                let description = truncated(&failure.to_string(), 256);
                Response::error(
                    version,
                    Some(id),
                    ErrorObject::with_data(ErrorCode::InternalError, JsonValue::from(description)),
                )
            }
        }
    }

    fn handle_call_batch(&self, envelopes: Vec<Envelope>) {
        let session = self.clone();
        tokio::spawn(async move {
            let mut answers = Vec::new();
            for envelope in envelopes {
                match envelope.into_call() {
                    Call::Notification(notification) => session.handle_notification(notification),
                    Call::Request(request) => {
                        let session = session.clone();
                        answers.push(async move { session.response_for(request).await });
                    }
                }
            }
            // Requests run concurrently; the collected responses keep the
            // order the requests appeared in.
            let responses = join_all(answers).await;
            if responses.is_empty() {
                // An all-notification batch gets no reply at all; an empty
                // response batch is forbidden.
                return;
            }
            session.send_response_batch(responses).await;
        });
    }

    /// Hands a response to the completion registered under its id.
    ///
    /// A response with no id is a protocol violation tolerated best-effort:
    /// every pending completion hears about it, none is considered
    /// answered.
    fn route_response(&self, response: Response) {
        match response.id {
            Some(id) => {
                let completion = self.inner.pending.lock().remove(&id);
                match completion {
                    Some(completion) => {
                        tokio::spawn(async move { completion(response) });
                    }
                    None => debug!("dropping response with no pending request (id {})", id),
                }
            }
            None => {
                let completions: Vec<Completion> =
                    self.inner.pending.lock().values().cloned().collect();
                warn!(
                    "peer {} sent a response without an id; broadcasting to {} pending requests",
                    self.inner.peer,
                    completions.len()
                );
                for completion in completions {
                    let response = response.clone();
                    tokio::spawn(async move { completion(response) });
                }
            }
        }
    }

    // --- outbound requests and notifications

    pub(crate) fn next_request_id(&self) -> i64 {
        self.inner.next_request_id.fetch_add(1, Ordering::Relaxed)
    }

    pub(crate) fn outbound_version(&self) -> Version {
        self.inner.version
    }

    /// Sends a request; `completion` is invoked exactly once with the
    /// peer's response or a locally synthesized one.
    pub async fn request<F>(&self, method: &str, params: Option<Params>, completion: F)
    where
        F: Fn(Response) + Send + Sync + 'static,
    {
        let id = self.next_request_id();
        let envelope = Envelope::request(self.inner.version, id, method, params);
        self.send_call(envelope, Some(Arc::new(completion))).await;
    }

    /// Sends a request and awaits its response.
    pub async fn call(&self, method: &str, params: Option<Params>) -> Response {
        let id = self.next_request_id();
        let envelope = Envelope::request(self.inner.version, id, method, params);
        let (tx, rx) = oneshot::channel();
        let tx = Mutex::new(Some(tx));
        self.send_call(
            envelope,
            Some(Arc::new(move |response| {
                if let Some(tx) = tx.lock().take() {
                    let _ = tx.send(response);
                }
            })),
        )
        .await;
        match rx.await {
            Ok(response) => response,
            // The read loop ended with the request still pending.
            Err(_) => Response::error(self.inner.version, Some(id), ErrorCode::InternalError),
        }
    }

    /// Sends a fire-and-forget notification.
    pub async fn notify(&self, method: &str, params: Option<Params>) {
        let envelope = Envelope::notification(self.inner.version, method, params);
        self.send_call(envelope, None).await;
    }

    /// Starts an empty batch bound to this session.
    pub fn batch(&self) -> Batch<'_> {
        Batch::new(self)
    }

    async fn send_call(&self, envelope: Envelope, completion: Option<Completion>) {
        // Registration happens before the write so an unexpectedly fast
        // reply cannot race past it.
        if let (Some(id), Some(completion)) = (envelope.id, &completion) {
            self.inner.pending.lock().insert(id, completion.clone());
        }
        let bytes = match envelope.to_wire() {
            Ok(bytes) => bytes,
            Err(failure) => {
                error!("unable to encode call {:?}: {}", envelope.method, failure);
                if let Some(id) = envelope.id {
                    self.route_response(Response::error(
                        envelope.version,
                        Some(id),
                        ErrorCode::ParseError,
                    ));
                }
                return;
            }
        };
        if let Err(failure) = self.write_frame(&bytes).await {
            error!(
                "unable to write call to peer {}: {}",
                self.inner.peer, failure
            );
            if let Some(id) = envelope.id {
                self.route_response(Response::error(
                    envelope.version,
                    Some(id),
                    ErrorCode::InternalError,
                ));
            }
        }
    }

    /// Sends every entry of a batch as one array-shaped frame.
    pub(crate) async fn send_batch_entries(
        &self,
        entries: Vec<(Envelope, Option<Completion>)>,
    ) -> Result<()> {
        if entries.is_empty() {
            warn!("refusing to send an empty batch to {}", self.inner.peer);
            return Err(RpcError::EmptyBatch);
        }
        {
            let mut pending = self.inner.pending.lock();
            for (envelope, completion) in &entries {
                if let (Some(id), Some(completion)) = (envelope.id, completion) {
                    pending.insert(id, completion.clone());
                }
            }
        }
        let envelopes: Vec<&Envelope> = entries.iter().map(|(envelope, _)| envelope).collect();
        let bytes = match serde_json::to_vec(&envelopes) {
            Ok(bytes) => bytes,
            Err(failure) => {
                error!("unable to encode batch: {}", failure);
                self.fail_batch(&entries);
                return Ok(());
            }
        };
        if let Err(failure) = self.write_frame(&bytes).await {
            error!(
                "unable to write batch to peer {}: {}",
                self.inner.peer, failure
            );
            self.fail_batch(&entries);
        }
        Ok(())
    }

    /// Delivers one synthesized internal error per batched request: the
    /// single failure outcome for a batch that never reached the peer.
    fn fail_batch(&self, entries: &[(Envelope, Option<Completion>)]) {
        for (envelope, completion) in entries {
            if let (Some(id), Some(_)) = (envelope.id, completion) {
                self.route_response(Response::error(
                    envelope.version,
                    Some(id),
                    ErrorCode::InternalError,
                ));
            }
        }
    }

    // --- outbound responses

    async fn send_response(&self, response: Response) {
        let bytes = match response.to_wire() {
            Ok(bytes) => bytes,
            Err(failure) => {
                error!("unable to encode response: {}", failure);
                let fallback =
                    Response::error(response.version, response.id, ErrorCode::InternalError);
                match fallback.to_wire() {
                    Ok(bytes) => bytes,
                    Err(failure) => {
                        error!("unable to encode fallback error response: {}", failure);
                        return;
                    }
                }
            }
        };
        if let Err(failure) = self.write_frame(&bytes).await {
            error!(
                "unable to send response to peer {}: {}",
                self.inner.peer, failure
            );
        }
    }

    async fn send_response_batch(&self, responses: Vec<Response>) {
        let bytes = match serde_json::to_vec(&responses) {
            Ok(bytes) => bytes,
            Err(failure) => {
                error!("unable to encode response batch: {}", failure);
                let fallbacks: Vec<Response> = responses
                    .iter()
                    .map(|r| Response::error(r.version, r.id, ErrorCode::InternalError))
                    .collect();
                match serde_json::to_vec(&fallbacks) {
                    Ok(bytes) => bytes,
                    Err(failure) => {
                        error!("unable to encode fallback response batch: {}", failure);
                        return;
                    }
                }
            }
        };
        if let Err(failure) = self.write_frame(&bytes).await {
            error!(
                "unable to send response batch to peer {}: {}",
                self.inner.peer, failure
            );
        }
    }

    /// Writes one frame. The writer lock serializes concurrently produced
    /// frames so their bytes cannot interleave.
    async fn write_frame(&self, bytes: &[u8]) -> std::io::Result<()> {
        let mut writer = self.inner.writer.lock().await;
        writer.write_all(bytes).await?;
        writer.write_all(b"\n").await?;
        writer.flush().await
    }
}

fn truncated(text: &str, limit: usize) -> String {
    if text.len() <= limit {
        return text.to_string();
    }
    let mut end = limit;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &text[..end])
}
