//! Outbound batches.

use std::sync::Arc;

use tandem_json_rpc::{Envelope, Params, Response};

use crate::error::Result;
use crate::session::{Completion, Session};

/// An ordered set of requests and notifications sent as a single
/// array-shaped frame.
///
/// Request ids are allocated from the session counter when a call is
/// added, so completions correlate exactly as for singly-sent requests. A
/// batch must contain at least one entry before it can be sent.
pub struct Batch<'s> {
    session: &'s Session,
    entries: Vec<(Envelope, Option<Completion>)>,
}

impl<'s> Batch<'s> {
    pub(crate) fn new(session: &'s Session) -> Self {
        Self {
            session,
            entries: Vec::new(),
        }
    }

    /// Queue a request; `completion` is invoked exactly once when its
    /// response (real or synthesized) arrives.
    pub fn request<F>(&mut self, method: &str, params: Option<Params>, completion: F)
    where
        F: Fn(Response) + Send + Sync + 'static,
    {
        let id = self.session.next_request_id();
        let envelope = Envelope::request(self.session.outbound_version(), id, method, params);
        self.entries.push((envelope, Some(Arc::new(completion))));
    }

    /// Queue a fire-and-forget notification.
    pub fn notify(&mut self, method: &str, params: Option<Params>) {
        let envelope = Envelope::notification(self.session.outbound_version(), method, params);
        self.entries.push((envelope, None));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Send the whole batch over the session as one frame.
    pub async fn send(self) -> Result<()> {
        self.session.send_batch_entries(self.entries).await
    }
}
