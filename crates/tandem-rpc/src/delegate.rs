//! Application-facing session callbacks.

use async_trait::async_trait;

use tandem_json_rpc::{Notification, Request, Response};

use crate::session::Session;

/// Failure reported by a delegate that did not produce its own error
/// response. The session wraps it into a standard internal error.
pub type DelegateError = Box<dyn std::error::Error + Send + Sync>;

/// Callbacks a session invokes on behalf of the application.
///
/// Every method receives the session handle, so a delegate can issue its
/// own requests and notifications to the peer from inside any callback.
/// All methods have no-op defaults; concrete delegates override only what
/// they need.
#[async_trait]
pub trait SessionDelegate: Send + Sync {
    async fn session_will_start(&self, session: &Session) {
        let _ = session;
    }

    async fn session_did_start(&self, session: &Session) {
        let _ = session;
    }

    async fn session_will_terminate(&self, session: &Session) {
        let _ = session;
    }

    async fn session_did_terminate(&self, session: &Session) {
        let _ = session;
    }

    /// Answer a request from the peer.
    ///
    /// `Ok(None)` declines, and the session answers with a method-not-found
    /// error. An error response returned here is passed through verbatim;
    /// an `Err` is wrapped as an internal error with a truncated
    /// description in its `data`.
    async fn respond(
        &self,
        session: &Session,
        request: Request,
    ) -> Result<Option<Response>, DelegateError> {
        let _ = (session, request);
        Ok(None)
    }

    /// Handle a notification from the peer. Never answered.
    async fn handle_notification(&self, session: &Session, notification: Notification) {
        let _ = (session, notification);
    }
}

/// A delegate that declines every request; useful for pure clients.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDelegate;

#[async_trait]
impl SessionDelegate for NullDelegate {}
