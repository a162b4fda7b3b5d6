//! The force-logout channel.
//!
//! The expiry watch and the 401/403 interceptor never touch the session
//! directly. They send a [`ForceLogout`] through a [`LogoutHandle`]; the
//! session manager's single consumer applies it. Ending a session is
//! idempotent, so duplicate or racing requests converge on the same state.

use tokio::sync::mpsc;

/// Who asked for the logout.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogoutSource {
    /// The local expiry watch saw the token expire (or become unreadable).
    ExpiryWatch,
    /// The server answered a request with 401 or 403.
    ServerRejection,
}

/// A request to end the current session.
#[derive(Debug, Clone)]
pub struct ForceLogout {
    pub source: LogoutSource,
    /// Shown to the user on the next unauthenticated view.
    pub reason: String,
    /// Token the request was raised against. A request for a token that is
    /// no longer current is stale and ignored.
    pub(crate) token: Option<String>,
}

/// Producer side of the force-logout channel. Cheap to clone.
#[derive(Debug, Clone)]
pub struct LogoutHandle {
    tx: mpsc::UnboundedSender<ForceLogout>,
}

impl LogoutHandle {
    pub(crate) fn channel() -> (Self, mpsc::UnboundedReceiver<ForceLogout>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    /// Ask the session manager to end the session.
    pub fn force_logout(&self, source: LogoutSource, reason: impl Into<String>) {
        self.send(ForceLogout {
            source,
            reason: reason.into(),
            token: None,
        });
    }

    /// Like [`force_logout`](Self::force_logout), but only for the session
    /// backed by `token`.
    pub(crate) fn force_logout_for(
        &self,
        source: LogoutSource,
        reason: impl Into<String>,
        token: String,
    ) {
        self.send(ForceLogout {
            source,
            reason: reason.into(),
            token: Some(token),
        });
    }

    fn send(&self, request: ForceLogout) {
        if self.tx.send(request).is_err() {
            tracing::debug!("Session manager is gone, dropping logout request");
        }
    }
}
