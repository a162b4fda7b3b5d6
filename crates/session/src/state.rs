//! The session snapshot published by the manager.

use std::fmt;

use portal_core::identity::Identity;
use portal_core::types::Timestamp;
use serde::Serialize;

/// Reason shown after the session ended because the token expired or the
/// server rejected it.
pub const SESSION_EXPIRED_REASON: &str = "Your session has expired. Please log in again.";

/// Reason shown when the in-memory token could no longer be read.
pub const SESSION_INVALID_REASON: &str =
    "Your session could not be verified. Please log in again.";

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStatus {
    /// The one-time startup sequence is still running. Never re-entered.
    Initializing,
    Authenticated,
    Unauthenticated,
}

/// The bearer token backing an authenticated session.
#[derive(Clone)]
pub(crate) struct ActiveToken {
    pub token: String,
    /// Decoded from the token's `exp` claim; scheduling only.
    pub expires_at: Timestamp,
}

impl fmt::Debug for ActiveToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveToken")
            .field("token", &"<redacted>")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

/// Snapshot of the current session.
///
/// `user` and the token are present exactly when `status` is
/// [`SessionStatus::Authenticated`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub status: SessionStatus,
    pub user: Option<Identity>,
    /// Why the last automatic logout happened. Kept until
    /// [`clear_logout_reason`](crate::SessionManager::clear_logout_reason).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub logout_reason: Option<String>,
    #[serde(skip)]
    pub(crate) active: Option<ActiveToken>,
}

impl Session {
    pub(crate) fn initializing() -> Self {
        Self {
            status: SessionStatus::Initializing,
            user: None,
            logout_reason: None,
            active: None,
        }
    }

    /// Drop the token and the user and mark the session unauthenticated.
    /// The logout reason is left as is.
    pub(crate) fn reset(&mut self) {
        self.status = SessionStatus::Unauthenticated;
        self.user = None;
        self.active = None;
    }

    pub fn is_authenticated(&self) -> bool {
        self.status == SessionStatus::Authenticated
    }

    /// False only while the startup sequence runs.
    pub fn is_ready(&self) -> bool {
        self.status != SessionStatus::Initializing
    }

    /// Expiry decoded from the current token, if authenticated.
    pub fn expires_at(&self) -> Option<Timestamp> {
        self.active.as_ref().map(|a| a.expires_at)
    }

    pub(crate) fn token(&self) -> Option<&str> {
        self.active.as_ref().map(|a| a.token.as_str())
    }
}
