use portal_client::ClientError;
use portal_core::error::CoreError;

use crate::state::SESSION_EXPIRED_REASON;

/// Shown when the server rejects a login without saying why.
const INVALID_CREDENTIALS_MESSAGE: &str = "Invalid e-mail address or password";

/// Errors surfaced by the session manager.
///
/// Operations the user triggers directly (login, password and profile
/// changes) return [`SessionError::Failed`], whose message is the one to
/// display; the underlying kind is available through [`SessionError::root`].
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// Wrong e-mail or password. Does not alter the session.
    #[error("{}", .message.as_deref().unwrap_or(INVALID_CREDENTIALS_MESSAGE))]
    InvalidCredentials { message: Option<String> },

    /// The server rejected the credential (401/403). Always ends the session.
    #[error("{}", .message.as_deref().unwrap_or(SESSION_EXPIRED_REASON))]
    Unauthorized { message: Option<String> },

    /// The server answered with another non-2xx status.
    #[error("Server error ({status})")]
    Server { status: u16, message: Option<String> },

    /// The server could not be reached.
    #[error("Network error: {0}")]
    Network(String),

    /// A 2xx response that did not have the expected shape.
    #[error("Unexpected response from server: {0}")]
    InvalidResponse(String),

    /// Validation or token decoding failure.
    #[error(transparent)]
    Core(#[from] CoreError),

    /// The operation needs an authenticated session.
    #[error("Not logged in")]
    NotAuthenticated,

    /// The startup sequence has not finished yet.
    #[error("Session is still initializing")]
    Initializing,

    /// The token store could not be written.
    #[error("Token storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// A user-facing operation failed; `message` is what to display.
    #[error("{message}")]
    Failed {
        message: String,
        #[source]
        source: Box<SessionError>,
    },
}

impl SessionError {
    /// The message the server sent with its rejection, if any.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            SessionError::InvalidCredentials { message }
            | SessionError::Unauthorized { message }
            | SessionError::Server { message, .. } => message.as_deref(),
            SessionError::Failed { source, .. } => source.server_message(),
            _ => None,
        }
    }

    /// The innermost error, unwrapping [`SessionError::Failed`].
    pub fn root(&self) -> &SessionError {
        match self {
            SessionError::Failed { source, .. } => source.root(),
            other => other,
        }
    }

    /// True when the server rejected the credential.
    pub fn is_unauthorized(&self) -> bool {
        matches!(self.root(), SessionError::Unauthorized { .. })
    }

    /// Wrap into [`SessionError::Failed`] with the server's message, or
    /// `fallback` when the server did not provide one.
    ///
    /// Validation and state errors already carry a user-facing message and
    /// are returned unchanged.
    pub(crate) fn with_fallback(self, fallback: &str) -> SessionError {
        match self {
            SessionError::Core(CoreError::Validation(_))
            | SessionError::NotAuthenticated
            | SessionError::Initializing
            | SessionError::Failed { .. } => self,
            other => {
                let message = other
                    .server_message()
                    .map(str::to_owned)
                    .unwrap_or_else(|| fallback.to_owned());
                SessionError::Failed {
                    message,
                    source: Box::new(other),
                }
            }
        }
    }
}

impl From<ClientError> for SessionError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Api {
                status: 401 | 403,
                message,
                ..
            } => SessionError::Unauthorized { message },
            ClientError::Api {
                status, message, ..
            } => SessionError::Server { status, message },
            ClientError::Request(e) => SessionError::Network(e.to_string()),
            ClientError::Decode(detail) => SessionError::InvalidResponse(detail),
            e @ ClientError::InvalidUrl { .. } => SessionError::Network(e.to_string()),
        }
    }
}

/// Convenience alias for session results.
pub type SessionResult<T> = Result<T, SessionError>;
