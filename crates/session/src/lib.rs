//! Authentication session lifecycle for the client portal.
//!
//! [`SessionManager`] is the single source of truth for "is the caller
//! authenticated, as whom, and for how long". It restores a persisted token
//! at startup, logs in and out, watches the token's expiry in the
//! background, and funnels every authorization rejection (local expiry or a
//! server 401/403) into one logout path.
//!
//! - [`store`] -- durable token storage.
//! - [`token`] -- client-side `exp` claim decoding.
//! - [`backend`] -- the auth/profile service seam.
//! - [`interceptor`] -- the global 401/403 response observer.
//! - [`guard`] -- route-guard decisions derived from a session snapshot.

pub mod backend;
pub mod config;
pub mod error;
pub mod expiry;
pub mod funnel;
pub mod guard;
pub mod interceptor;
pub mod manager;
pub mod navigation;
pub mod state;
pub mod store;
pub mod token;

pub use backend::{AuthBackend, LoginGrant};
pub use config::SessionConfig;
pub use error::{SessionError, SessionResult};
pub use funnel::{LogoutHandle, LogoutSource};
pub use interceptor::UnauthorizedInterceptor;
pub use manager::SessionManager;
pub use navigation::{Navigator, Route};
pub use state::{Session, SessionStatus};
pub use store::{FileTokenStore, MemoryTokenStore, TokenStore};
