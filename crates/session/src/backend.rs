//! The auth/profile service seam.
//!
//! [`AuthBackend`] is what the session manager talks to. The production
//! implementation is [`PortalApi`], which sends every call through the
//! shared [`ApiClient`](portal_client::ApiClient) and therefore through the
//! 401/403 interceptor.

use async_trait::async_trait;
use portal_client::{ClientError, PortalApi};
use portal_core::identity::{Identity, ProfileUpdate};

use crate::error::{SessionError, SessionResult};

/// Result of a successful credential exchange.
#[derive(Debug, Clone)]
pub struct LoginGrant {
    /// Bearer token for subsequent requests.
    pub token: String,
    /// When present, overrides the resolved identity's own flag.
    pub must_change_password: Option<bool>,
}

/// Remote operations the session manager depends on.
///
/// Calls that need a credential use whatever the shared
/// [`Credentials`](portal_client::Credentials) slot holds.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    /// Exchange e-mail and password for a token. Fails with
    /// [`SessionError::InvalidCredentials`] on a rejected login.
    async fn authenticate(&self, email: &str, password: &str) -> SessionResult<LoginGrant>;

    /// Identity behind the configured credential. Fails with
    /// [`SessionError::Unauthorized`] when the server rejects it.
    async fn current_identity(&self) -> SessionResult<Identity>;

    async fn update_profile(&self, update: &ProfileUpdate) -> SessionResult<Identity>;

    async fn change_password(&self, new_password: &str, confirm_password: &str)
        -> SessionResult<()>;

    async fn request_password_reset(&self, email: &str) -> SessionResult<()>;

    async fn reset_password(&self, reset_token: &str, new_password: &str) -> SessionResult<()>;
}

#[async_trait]
impl AuthBackend for PortalApi {
    async fn authenticate(&self, email: &str, password: &str) -> SessionResult<LoginGrant> {
        match self.login(email, password).await {
            Ok(response) => Ok(LoginGrant {
                token: response.token,
                must_change_password: response.must_change_password,
            }),
            Err(ClientError::Api {
                status: 400 | 401 | 403,
                message,
                ..
            }) => Err(SessionError::InvalidCredentials { message }),
            Err(e) => Err(e.into()),
        }
    }

    async fn current_identity(&self) -> SessionResult<Identity> {
        Ok(self.current_user().await?)
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> SessionResult<Identity> {
        Ok(PortalApi::update_profile(self, update).await?)
    }

    async fn change_password(
        &self,
        new_password: &str,
        confirm_password: &str,
    ) -> SessionResult<()> {
        Ok(PortalApi::change_password(self, new_password, confirm_password).await?)
    }

    async fn request_password_reset(&self, email: &str) -> SessionResult<()> {
        Ok(self.forgot_password(email).await?)
    }

    async fn reset_password(&self, reset_token: &str, new_password: &str) -> SessionResult<()> {
        Ok(PortalApi::reset_password(self, reset_token, new_password).await?)
    }
}
