//! Typed wrappers for the portal auth and profile endpoints.

use portal_core::identity::{Identity, ProfileUpdate};

use crate::client::ApiClient;
use crate::error::ClientResult;
use crate::models::{
    ChangePasswordRequest, ForgotPasswordRequest, LoginRequest, LoginResponse,
    ResetPasswordRequest,
};

pub const LOGIN_PATH: &str = "auth/login";
pub const CURRENT_USER_PATH: &str = "user/me";
pub const PROFILE_PATH: &str = "user/profile";
pub const CHANGE_PASSWORD_PATH: &str = "auth/change-password";
pub const FORGOT_PASSWORD_PATH: &str = "auth/forgot-password";
pub const RESET_PASSWORD_PATH: &str = "auth/reset-password";

/// Portal auth/profile API on top of a shared [`ApiClient`].
#[derive(Clone)]
pub struct PortalApi {
    client: ApiClient,
}

impl PortalApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }

    /// `POST auth/login`. Exchanges credentials for a bearer token.
    pub async fn login(&self, email: &str, password: &str) -> ClientResult<LoginResponse> {
        self.client
            .post(LOGIN_PATH, &LoginRequest { email, password })
            .await
    }

    /// `GET user/me`. Identity for the currently attached credential.
    pub async fn current_user(&self) -> ClientResult<Identity> {
        self.client.get(CURRENT_USER_PATH).await
    }

    /// `PUT user/profile`. Returns the updated identity.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> ClientResult<Identity> {
        self.client.put(PROFILE_PATH, update).await
    }

    /// `POST auth/change-password` for the current user.
    pub async fn change_password(
        &self,
        new_password: &str,
        confirm_password: &str,
    ) -> ClientResult<()> {
        self.client
            .post_no_content(
                CHANGE_PASSWORD_PATH,
                &ChangePasswordRequest {
                    new_password,
                    confirm_password,
                },
            )
            .await
    }

    /// `POST auth/forgot-password`. Asks the backend to mail a reset link.
    pub async fn forgot_password(&self, email: &str) -> ClientResult<()> {
        self.client
            .post_no_content(FORGOT_PASSWORD_PATH, &ForgotPasswordRequest { email })
            .await
    }

    /// `POST auth/reset-password` with the token from a reset link.
    pub async fn reset_password(&self, token: &str, new_password: &str) -> ClientResult<()> {
        self.client
            .post_no_content(
                RESET_PASSWORD_PATH,
                &ResetPasswordRequest {
                    token,
                    new_password,
                },
            )
            .await
    }
}
