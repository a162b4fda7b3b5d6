//! Request and response bodies for the portal auth endpoints.

use serde::{Deserialize, Serialize};

/// Body of `POST auth/login`.
#[derive(Debug, Serialize)]
pub struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Successful `POST auth/login` response.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// Bearer token for subsequent requests.
    pub token: String,
    /// Overrides the identity's own flag when present.
    #[serde(default)]
    pub must_change_password: Option<bool>,
}

/// Body of `POST auth/change-password`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest<'a> {
    pub new_password: &'a str,
    pub confirm_password: &'a str,
}

/// Body of `POST auth/forgot-password`.
#[derive(Debug, Serialize)]
pub struct ForgotPasswordRequest<'a> {
    pub email: &'a str,
}

/// Body of `POST auth/reset-password`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest<'a> {
    /// One-time token from the reset link.
    pub token: &'a str,
    pub new_password: &'a str,
}
