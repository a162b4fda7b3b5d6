//! The resolved user record behind an authenticated session.

use serde::{Deserialize, Serialize};

use crate::roles::Role;
use crate::types::DbId;

/// Identity returned by the profile service (`GET user/me`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identity {
    pub id: DbId,
    pub email: String,
    pub name: String,
    pub role: Role,
    /// Set by an admin when creating the account; the user is sent to the
    /// password change screen until they pick their own password.
    #[serde(default)]
    pub must_change_password: bool,
}

impl Identity {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Partial profile edit. Absent fields are left untouched server-side.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        self.name.is_none() && self.email.is_none()
    }
}
