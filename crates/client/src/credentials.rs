//! The default bearer credential shared by every request.

use std::fmt;
use std::sync::{Arc, PoisonError, RwLock};

/// Shared slot holding the bearer token attached to outgoing requests.
///
/// Cloning is cheap; all clones see the same slot. The session manager
/// sets and clears it together with the persisted token.
#[derive(Clone, Default)]
pub struct Credentials {
    token: Arc<RwLock<Option<String>>>,
}

impl Credentials {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `token` as `Authorization: Bearer <token>` from now on.
    pub fn set_default_credential(&self, token: impl Into<String>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = Some(token.into());
    }

    /// Stop attaching any credential.
    pub fn clear_default_credential(&self) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    /// The token currently attached, if any.
    pub fn bearer(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_set(&self) -> bool {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("set", &self.is_set())
            .finish()
    }
}
