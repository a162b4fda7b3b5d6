//! Route-guard decisions.
//!
//! Protected views must not decide anything while the session is still
//! initializing; otherwise a returning user would briefly be sent to the
//! login page.

use portal_core::identity::Identity;
use portal_core::roles::Role;

use crate::navigation::Route;
use crate::state::{Session, SessionStatus};

/// What a protected view should do with the current session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    /// Startup has not finished; show a loading indicator.
    Pending,
    Allow,
    Redirect(Route),
}

/// Decide access to a view restricted to `allowed_roles` (`None` means any
/// authenticated user).
pub fn authorize(session: &Session, allowed_roles: Option<&[Role]>) -> GuardDecision {
    match session.status {
        SessionStatus::Initializing => GuardDecision::Pending,
        SessionStatus::Unauthenticated => GuardDecision::Redirect(Route::Login),
        SessionStatus::Authenticated => match (&session.user, allowed_roles) {
            (None, _) => GuardDecision::Redirect(Route::Login),
            (Some(user), Some(roles)) if !roles.contains(&user.role) => {
                GuardDecision::Redirect(Route::Dashboard)
            }
            (Some(_), _) => GuardDecision::Allow,
        },
    }
}

/// Where to send a user right after logging in.
pub fn landing_route(user: &Identity) -> Route {
    if user.must_change_password {
        Route::ChangePassword
    } else {
        Route::Dashboard
    }
}
