//! Routing seam between the session layer and the UI shell.

use serde::Serialize;

/// Routes the session layer can send the user to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Route {
    /// The unauthenticated entry point.
    Login,
    Dashboard,
    ChangePassword,
}

impl Route {
    pub fn path(&self) -> &'static str {
        match self {
            Route::Login => "/login",
            Route::Dashboard => "/dashboard",
            Route::ChangePassword => "/change-password",
        }
    }
}

/// Performs navigation on behalf of the session layer.
///
/// Implementations must be cheap and non-blocking: they are called from
/// the HTTP response path.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Navigator for headless use: records the redirect in the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, route: Route) {
        tracing::info!(route = route.path(), "Navigate");
    }
}
