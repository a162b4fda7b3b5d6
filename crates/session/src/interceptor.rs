//! Global 401/403 response handling.
//!
//! This is the backstop for the case where the session still believes it
//! is authenticated but the server disagrees. Whichever request gets
//! rejected, the stored token and the default credential are dropped, the
//! user is sent to the login route, and the session manager is asked to end
//! the session.

use std::sync::Arc;

use portal_client::{Credentials, ResponseObserver};
use reqwest::{StatusCode, Url};

use crate::funnel::{LogoutHandle, LogoutSource};
use crate::navigation::{Navigator, Route};
use crate::state::SESSION_EXPIRED_REASON;
use crate::store::TokenStore;

/// [`ResponseObserver`] that turns every 401/403 into a forced logout.
///
/// Build it with
/// [`SessionManager::unauthorized_interceptor`](crate::SessionManager::unauthorized_interceptor)
/// and register it on the shared [`ApiClient`](portal_client::ApiClient).
pub struct UnauthorizedInterceptor {
    store: Arc<dyn TokenStore>,
    credentials: Credentials,
    navigator: Arc<dyn Navigator>,
    logout: LogoutHandle,
}

impl UnauthorizedInterceptor {
    pub fn new(
        store: Arc<dyn TokenStore>,
        credentials: Credentials,
        navigator: Arc<dyn Navigator>,
        logout: LogoutHandle,
    ) -> Self {
        Self {
            store,
            credentials,
            navigator,
            logout,
        }
    }
}

impl ResponseObserver for UnauthorizedInterceptor {
    fn on_response(&self, status: StatusCode, url: &Url) {
        if status != StatusCode::UNAUTHORIZED && status != StatusCode::FORBIDDEN {
            return;
        }

        tracing::warn!(
            status = status.as_u16(),
            url = %url,
            "Server rejected the credential, forcing logout",
        );

        let rejected = self.credentials.bearer();
        if let Err(e) = self.store.clear() {
            tracing::warn!(error = %e, "Failed to clear stored token");
        }
        self.credentials.clear_default_credential();

        match rejected {
            Some(token) => self.logout.force_logout_for(
                LogoutSource::ServerRejection,
                SESSION_EXPIRED_REASON,
                token,
            ),
            None => self
                .logout
                .force_logout(LogoutSource::ServerRejection, SESSION_EXPIRED_REASON),
        }
        self.navigator.navigate(Route::Login);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::store::MemoryTokenStore;

    #[derive(Default)]
    struct Recorder(Mutex<Vec<Route>>);

    impl Navigator for Recorder {
        fn navigate(&self, route: Route) {
            self.0.lock().unwrap().push(route);
        }
    }

    fn setup() -> (
        UnauthorizedInterceptor,
        Arc<MemoryTokenStore>,
        Credentials,
        Arc<Recorder>,
        tokio::sync::mpsc::UnboundedReceiver<crate::funnel::ForceLogout>,
    ) {
        let store = Arc::new(MemoryTokenStore::with_token("stored"));
        let credentials = Credentials::new();
        credentials.set_default_credential("stored");
        let navigator = Arc::new(Recorder::default());
        let (logout, rx) = LogoutHandle::channel();
        let interceptor =
            UnauthorizedInterceptor::new(store.clone(), credentials.clone(), navigator.clone(), logout);
        (interceptor, store, credentials, navigator, rx)
    }

    fn url() -> Url {
        Url::parse("http://localhost:3000/api/projects").unwrap()
    }

    #[test]
    fn rejection_clears_token_navigates_and_requests_logout() {
        let (interceptor, store, credentials, navigator, mut rx) = setup();

        interceptor.on_response(StatusCode::FORBIDDEN, &url());

        assert_eq!(store.read(), None);
        assert!(!credentials.is_set());
        assert_eq!(*navigator.0.lock().unwrap(), vec![Route::Login]);
        let request = rx.try_recv().expect("a logout request should be queued");
        assert_eq!(request.source, LogoutSource::ServerRejection);
        assert_eq!(request.reason, SESSION_EXPIRED_REASON);
        assert_eq!(request.token.as_deref(), Some("stored"));
    }

    #[test]
    fn other_statuses_are_ignored() {
        let (interceptor, store, credentials, navigator, mut rx) = setup();

        for status in [StatusCode::OK, StatusCode::NOT_FOUND, StatusCode::BAD_GATEWAY] {
            interceptor.on_response(status, &url());
        }

        assert_eq!(store.read().as_deref(), Some("stored"));
        assert!(credentials.is_set());
        assert!(navigator.0.lock().unwrap().is_empty());
        assert!(rx.try_recv().is_err());
    }
}
