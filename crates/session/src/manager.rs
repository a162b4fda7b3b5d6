//! The session manager.
//!
//! [`SessionManager`] owns the token, the resolved identity and the
//! readiness state of the one session a running application has. State is
//! published through a [`tokio::sync::watch`] channel: [`session`] returns
//! a synchronous snapshot and [`subscribe`] lets consumers await changes.
//!
//! Two background tasks run while the manager lives:
//!
//! - the force-logout consumer, started by [`init`], which applies every
//!   [`ForceLogout`] sent by the expiry watch or the 401/403 interceptor;
//! - the expiry watch, running only while the session is authenticated.
//!
//! Both are cancelled on [`dispose`] or when the last handle is dropped.
//!
//! [`session`]: SessionManager::session
//! [`subscribe`]: SessionManager::subscribe
//! [`init`]: SessionManager::init
//! [`dispose`]: SessionManager::dispose

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use portal_client::Credentials;
use portal_core::clock::{Clock, SystemClock};
use portal_core::error::CoreError;
use portal_core::identity::{Identity, ProfileUpdate};
use portal_core::types::Timestamp;
use portal_core::validation::{validate_email, validate_new_password};
use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;

use crate::backend::AuthBackend;
use crate::config::SessionConfig;
use crate::error::{SessionError, SessionResult};
use crate::expiry::ExpiryWatch;
use crate::funnel::{ForceLogout, LogoutHandle};
use crate::interceptor::UnauthorizedInterceptor;
use crate::navigation::Navigator;
use crate::state::{ActiveToken, Session, SessionStatus, SESSION_EXPIRED_REASON};
use crate::store::TokenStore;
use crate::token;

const LOGIN_FAILED: &str = "Login failed";
const CHANGE_PASSWORD_FAILED: &str = "Could not change password";
const UPDATE_PROFILE_FAILED: &str = "Could not update profile";
const REQUEST_RESET_FAILED: &str = "Could not request a password reset";
const RESET_PASSWORD_FAILED: &str = "Could not reset password";

/// Handle to the application's session. Cheap to clone; all clones share
/// the same state.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<Inner>,
}

struct Inner {
    backend: Arc<dyn AuthBackend>,
    store: Arc<dyn TokenStore>,
    credentials: Credentials,
    clock: Arc<dyn Clock>,
    config: SessionConfig,
    state: watch::Sender<Session>,
    logout: LogoutHandle,
    /// Taken by the consumer task on `init`.
    logout_rx: Mutex<Option<mpsc::UnboundedReceiver<ForceLogout>>>,
    /// Cancellation token of the running expiry watch, if any.
    expiry_watch: Mutex<Option<CancellationToken>>,
    started: AtomicBool,
    /// Master token; every background task runs under a child of it.
    shutdown: CancellationToken,
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SessionManager {
    /// Create a manager in the `Initializing` state. Nothing happens until
    /// [`init`](Self::init) is called.
    ///
    /// `credentials` must be the slot used by the HTTP client behind
    /// `backend`, so that setting the credential here affects its requests.
    pub fn new(
        backend: Arc<dyn AuthBackend>,
        store: Arc<dyn TokenStore>,
        credentials: Credentials,
        config: SessionConfig,
    ) -> Self {
        Self::with_clock(backend, store, credentials, config, Arc::new(SystemClock))
    }

    /// Like [`new`](Self::new) with an explicit time source.
    pub fn with_clock(
        backend: Arc<dyn AuthBackend>,
        store: Arc<dyn TokenStore>,
        credentials: Credentials,
        config: SessionConfig,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let (state, _) = watch::channel(Session::initializing());
        let (logout, logout_rx) = LogoutHandle::channel();

        Self {
            inner: Arc::new(Inner {
                backend,
                store,
                credentials,
                clock,
                config,
                state,
                logout,
                logout_rx: Mutex::new(Some(logout_rx)),
                expiry_watch: Mutex::new(None),
                started: AtomicBool::new(false),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Producer handle for the force-logout channel.
    pub fn logout_handle(&self) -> LogoutHandle {
        self.inner.logout.clone()
    }

    /// Response observer that turns every 401/403 into a forced logout.
    /// Register it on the HTTP client shared with the backend.
    pub fn unauthorized_interceptor(
        &self,
        navigator: Arc<dyn Navigator>,
    ) -> Arc<UnauthorizedInterceptor> {
        Arc::new(UnauthorizedInterceptor::new(
            Arc::clone(&self.inner.store),
            self.inner.credentials.clone(),
            navigator,
            self.logout_handle(),
        ))
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    /// Snapshot of the current session.
    pub fn session(&self) -> Session {
        self.inner.state.borrow().clone()
    }

    pub fn status(&self) -> SessionStatus {
        self.inner.state.borrow().status
    }

    /// Receiver that observes every session change.
    pub fn subscribe(&self) -> watch::Receiver<Session> {
        self.inner.state.subscribe()
    }

    /// Wait until the startup sequence has finished and return the session
    /// it produced.
    pub async fn wait_until_ready(&self) -> Session {
        let mut rx = self.inner.state.subscribe();
        let ready = rx.wait_for(Session::is_ready).await.map(|s| s.clone());
        match ready {
            Ok(session) => session,
            Err(_) => self.session(),
        }
    }

    /// True while an expiry watch task is scheduled.
    pub fn is_watching_expiry(&self) -> bool {
        lock(&self.inner.expiry_watch)
            .as_ref()
            .is_some_and(|cancel| !cancel.is_cancelled())
    }

    // ---------------------------------------------------------------------
    // Lifecycle
    // ---------------------------------------------------------------------

    /// Run the startup sequence.
    ///
    /// Only the first call does any work; later calls wait for it to finish.
    /// Startup failures never surface as errors: they resolve to an
    /// unauthenticated session.
    pub async fn init(&self) {
        if self.inner.started.swap(true, Ordering::SeqCst) {
            tokio::select! {
                _ = self.inner.shutdown.cancelled() => {}
                _ = self.wait_until_ready() => {}
            }
            return;
        }

        self.inner.spawn_logout_consumer();
        self.inner.startup().await;

        let session = self.session();
        tracing::info!(
            status = ?session.status,
            user_id = session.user.as_ref().map(|u| u.id),
            "Session initialized",
        );
    }

    /// Stop all background work. The manager keeps its last state but
    /// processes no further forced logouts. Terminal.
    pub fn dispose(&self) {
        self.inner.started.store(true, Ordering::SeqCst);
        self.inner.shutdown.cancel();
        self.inner.stop_expiry_watch();
        tracing::debug!("Session manager disposed");
    }

    /// Exchange credentials for a session.
    ///
    /// On failure the session is left as it was and the error message is
    /// the server's, or `"Login failed"` when it sent none.
    pub async fn login(&self, email: &str, password: &str) -> SessionResult<Identity> {
        self.inner
            .login(email, password)
            .await
            .map_err(|e| e.with_fallback(LOGIN_FAILED))
    }

    /// End the session without recording a reason. Idempotent.
    pub fn logout(&self) {
        self.inner.end_session(None);
    }

    /// End the session and record `reason` for the next login screen.
    pub fn logout_with_reason(&self, reason: impl Into<String>) {
        let reason = reason.into();
        self.inner.end_session(Some(&reason));
    }

    /// Forget the last logout reason once it has been shown. Idempotent.
    pub fn clear_logout_reason(&self) {
        self.inner
            .state
            .send_if_modified(|s| s.logout_reason.take().is_some());
    }

    // ---------------------------------------------------------------------
    // Account operations
    // ---------------------------------------------------------------------

    /// Change the password of the logged-in user. Clears the user's
    /// must-change-password flag on success.
    pub async fn change_password(&self, new_password: &str, confirm: &str) -> SessionResult<()> {
        self.inner
            .change_password(new_password, confirm)
            .await
            .map_err(|e| e.with_fallback(CHANGE_PASSWORD_FAILED))
    }

    /// Update the logged-in user's profile and adopt the returned identity.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> SessionResult<Identity> {
        self.inner
            .update_profile(update)
            .await
            .map_err(|e| e.with_fallback(UPDATE_PROFILE_FAILED))
    }

    /// Ask the backend to send a password reset e-mail.
    pub async fn request_password_reset(&self, email: &str) -> SessionResult<()> {
        self.inner
            .request_password_reset(email)
            .await
            .map_err(|e| e.with_fallback(REQUEST_RESET_FAILED))
    }

    /// Set a new password using a reset token from the e-mail link. Does not
    /// touch the current session.
    pub async fn reset_password(
        &self,
        reset_token: &str,
        new_password: &str,
        confirm: &str,
    ) -> SessionResult<()> {
        self.inner
            .reset_password(reset_token, new_password, confirm)
            .await
            .map_err(|e| e.with_fallback(RESET_PASSWORD_FAILED))
    }
}

impl Inner {
    fn spawn_logout_consumer(self: &Arc<Self>) {
        let Some(mut rx) = lock(&self.logout_rx).take() else {
            return;
        };
        let weak: Weak<Inner> = Arc::downgrade(self);
        let shutdown = self.shutdown.clone();

        tokio::spawn(async move {
            loop {
                let request = tokio::select! {
                    _ = shutdown.cancelled() => break,
                    request = rx.recv() => match request {
                        Some(request) => request,
                        None => break,
                    },
                };
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                inner.apply_forced_logout(request);
            }
            tracing::debug!("Force-logout consumer stopped");
        });
    }

    fn apply_forced_logout(&self, request: ForceLogout) {
        let (status, current) = {
            let session = self.state.borrow();
            (session.status, session.token().map(str::to_owned))
        };

        match status {
            SessionStatus::Initializing => {
                tracing::debug!(source = ?request.source, "Ignoring forced logout during startup");
            }
            SessionStatus::Authenticated => {
                if request.token.is_some() && request.token != current {
                    tracing::debug!(source = ?request.source, "Ignoring stale forced logout");
                    return;
                }
                tracing::info!(source = ?request.source, reason = %request.reason, "Forced logout");
                self.end_session(Some(&request.reason));
            }
            SessionStatus::Unauthenticated => {
                // Nothing to end; a rejected login must not read as an
                // expired session.
                self.end_session(None);
            }
        }
    }

    async fn startup(&self) {
        let Some(stored) = self.store.read() else {
            tracing::debug!("No stored token");
            self.finish_unauthenticated(None);
            return;
        };

        let expires_at = match token::decode_expiry(&stored) {
            Ok(expires_at) => expires_at,
            Err(e) => {
                tracing::warn!(error = %e, "Discarding unreadable stored token");
                self.finish_unauthenticated(None);
                return;
            }
        };

        if expires_at <= self.clock.now() {
            tracing::info!(%expires_at, "Stored token has expired");
            self.finish_unauthenticated(Some(SESSION_EXPIRED_REASON));
            return;
        }

        self.credentials.set_default_credential(stored.clone());
        match self.backend.current_identity().await {
            // A logout during startup clears the credential; honor it.
            Ok(_) if self.credentials.bearer().as_deref() != Some(stored.as_str()) => {
                self.finish_unauthenticated(None);
            }
            Ok(user) => self.establish(stored, expires_at, user),
            Err(e) if e.is_unauthorized() => {
                tracing::info!("Stored token was rejected by the server");
                self.finish_unauthenticated(Some(SESSION_EXPIRED_REASON));
            }
            Err(e) => {
                tracing::warn!(error = %e, "Could not resolve identity for stored token");
                self.finish_unauthenticated(None);
            }
        }
    }

    async fn login(&self, email: &str, password: &str) -> SessionResult<Identity> {
        if !self.state.borrow().is_ready() {
            return Err(SessionError::Initializing);
        }

        let grant = self.backend.authenticate(email, password).await?;
        let expires_at = token::decode_expiry(&grant.token)?;

        let previous = self.state.borrow().token().map(str::to_owned);
        self.install_credential(&grant.token)?;

        match self.backend.current_identity().await {
            Ok(mut user) => {
                if let Some(flag) = grant.must_change_password {
                    user.must_change_password = flag;
                }
                tracing::info!(user_id = user.id, role = %user.role, "Logged in");
                self.establish(grant.token, expires_at, user.clone());
                Ok(user)
            }
            // A rejection ends any earlier session as well; its token must
            // not be restored.
            Err(e) if e.is_unauthorized() => {
                tracing::warn!(error = %e, "New token rejected right after login");
                match previous {
                    Some(_) => self.end_session(Some(SESSION_EXPIRED_REASON)),
                    None => self.discard_credential(),
                }
                Err(e)
            }
            Err(e) => {
                tracing::warn!(error = %e, "Identity resolution failed after login");
                self.roll_back_credential(previous.as_deref());
                Err(e)
            }
        }
    }

    async fn change_password(&self, new_password: &str, confirm: &str) -> SessionResult<()> {
        self.require_authenticated()?;
        validate_new_password(new_password, confirm)?;

        let result = self.backend.change_password(new_password, confirm).await;
        self.end_on_rejection(result)?;

        self.state.send_modify(|s| {
            if let Some(user) = s.user.as_mut() {
                user.must_change_password = false;
            }
        });
        tracing::info!("Password changed");
        Ok(())
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> SessionResult<Identity> {
        self.require_authenticated()?;
        if update.is_empty() {
            return Err(CoreError::Validation("Nothing to update".into()).into());
        }
        if let Some(email) = &update.email {
            validate_email(email)?;
        }

        let result = self.backend.update_profile(update).await;
        let user = self.end_on_rejection(result)?;

        self.state.send_if_modified(|s| {
            if !s.is_authenticated() {
                return false;
            }
            s.user = Some(user.clone());
            true
        });
        tracing::info!(user_id = user.id, "Profile updated");
        Ok(user)
    }

    async fn request_password_reset(&self, email: &str) -> SessionResult<()> {
        validate_email(email)?;
        self.backend.request_password_reset(email.trim()).await?;
        tracing::info!("Password reset requested");
        Ok(())
    }

    async fn reset_password(
        &self,
        reset_token: &str,
        new_password: &str,
        confirm: &str,
    ) -> SessionResult<()> {
        if reset_token.trim().is_empty() {
            return Err(CoreError::Validation("Reset link is invalid or incomplete".into()).into());
        }
        validate_new_password(new_password, confirm)?;
        self.backend.reset_password(reset_token, new_password).await?;
        tracing::info!("Password reset completed");
        Ok(())
    }

    fn require_authenticated(&self) -> SessionResult<()> {
        match self.state.borrow().status {
            SessionStatus::Authenticated => Ok(()),
            SessionStatus::Initializing => Err(SessionError::Initializing),
            SessionStatus::Unauthenticated => Err(SessionError::NotAuthenticated),
        }
    }

    /// Server rejections of the session credential end the session.
    fn end_on_rejection<T>(&self, result: SessionResult<T>) -> SessionResult<T> {
        if let Err(e) = &result {
            if e.is_unauthorized() {
                self.end_session(Some(SESSION_EXPIRED_REASON));
            }
        }
        result
    }

    // ---------------------------------------------------------------------
    // Transitions
    // ---------------------------------------------------------------------

    /// Persist the token and attach it to requests, as one unit.
    fn install_credential(&self, token: &str) -> SessionResult<()> {
        self.store.persist(token)?;
        self.credentials.set_default_credential(token);
        Ok(())
    }

    fn roll_back_credential(&self, previous: Option<&str>) {
        match previous {
            Some(token) => {
                if let Err(e) = self.install_credential(token) {
                    tracing::warn!(error = %e, "Failed to restore previous token");
                }
            }
            None => self.discard_credential(),
        }
    }

    fn discard_credential(&self) {
        if let Err(e) = self.store.clear() {
            tracing::warn!(error = %e, "Failed to clear stored token");
        }
        self.credentials.clear_default_credential();
    }

    /// Enter `Authenticated`. An authenticated session carries no logout
    /// reason.
    fn establish(&self, token: String, expires_at: Timestamp, user: Identity) {
        self.state.send_modify(|s| {
            s.status = SessionStatus::Authenticated;
            s.user = Some(user);
            s.logout_reason = None;
            s.active = Some(ActiveToken { token, expires_at });
        });
        self.start_expiry_watch();
    }

    /// Leave the startup sequence without a session.
    fn finish_unauthenticated(&self, reason: Option<&str>) {
        self.discard_credential();
        self.state.send_modify(|s| {
            s.reset();
            if let Some(reason) = reason {
                s.logout_reason = Some(reason.to_owned());
            }
        });
    }

    /// Drop token, credential and user and stop the expiry watch.
    ///
    /// `None` leaves any earlier reason in place. While the startup sequence
    /// runs only the credential is dropped; startup publishes the outcome.
    fn end_session(&self, reason: Option<&str>) {
        self.stop_expiry_watch();
        self.discard_credential();

        self.state.send_if_modified(|s| {
            if s.status == SessionStatus::Initializing {
                return false;
            }
            let was_authenticated = s.is_authenticated();
            s.reset();
            match reason {
                Some(reason) => {
                    s.logout_reason = Some(reason.to_owned());
                    true
                }
                None => was_authenticated,
            }
        });
    }

    fn start_expiry_watch(&self) {
        let cancel = self.shutdown.child_token();
        let previous = lock(&self.expiry_watch).replace(cancel.clone());
        if let Some(previous) = previous {
            previous.cancel();
        }

        ExpiryWatch {
            session: self.state.subscribe(),
            clock: Arc::clone(&self.clock),
            interval: self.config.check_interval,
            lookahead: self.config.lookahead(),
            logout: self.logout.clone(),
            cancel,
        }
        .spawn();
    }

    fn stop_expiry_watch(&self) {
        if let Some(cancel) = lock(&self.expiry_watch).take() {
            cancel.cancel();
        }
    }
}
