#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use jsonwebtoken::{encode, EncodingKey, Header};
use portal_client::Credentials;
use portal_core::clock::{Clock, ManualClock};
use portal_core::identity::{Identity, ProfileUpdate};
use portal_core::roles::Role;
use portal_session::{
    AuthBackend, LoginGrant, MemoryTokenStore, Navigator, Route, SessionConfig, SessionError,
    SessionManager, SessionResult,
};

// ---------------------------------------------------------------------------
// Tokens and identities
// ---------------------------------------------------------------------------

/// Encode a token whose only interesting claim is `exp`. The signing key is
/// irrelevant: signatures are never checked client-side.
pub fn make_token(exp: i64) -> String {
    let claims = serde_json::json!({ "sub": "1", "exp": exp });
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(b"not-the-server-secret"),
    )
    .expect("encoding a test token should succeed")
}

/// Token expiring `secs` seconds after the clock's current time.
pub fn token_expiring_in(clock: &ManualClock, secs: i64) -> String {
    make_token(clock.now().timestamp() + secs)
}

pub fn client_identity() -> Identity {
    Identity {
        id: 1,
        email: "client@example.com".into(),
        name: "Client".into(),
        role: Role::Client,
        must_change_password: false,
    }
}

// ---------------------------------------------------------------------------
// Fake backend
// ---------------------------------------------------------------------------

/// A scripted failure, rebuilt into a fresh [`SessionError`] on every call.
#[derive(Debug, Clone)]
pub enum Fail {
    InvalidCredentials(Option<String>),
    Unauthorized,
    Server(u16, Option<String>),
    Network,
}

impl Fail {
    fn to_error(&self) -> SessionError {
        match self {
            Fail::InvalidCredentials(message) => SessionError::InvalidCredentials {
                message: message.clone(),
            },
            Fail::Unauthorized => SessionError::Unauthorized { message: None },
            Fail::Server(status, message) => SessionError::Server {
                status: *status,
                message: message.clone(),
            },
            Fail::Network => SessionError::Network("connection refused".into()),
        }
    }
}

/// In-memory [`AuthBackend`] with scripted answers and call counters.
pub struct FakeBackend {
    credentials: Credentials,
    login: Mutex<Result<LoginGrant, Fail>>,
    identity: Mutex<Result<Identity, Fail>>,
    account: Mutex<Option<Fail>>,
    pub authenticate_calls: AtomicUsize,
    pub identity_calls: AtomicUsize,
    pub account_calls: AtomicUsize,
    /// Bearer attached when `current_identity` was last called.
    pub last_bearer: Mutex<Option<String>>,
}

impl FakeBackend {
    pub fn new(credentials: Credentials) -> Arc<Self> {
        Arc::new(Self {
            credentials,
            login: Mutex::new(Err(Fail::InvalidCredentials(None))),
            identity: Mutex::new(Ok(client_identity())),
            account: Mutex::new(None),
            authenticate_calls: AtomicUsize::new(0),
            identity_calls: AtomicUsize::new(0),
            account_calls: AtomicUsize::new(0),
            last_bearer: Mutex::new(None),
        })
    }

    pub fn grant(&self, token: String, must_change_password: Option<bool>) {
        *self.login.lock().unwrap() = Ok(LoginGrant {
            token,
            must_change_password,
        });
    }

    pub fn reject_login(&self, fail: Fail) {
        *self.login.lock().unwrap() = Err(fail);
    }

    pub fn set_identity(&self, identity: Result<Identity, Fail>) {
        *self.identity.lock().unwrap() = identity;
    }

    pub fn fail_account_ops(&self, fail: Option<Fail>) {
        *self.account.lock().unwrap() = fail;
    }

    /// Total number of remote calls made.
    pub fn calls(&self) -> usize {
        self.authenticate_calls.load(Ordering::SeqCst)
            + self.identity_calls.load(Ordering::SeqCst)
            + self.account_calls.load(Ordering::SeqCst)
    }

    fn account_result(&self) -> SessionResult<()> {
        self.account_calls.fetch_add(1, Ordering::SeqCst);
        match &*self.account.lock().unwrap() {
            Some(fail) => Err(fail.to_error()),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl AuthBackend for FakeBackend {
    async fn authenticate(&self, _email: &str, _password: &str) -> SessionResult<LoginGrant> {
        self.authenticate_calls.fetch_add(1, Ordering::SeqCst);
        self.login.lock().unwrap().clone().map_err(|f| f.to_error())
    }

    async fn current_identity(&self) -> SessionResult<Identity> {
        self.identity_calls.fetch_add(1, Ordering::SeqCst);
        *self.last_bearer.lock().unwrap() = self.credentials.bearer();
        self.identity.lock().unwrap().clone().map_err(|f| f.to_error())
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> SessionResult<Identity> {
        self.account_result()?;
        let mut user = self.identity.lock().unwrap().clone().map_err(|f| f.to_error())?;
        if let Some(name) = &update.name {
            user.name = name.clone();
        }
        if let Some(email) = &update.email {
            user.email = email.clone();
        }
        Ok(user)
    }

    async fn change_password(&self, _new: &str, _confirm: &str) -> SessionResult<()> {
        self.account_result()
    }

    async fn request_password_reset(&self, _email: &str) -> SessionResult<()> {
        self.account_result()
    }

    async fn reset_password(&self, _token: &str, _new: &str) -> SessionResult<()> {
        self.account_result()
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub manager: SessionManager,
    pub backend: Arc<FakeBackend>,
    pub store: Arc<MemoryTokenStore>,
    pub credentials: Credentials,
    pub clock: Arc<ManualClock>,
}

pub fn test_config() -> SessionConfig {
    SessionConfig {
        check_interval: Duration::from_secs(5),
        expiry_lookahead: Duration::from_secs(30),
        ..SessionConfig::default()
    }
}

/// Manager over a fake backend. `stored` builds the persisted token, if
/// any, from the harness clock.
pub fn harness(stored: impl FnOnce(&ManualClock) -> Option<String>) -> Harness {
    let clock = Arc::new(ManualClock::starting_now());
    let store = Arc::new(match stored(&clock) {
        Some(token) => MemoryTokenStore::with_token(token),
        None => MemoryTokenStore::new(),
    });
    let credentials = Credentials::new();
    let backend = FakeBackend::new(credentials.clone());

    let manager = SessionManager::with_clock(
        backend.clone(),
        store.clone(),
        credentials.clone(),
        test_config(),
        clock.clone(),
    );

    Harness {
        manager,
        backend,
        store,
        credentials,
        clock,
    }
}

/// Harness that starts with a valid session for [`client_identity`].
pub async fn authenticated_harness() -> Harness {
    let h = harness(|clock| Some(token_expiring_in(clock, 1000)));
    h.manager.init().await;
    assert!(h.manager.session().is_authenticated());
    h
}

/// Wait until the session satisfies `predicate`, failing after a few
/// seconds.
pub async fn wait_for_session(
    manager: &SessionManager,
    predicate: impl FnMut(&portal_session::Session) -> bool,
) {
    let mut rx = manager.subscribe();
    tokio::time::timeout(Duration::from_secs(60), rx.wait_for(predicate))
        .await
        .expect("session should reach the expected state")
        .expect("session manager is alive");
}

// ---------------------------------------------------------------------------
// Navigation and HTTP
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct RecordingNavigator {
    routes: Mutex<Vec<Route>>,
}

impl RecordingNavigator {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn routes(&self) -> Vec<Route> {
        self.routes.lock().unwrap().clone()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        self.routes.lock().unwrap().push(route);
    }
}

/// Serve `router` on an ephemeral local port and return its origin.
pub async fn spawn_server(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("binding an ephemeral port should succeed");
    let addr = listener.local_addr().expect("listener has an address");

    tokio::spawn(async move {
        axum::serve(listener, router)
            .await
            .expect("test server should run");
    });

    format!("http://{addr}")
}
