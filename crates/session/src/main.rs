//! `portal-session` -- drives the portal session lifecycle from a terminal.
//!
//! Restores the stored token, logs in when there is no session and
//! credentials are given, prints the session as JSON, then keeps the expiry
//! watch running until Ctrl-C or a forced logout.
//!
//! # Environment variables
//!
//! | Variable                        | Required | Default                 | Description                       |
//! |---------------------------------|----------|-------------------------|-----------------------------------|
//! | `PORTAL_API_URL`                | no       | `http://localhost:3000` | Backend origin; `/api/` is appended |
//! | `PORTAL_HTTP_TIMEOUT_SECS`      | no       | `30`                    | Per-request timeout               |
//! | `PORTAL_TOKEN_FILE`             | no       | `.portal/token`         | Where the token is kept           |
//! | `SESSION_CHECK_INTERVAL_SECS`   | no       | `5`                     | Seconds between expiry checks     |
//! | `SESSION_EXPIRY_LOOKAHEAD_SECS` | no       | `30`                    | Expiry safety margin              |
//! | `PORTAL_EMAIL`                  | no       | --                      | Login e-mail                      |
//! | `PORTAL_PASSWORD`               | no       | --                      | Login password                    |

use std::sync::Arc;

use portal_client::{ApiClient, ClientConfig, Credentials, PortalApi};
use portal_session::guard::landing_route;
use portal_session::navigation::LogNavigator;
use portal_session::{FileTokenStore, Session, SessionConfig, SessionManager};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "portal_session=info,portal_client=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let client_config = ClientConfig::from_env().unwrap_or_else(|e| {
        tracing::error!(error = %e, "Invalid HTTP client configuration");
        std::process::exit(1);
    });
    let session_config = SessionConfig::from_env();

    tracing::info!(
        api_url = %client_config.base_url,
        token_file = %session_config.token_file.display(),
        "Starting portal-session",
    );

    let credentials = Credentials::new();
    let client = ApiClient::new(&client_config, credentials.clone()).unwrap_or_else(|e| {
        tracing::error!(error = %e, "Failed to build HTTP client");
        std::process::exit(1);
    });

    let store = Arc::new(FileTokenStore::new(session_config.token_file.clone()));
    let manager = SessionManager::new(
        Arc::new(PortalApi::new(client.clone())),
        store,
        credentials,
        session_config,
    );
    client.add_observer(manager.unauthorized_interceptor(Arc::new(LogNavigator)));

    manager.init().await;

    if !manager.session().is_authenticated() {
        if let (Ok(email), Ok(password)) = (
            std::env::var("PORTAL_EMAIL"),
            std::env::var("PORTAL_PASSWORD"),
        ) {
            match manager.login(&email, &password).await {
                Ok(user) => tracing::info!(
                    user_id = user.id,
                    landing = landing_route(&user).path(),
                    "Logged in",
                ),
                Err(e) => tracing::error!(error = %e, "Login failed"),
            }
        }
    }

    let session = manager.session();
    print_session(&session);

    if session.is_authenticated() {
        let mut changes = manager.subscribe();
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Interrupted, keeping the stored session");
            }
            _ = changes.wait_for(|s| !s.is_authenticated()) => {
                print_session(&manager.session());
            }
        }
    }

    manager.dispose();
}

fn print_session(session: &Session) {
    match serde_json::to_string_pretty(session) {
        Ok(json) => println!("{json}"),
        Err(e) => tracing::error!(error = %e, "Failed to serialize session"),
    }
}
