//! HTTP-level tests for the portal API client against an in-process
//! backend.

mod common;

use assert_matches::assert_matches;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use common::{client_for, spawn_server, RecordingObserver};
use portal_client::{ClientError, Credentials, PortalApi};
use portal_core::identity::ProfileUpdate;
use portal_core::roles::Role;
use serde_json::{json, Value};

// ---------------------------------------------------------------------------
// Fake backend
// ---------------------------------------------------------------------------

const VALID_TOKEN: &str = "valid-token";

fn bearer(headers: &HeaderMap) -> Option<String> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_owned)
}

async fn login(Json(body): Json<Value>) -> Response {
    if body["email"] == "a@b.com" && body["password"] == "secret-password" {
        Json(json!({ "token": VALID_TOKEN, "mustChangePassword": true })).into_response()
    } else {
        (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Invalid credentials" })),
        )
            .into_response()
    }
}

async fn me(headers: HeaderMap) -> Response {
    match bearer(&headers).as_deref() {
        Some(VALID_TOKEN) => Json(json!({
            "id": 1,
            "email": "a@b.com",
            "name": "Client One",
            "role": "CLIENT",
            "mustChangePassword": false,
        }))
        .into_response(),
        _ => (
            StatusCode::UNAUTHORIZED,
            Json(json!({ "message": "Token expired" })),
        )
            .into_response(),
    }
}

async fn profile(headers: HeaderMap, Json(body): Json<Value>) -> Response {
    if bearer(&headers).as_deref() != Some(VALID_TOKEN) {
        return StatusCode::FORBIDDEN.into_response();
    }
    let name = body["name"].clone();
    Json(json!({
        "id": 1,
        "email": "a@b.com",
        "name": name,
        "role": "CLIENT",
    }))
    .into_response()
}

async fn broken() -> Response {
    Json(json!({ "unexpected": true })).into_response()
}

async fn server_error() -> Response {
    (StatusCode::INTERNAL_SERVER_ERROR, "boom").into_response()
}

fn backend() -> Router {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/user/me", get(me))
        .route("/api/user/profile", put(profile))
        .route("/api/broken", get(broken))
        .route("/api/explode", get(server_error))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

/// Login returns the token and the optional password-change flag.
#[tokio::test]
async fn login_returns_token_and_flag() {
    let origin = spawn_server(backend()).await;
    let api = PortalApi::new(client_for(&origin, Credentials::new()));

    let response = api.login("a@b.com", "secret-password").await.unwrap();

    assert_eq!(response.token, VALID_TOKEN);
    assert_eq!(response.must_change_password, Some(true));
}

/// A rejected login carries the server's message and status.
#[tokio::test]
async fn rejected_login_exposes_server_message() {
    let origin = spawn_server(backend()).await;
    let api = PortalApi::new(client_for(&origin, Credentials::new()));

    let err = api.login("a@b.com", "wrong").await.unwrap_err();

    assert_matches!(err, ClientError::Api { status: 401, .. });
    assert_eq!(err.server_message(), Some("Invalid credentials"));
}

/// The default credential is attached as a bearer token once set, and
/// dropped again once cleared.
#[tokio::test]
async fn default_credential_is_attached_and_cleared() {
    let origin = spawn_server(backend()).await;
    let credentials = Credentials::new();
    let api = PortalApi::new(client_for(&origin, credentials.clone()));

    let err = api.current_user().await.unwrap_err();
    assert!(err.is_auth_rejection());

    credentials.set_default_credential(VALID_TOKEN);
    let user = api.current_user().await.unwrap();
    assert_eq!(user.id, 1);
    assert_eq!(user.role, Role::Client);

    credentials.clear_default_credential();
    assert!(api.current_user().await.unwrap_err().is_auth_rejection());
}

/// Observers see every response, successful or not.
#[tokio::test]
async fn observers_see_every_status() {
    let origin = spawn_server(backend()).await;
    let credentials = Credentials::new();
    let client = client_for(&origin, credentials.clone());
    let observer = RecordingObserver::new();
    client.add_observer(observer.clone());
    let api = PortalApi::new(client);

    let _ = api.current_user().await;
    credentials.set_default_credential(VALID_TOKEN);
    let _ = api.current_user().await;
    let _ = api
        .update_profile(&ProfileUpdate {
            name: Some("Renamed".into()),
            email: None,
        })
        .await;

    assert_eq!(
        observer.seen(),
        vec![
            (401, "/api/user/me".to_string()),
            (200, "/api/user/me".to_string()),
            (200, "/api/user/profile".to_string()),
        ]
    );
}

/// Profile updates return the identity echoed by the server.
#[tokio::test]
async fn update_profile_returns_new_identity() {
    let origin = spawn_server(backend()).await;
    let credentials = Credentials::new();
    credentials.set_default_credential(VALID_TOKEN);
    let api = PortalApi::new(client_for(&origin, credentials));

    let user = api
        .update_profile(&ProfileUpdate {
            name: Some("Renamed".into()),
            email: None,
        })
        .await
        .unwrap();

    assert_eq!(user.name, "Renamed");
}

/// A 2xx body of the wrong shape is a decode error, not a transport error.
#[tokio::test]
async fn unexpected_body_is_a_decode_error() {
    let origin = spawn_server(backend()).await;
    let client = client_for(&origin, Credentials::new());

    let result: Result<portal_core::identity::Identity, _> = client.get("broken").await;

    assert_matches!(result, Err(ClientError::Decode(_)));
}

/// Non-JSON error bodies still produce an API error without a message.
#[tokio::test]
async fn plain_text_error_has_no_server_message() {
    let origin = spawn_server(backend()).await;
    let client = client_for(&origin, Credentials::new());

    let err = client.delete("explode").await.unwrap_err();

    // DELETE is not routed, so axum answers 405.
    assert_eq!(err.status(), Some(405));

    let result: Result<Value, _> = client.get("explode").await;
    let err = result.unwrap_err();
    assert_matches!(err, ClientError::Api { status: 500, ref body, .. } if body == "boom");
    assert_eq!(err.server_message(), None);
}

/// An unreachable backend is a request error.
#[tokio::test]
async fn unreachable_backend_is_a_request_error() {
    // Port 9 (discard) is not served in the test environment.
    let api = PortalApi::new(client_for("http://127.0.0.1:9", Credentials::new()));

    let err = api.current_user().await.unwrap_err();

    assert_matches!(err, ClientError::Request(_));
}
