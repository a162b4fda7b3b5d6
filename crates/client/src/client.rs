//! Shared HTTP transport for the portal API.
//!
//! Wraps [`reqwest::Client`] with the base URL, the default bearer
//! credential and the response observers. Every request goes through
//! [`ApiClient::execute`], so observers see every status code no matter
//! which endpoint produced it.

use std::sync::{Arc, PoisonError, RwLock};

use reqwest::{RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::ClientConfig;
use crate::credentials::Credentials;
use crate::error::{ClientError, ClientResult};
use crate::observer::ResponseObserver;

/// HTTP client for the portal REST API.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: Url,
    credentials: Credentials,
    observers: Arc<RwLock<Vec<Arc<dyn ResponseObserver>>>>,
}

impl ApiClient {
    /// Create a client for the configured backend, attaching whatever
    /// `credentials` holds at request time.
    pub fn new(config: &ClientConfig, credentials: Credentials) -> ClientResult<Self> {
        let http = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self::with_client(http, config.base_url.clone(), credentials))
    }

    /// Create a client reusing an existing [`reqwest::Client`].
    pub fn with_client(http: reqwest::Client, base_url: Url, credentials: Credentials) -> Self {
        Self {
            http,
            base_url,
            credentials,
            observers: Arc::new(RwLock::new(Vec::new())),
        }
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// The credential slot attached to outgoing requests.
    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// Register an observer for every subsequent response.
    pub fn add_observer(&self, observer: Arc<dyn ResponseObserver>) {
        self.observers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(observer);
    }

    /// `GET {path}` and decode the JSON body.
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let url = self.url(path)?;
        let response = self.execute(self.http.get(url)).await?;
        Self::parse_response(response).await
    }

    /// `POST {path}` with a JSON body and decode the JSON response.
    pub async fn post<B, T>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path)?;
        let response = self.execute(self.http.post(url).json(body)).await?;
        Self::parse_response(response).await
    }

    /// `POST {path}` with a JSON body, ignoring the response body.
    pub async fn post_no_content<B>(&self, path: &str, body: &B) -> ClientResult<()>
    where
        B: Serialize + ?Sized,
    {
        let url = self.url(path)?;
        self.execute(self.http.post(url).json(body)).await?;
        Ok(())
    }

    /// `PUT {path}` with a JSON body and decode the JSON response.
    pub async fn put<B, T>(&self, path: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path)?;
        let response = self.execute(self.http.put(url).json(body)).await?;
        Self::parse_response(response).await
    }

    /// `DELETE {path}`, ignoring the response body.
    pub async fn delete(&self, path: &str) -> ClientResult<()> {
        let url = self.url(path)?;
        self.execute(self.http.delete(url)).await?;
        Ok(())
    }

    // ---- private helpers ----

    fn url(&self, path: &str) -> ClientResult<Url> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ClientError::InvalidUrl {
                url: format!("{}{path}", self.base_url),
                reason: e.to_string(),
            })
    }

    /// Attach the default credential, send, notify observers, and fail on
    /// non-2xx statuses.
    async fn execute(&self, request: RequestBuilder) -> ClientResult<Response> {
        let request = match self.credentials.bearer() {
            Some(token) => request.bearer_auth(token),
            None => request,
        };

        let response = request.send().await?;
        self.notify(&response);
        Self::ensure_success(response).await
    }

    fn notify(&self, response: &Response) {
        // Snapshot so observers may register further observers.
        let observers = self
            .observers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();

        tracing::debug!(
            status = response.status().as_u16(),
            url = %response.url(),
            observers = observers.len(),
            "API response",
        );

        for observer in observers {
            observer.on_response(response.status(), response.url());
        }
    }

    /// Return the response unchanged on success, or a
    /// [`ClientError::Api`] with the status, server message and body.
    async fn ensure_success(response: Response) -> ClientResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unreadable body>".to_string());

        Err(ClientError::Api {
            status: status.as_u16(),
            message: extract_message(&body),
            body,
        })
    }

    async fn parse_response<T: DeserializeOwned>(response: Response) -> ClientResult<T> {
        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| ClientError::Decode(e.to_string()))
    }
}

/// Pull the human-readable message out of a JSON error body.
///
/// Accepts `{"message": ...}` and falls back to `{"error": ...}`.
pub(crate) fn extract_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    ["message", "error"]
        .iter()
        .find_map(|key| value.get(key).and_then(|v| v.as_str()))
        .filter(|msg| !msg.trim().is_empty())
        .map(str::to_owned)
}
