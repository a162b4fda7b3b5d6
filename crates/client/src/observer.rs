//! Hooks invoked for every HTTP response.

use reqwest::{StatusCode, Url};

/// Observes the status of every response the [`ApiClient`] receives,
/// successful or not, before the body is read.
///
/// Observers run synchronously on the request path and must not block.
///
/// [`ApiClient`]: crate::client::ApiClient
pub trait ResponseObserver: Send + Sync {
    fn on_response(&self, status: StatusCode, url: &Url);
}
