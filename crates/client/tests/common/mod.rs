use std::sync::{Arc, Mutex};

use axum::Router;
use portal_client::{ApiClient, ClientConfig, Credentials, ResponseObserver};
use reqwest::{StatusCode, Url};

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

/// Build an [`ApiClient`] pointed at `origin`.
pub fn client_for(origin: &str, credentials: Credentials) -> ApiClient {
    let config = ClientConfig::new(origin).expect("test origin is a valid URL");
    ApiClient::new(&config, credentials).expect("client should build")
}

/// Records every `(status, path)` pair it observes.
#[derive(Default)]
pub struct RecordingObserver {
    seen: Mutex<Vec<(u16, String)>>,
}

impl RecordingObserver {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seen(&self) -> Vec<(u16, String)> {
        self.seen.lock().unwrap().clone()
    }
}

impl ResponseObserver for RecordingObserver {
    fn on_response(&self, status: StatusCode, url: &Url) {
        self.seen
            .lock()
            .unwrap()
            .push((status.as_u16(), url.path().to_string()));
    }
}
