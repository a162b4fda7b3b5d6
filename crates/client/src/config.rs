use std::time::Duration;

use reqwest::Url;

use crate::error::{ClientError, ClientResult};

/// Backend used when `PORTAL_API_URL` is not set.
pub const DEFAULT_API_URL: &str = "http://localhost:3000";

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// HTTP client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL every endpoint path is joined onto. Always ends in `/api/`.
    pub base_url: Url,
    /// Per-request timeout.
    pub timeout: Duration,
}

impl ClientConfig {
    /// Build a configuration for a backend origin such as
    /// `https://portal.example.com`. The `/api/` prefix is appended.
    pub fn new(origin: &str) -> ClientResult<Self> {
        Ok(Self {
            base_url: api_base_url(origin)?,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        })
    }

    /// Load configuration from environment variables.
    ///
    /// | Env Var                    | Default                  |
    /// |----------------------------|--------------------------|
    /// | `PORTAL_API_URL`           | `http://localhost:3000`  |
    /// | `PORTAL_HTTP_TIMEOUT_SECS` | `30`                     |
    pub fn from_env() -> ClientResult<Self> {
        let origin = std::env::var("PORTAL_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.into());

        let timeout_secs: u64 = std::env::var("PORTAL_HTTP_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(DEFAULT_TIMEOUT_SECS);

        Ok(Self {
            base_url: api_base_url(&origin)?,
            timeout: Duration::from_secs(timeout_secs),
        })
    }
}

/// Turn a backend origin into the `/api/` base URL.
fn api_base_url(origin: &str) -> ClientResult<Url> {
    let trimmed = origin.trim().trim_end_matches('/');
    let url = Url::parse(&format!("{trimmed}/api/")).map_err(|e| ClientError::InvalidUrl {
        url: origin.to_string(),
        reason: e.to_string(),
    })?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ClientError::InvalidUrl {
            url: origin.to_string(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        });
    }

    Ok(url)
}
