//! HTTP client for the portal REST API.
//!
//! [`ApiClient`] is the shared transport: it attaches the default bearer
//! credential from [`Credentials`] to every request and reports every
//! response status to the registered [`ResponseObserver`]s. [`PortalApi`]
//! wraps it with typed endpoint calls.

pub mod api;
pub mod client;
pub mod config;
pub mod credentials;
pub mod error;
pub mod models;
pub mod observer;

pub use api::PortalApi;
pub use client::ApiClient;
pub use config::ClientConfig;
pub use credentials::Credentials;
pub use error::{ClientError, ClientResult};
pub use observer::ResponseObserver;
