//! Backend: adapters for the hosted auth + Postgres service.
//!
//! DESIGN
//! ======
//! `rest` talks to the public auth and table endpoints with the anonymous key.
//! `admin` talks to the administrative endpoints with the service key and is
//! only constructed when that key is configured. Both share one HTTP client
//! shape (`HttpBackend`) so timeouts and header conventions stay uniform.

pub mod admin;
pub mod config;
pub mod rest;
pub mod types;

use std::time::Duration;

pub use admin::AdminClient;
pub use config::{BackendConfig, ConfigError};
pub use rest::BackendClient;
pub use types::{AdminApi, AuthApi, BackendError, MetricsRpc, ProfileRow, ProfileStore, Session, User};

use config::BackendTimeouts;

/// Base URL + configured `reqwest` client, shared by the concrete adapters.
#[derive(Clone)]
pub(crate) struct HttpBackend {
    pub(crate) http: reqwest::Client,
    pub(crate) base_url: String,
}

impl HttpBackend {
    pub(crate) fn new(base_url: &str, timeouts: BackendTimeouts) -> Result<Self, BackendError> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeouts.request_secs))
            .connect_timeout(Duration::from_secs(timeouts.connect_secs))
            .build()
            .map_err(|e| BackendError::HttpClientBuild(e.to_string()))?;
        Ok(Self { http, base_url: base_url.trim_end_matches('/').to_owned() })
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// Send a prepared request and return `(status, body)`.
    pub(crate) async fn send(&self, request: reqwest::RequestBuilder) -> Result<(u16, String), BackendError> {
        let response = request
            .send()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;
        let status = response.status().as_u16();
        let body = response
            .text()
            .await
            .map_err(|e| BackendError::Request(e.to_string()))?;
        Ok((status, body))
    }
}

pub(crate) fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}
