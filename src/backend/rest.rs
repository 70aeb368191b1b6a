//! Public auth + table client.
//!
//! Thin HTTP wrapper over the hosted service's `/auth/v1` and `/rest/v1`
//! endpoints. Response parsing is split into pure `parse_*` functions.

use uuid::Uuid;

use super::config::{BackendConfig, PublicCredentials};
use super::types::{AuthApi, BackendError, MetricsRpc, ProfileRow, ProfileStore, Session, User};
use super::{HttpBackend, is_success};

// =============================================================================
// CLIENT
// =============================================================================

pub struct BackendClient {
    backend: HttpBackend,
    anon_key: String,
    /// Key sent for `profiles` lookups. The service key when configured (the
    /// lookup runs server-side, outside any user's row-level policy), else the
    /// anonymous key.
    profile_key: String,
    metrics_rpc: String,
}

impl BackendClient {
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &BackendConfig, credentials: PublicCredentials) -> Result<Self, BackendError> {
        let backend = HttpBackend::new(&credentials.url, config.timeouts)?;
        let profile_key = config
            .service_role_key
            .clone()
            .unwrap_or_else(|| credentials.anon_key.clone());
        Ok(Self { backend, anon_key: credentials.anon_key, profile_key, metrics_rpc: config.metrics_rpc.clone() })
    }

    async fn token_grant(&self, grant_type: &str, body: serde_json::Value) -> Result<Session, BackendError> {
        let request = self
            .backend
            .http
            .post(self.backend.endpoint(&format!("/auth/v1/token?grant_type={grant_type}")))
            .header("apikey", &self.anon_key)
            .json(&body);
        let (status, text) = self.backend.send(request).await?;
        match status {
            400 | 401 => Err(BackendError::InvalidCredentials),
            s if is_success(s) => parse_session(&text),
            _ => Err(BackendError::Response { status, body: text }),
        }
    }
}

#[async_trait::async_trait]
impl AuthApi for BackendClient {
    async fn user_for_token(&self, access_token: &str) -> Result<Option<User>, BackendError> {
        let request = self
            .backend
            .http
            .get(self.backend.endpoint("/auth/v1/user"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token);
        let (status, text) = self.backend.send(request).await?;
        match status {
            401 | 403 => Ok(None),
            s if is_success(s) => parse_user(&text).map(Some),
            _ => Err(BackendError::Response { status, body: text }),
        }
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, BackendError> {
        self.token_grant("password", serde_json::json!({ "email": email, "password": password }))
            .await
    }

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, BackendError> {
        self.token_grant("refresh_token", serde_json::json!({ "refresh_token": refresh_token }))
            .await
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
        let request = self
            .backend
            .http
            .post(self.backend.endpoint("/auth/v1/logout"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token);
        let (status, text) = self.backend.send(request).await?;
        // An already-invalid token is as signed out as it gets.
        if is_success(status) || status == 401 {
            return Ok(());
        }
        Err(BackendError::Response { status, body: text })
    }
}

#[async_trait::async_trait]
impl ProfileStore for BackendClient {
    async fn select_profile(&self, user_id: Uuid) -> Result<Option<ProfileRow>, BackendError> {
        let request = self
            .backend
            .http
            .get(self.backend.endpoint(&profile_query_path(user_id)))
            .header("apikey", &self.profile_key)
            .bearer_auth(&self.profile_key);
        let (status, text) = self.backend.send(request).await?;
        if !is_success(status) {
            return Err(BackendError::Response { status, body: text });
        }
        parse_profile_rows(&text)
    }
}

#[async_trait::async_trait]
impl MetricsRpc for BackendClient {
    async fn dashboard_metrics(&self, access_token: &str) -> Result<serde_json::Value, BackendError> {
        let request = self
            .backend
            .http
            .post(self.backend.endpoint(&format!("/rest/v1/rpc/{}", self.metrics_rpc)))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .json(&serde_json::json!({}));
        let (status, text) = self.backend.send(request).await?;
        if !is_success(status) {
            return Err(BackendError::Response { status, body: text });
        }
        parse_metrics(&text)
    }
}

// =============================================================================
// PARSING
// =============================================================================

pub(crate) fn profile_query_path(user_id: Uuid) -> String {
    format!("/rest/v1/profiles?id=eq.{user_id}&select=id,role&limit=1")
}

pub(crate) fn parse_session(json: &str) -> Result<Session, BackendError> {
    serde_json::from_str(json).map_err(|e| BackendError::Parse(e.to_string()))
}

pub(crate) fn parse_user(json: &str) -> Result<User, BackendError> {
    serde_json::from_str(json).map_err(|e| BackendError::Parse(e.to_string()))
}

/// Table reads come back as a JSON array; an empty array means no row.
pub(crate) fn parse_profile_rows(json: &str) -> Result<Option<ProfileRow>, BackendError> {
    let rows: Vec<ProfileRow> = serde_json::from_str(json).map_err(|e| BackendError::Parse(e.to_string()))?;
    Ok(rows.into_iter().next())
}

/// A set-returning RPC yields an array; take its single aggregate row.
pub(crate) fn parse_metrics(json: &str) -> Result<serde_json::Value, BackendError> {
    let value: serde_json::Value = serde_json::from_str(json).map_err(|e| BackendError::Parse(e.to_string()))?;
    match value {
        serde_json::Value::Array(rows) => Ok(rows.into_iter().next().unwrap_or(serde_json::Value::Null)),
        other => Ok(other),
    }
}

#[cfg(test)]
#[path = "rest_test.rs"]
mod tests;
