//! Backend types: identity records, errors, and capability traits.
//!
//! DESIGN
//! ======
//! Every remote collaborator is consumed through a narrow async trait so the
//! authorization pipeline can run against the hosted service in production
//! and against in-memory fakes in tests.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::ErrorCode;
use crate::services::role::Role;

// =============================================================================
// ERROR
// =============================================================================

/// Errors produced by calls against the hosted auth/data service.
#[derive(Debug, thiserror::Error)]
pub enum BackendError {
    /// The HTTP request could not be sent or the body could not be read.
    #[error("backend request failed: {0}")]
    Request(String),

    /// The service returned a non-success status.
    #[error("backend responded with status {status}: {body}")]
    Response { status: u16, body: String },

    /// The response body did not match the expected shape.
    #[error("backend response parse failed: {0}")]
    Parse(String),

    /// Email/password or refresh token rejected by the auth service.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The underlying HTTP client could not be constructed.
    #[error("HTTP client build failed: {0}")]
    HttpClientBuild(String),

    /// Direct database lookup failed.
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

impl ErrorCode for BackendError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::Request(_) => "E_BACKEND_REQUEST",
            Self::Response { .. } => "E_BACKEND_RESPONSE",
            Self::Parse(_) => "E_BACKEND_PARSE",
            Self::InvalidCredentials => "E_INVALID_CREDENTIALS",
            Self::HttpClientBuild(_) => "E_HTTP_CLIENT_BUILD",
            Self::Db(_) => "E_DATABASE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Request(_) | Self::Response { status: 429 | 500..=599, .. })
    }
}

// =============================================================================
// IDENTITY
// =============================================================================

/// Authenticated identity as reported by the auth service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

/// Server-issued proof of an authenticated identity.
///
/// Deserializes directly from the auth service token grant response; extra
/// fields (`token_type`, `expires_in`, ...) are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    /// Unix seconds.
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: User,
}

/// One row of the `profiles` table. `role` is kept raw until the role router
/// validates it.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ProfileRow {
    pub id: Uuid,
    pub role: String,
}

// =============================================================================
// CAPABILITIES
// =============================================================================

/// Session endpoints of the hosted auth service.
#[async_trait::async_trait]
pub trait AuthApi: Send + Sync {
    /// Resolve the user behind an access token. `None` when the token is
    /// rejected (expired, revoked, malformed).
    async fn user_for_token(&self, access_token: &str) -> Result<Option<User>, BackendError>;

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, BackendError>;

    async fn refresh_session(&self, refresh_token: &str) -> Result<Session, BackendError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), BackendError>;
}

/// `selectOne(table = "profiles", filter = { id })`.
#[async_trait::async_trait]
pub trait ProfileStore: Send + Sync {
    async fn select_profile(&self, user_id: Uuid) -> Result<Option<ProfileRow>, BackendError>;
}

/// Dashboard aggregate RPC. The row is passed through untouched.
#[async_trait::async_trait]
pub trait MetricsRpc: Send + Sync {
    async fn dashboard_metrics(&self, access_token: &str) -> Result<serde_json::Value, BackendError>;
}

/// Operations that require the elevated service key.
#[async_trait::async_trait]
pub trait AdminApi: Send + Sync {
    async fn create_user(&self, email: &str, password: &str) -> Result<User, BackendError>;

    async fn update_password(&self, user_id: Uuid, password: &str) -> Result<(), BackendError>;

    /// Insert or overwrite the profile row for `user_id`. Safe to repeat.
    async fn upsert_profile(&self, user_id: Uuid, role: Role) -> Result<(), BackendError>;
}

#[cfg(test)]
#[path = "types_test.rs"]
mod tests;
