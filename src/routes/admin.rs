//! Admin routes: dashboard metrics and account management.
//!
//! ERROR HANDLING
//! ==============
//! Handlers that need the service key check for it before anything else: a
//! missing key answers `500` with `E_CONFIG` and no remote call is made, not
//! even the caller's session lookup. Request bodies are extracted as
//! `Result` and only inspected after that check, so a malformed body still
//! gets the configuration error. Only then is the caller required to be a
//! signed-in admin.

use std::sync::Arc;

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum_extra::extract::cookie::CookieJar;
use serde::Deserialize;
use uuid::Uuid;

use super::auth::resolve_viewer;
use super::{error_body, error_response};
use crate::backend::{AdminApi, BackendError};
use crate::services::accounts::{self, AccountError};
use crate::services::auth_state::AuthSnapshot;
use crate::services::role::{Role, Section};
use crate::services::role_router::{Authorization, RoleRouter};
use crate::state::AppState;

fn admin_api(state: &AppState) -> Result<Arc<dyn AdminApi>, Response> {
    state.admin.clone().map_err(|e| {
        tracing::error!(error = %e, "admin operation refused");
        error_response(StatusCode::INTERNAL_SERVER_ERROR, &e)
    })
}

fn request_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, Response> {
    body.map(|Json(body)| body).map_err(|rejection| {
        tracing::debug!(error = %rejection, "admin request body rejected");
        error_body(rejection.status(), "E_BAD_REQUEST", &rejection.body_text())
    })
}

/// Caller's snapshot if they are a signed-in admin.
async fn require_admin(state: &AppState, jar: &CookieJar) -> Result<AuthSnapshot, Response> {
    let viewer = resolve_viewer(state, jar).await;
    let Some(role) = viewer.snapshot.role else {
        return Err(error_body(StatusCode::UNAUTHORIZED, "E_NO_SESSION", "not signed in"));
    };
    match RoleRouter::authorize(role, Section::Admin) {
        Authorization::Allow => Ok(viewer.snapshot),
        Authorization::Deny(_) => {
            tracing::warn!(%role, "admin route denied");
            Err(error_body(StatusCode::FORBIDDEN, "E_FORBIDDEN", "admin role required"))
        }
    }
}

fn account_error_response(err: &AccountError) -> Response {
    let status = match err {
        AccountError::InvalidEmail | AccountError::WeakPassword { .. } => StatusCode::BAD_REQUEST,
        AccountError::Upstream(BackendError::Response { status: 404, .. }) => StatusCode::NOT_FOUND,
        AccountError::Upstream(BackendError::Response { status: 409 | 422, .. }) => StatusCode::CONFLICT,
        AccountError::Upstream(_) => StatusCode::BAD_GATEWAY,
        AccountError::ProfileStep { user_id, .. } => {
            let body = serde_json::json!({
                "error": err.to_string(),
                "code": crate::error::ErrorCode::error_code(err),
                "retryable": true,
                "user_id": user_id,
            });
            return (StatusCode::BAD_GATEWAY, Json(body)).into_response();
        }
    };
    error_response(status, err)
}

/// `GET /api/admin/metrics`: dashboard metrics RPC, called with the admin's
/// own access token.
pub async fn metrics(State(state): State<AppState>, jar: CookieJar) -> Response {
    let snapshot = match require_admin(&state, &jar).await {
        Ok(snapshot) => snapshot,
        Err(resp) => return resp,
    };
    let Some(session) = snapshot.session else {
        return error_body(StatusCode::UNAUTHORIZED, "E_NO_SESSION", "not signed in");
    };
    match state.metrics.dashboard_metrics(&session.access_token).await {
        Ok(value) => Json(value).into_response(),
        Err(e) => {
            tracing::error!(error = %e, "dashboard metrics failed");
            error_response(StatusCode::BAD_GATEWAY, &e)
        }
    }
}

#[derive(Deserialize)]
pub struct CreateUserRequest {
    pub email: String,
    pub password: String,
    pub role: Role,
}

/// `POST /api/admin/users`: create an auth user and its profile.
pub async fn create_user(
    State(state): State<AppState>,
    jar: CookieJar,
    body: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Response {
    let admin = match admin_api(&state) {
        Ok(admin) => admin,
        Err(resp) => return resp,
    };
    if let Err(resp) = require_admin(&state, &jar).await {
        return resp;
    }
    let body = match request_body(body) {
        Ok(body) => body,
        Err(resp) => return resp,
    };
    match accounts::create_account(&*admin, &body.email, &body.password, body.role).await {
        Ok(created) => (StatusCode::CREATED, Json(created)).into_response(),
        Err(e) => account_error_response(&e),
    }
}

#[derive(Deserialize)]
pub struct ProfileRequest {
    pub role: Role,
}

/// `PUT /api/admin/users/{id}/profile`: idempotent role assignment.
pub async fn upsert_profile(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(user_id): Path<Uuid>,
    body: Result<Json<ProfileRequest>, JsonRejection>,
) -> Response {
    let admin = match admin_api(&state) {
        Ok(admin) => admin,
        Err(resp) => return resp,
    };
    if let Err(resp) = require_admin(&state, &jar).await {
        return resp;
    }
    let body = match request_body(body) {
        Ok(body) => body,
        Err(resp) => return resp,
    };
    match accounts::assign_role(&*admin, user_id, body.role).await {
        Ok(()) => {
            if let Some(cache) = state.roles.cache() {
                cache.invalidate(user_id);
            }
            StatusCode::NO_CONTENT.into_response()
        }
        Err(e) => account_error_response(&e),
    }
}

#[derive(Deserialize)]
pub struct PasswordRequest {
    pub password: String,
}

/// `POST /api/admin/users/{id}/password`: set a user's password.
pub async fn reset_password(
    State(state): State<AppState>,
    jar: CookieJar,
    Path(user_id): Path<Uuid>,
    body: Result<Json<PasswordRequest>, JsonRejection>,
) -> Response {
    let admin = match admin_api(&state) {
        Ok(admin) => admin,
        Err(resp) => return resp,
    };
    if let Err(resp) = require_admin(&state, &jar).await {
        return resp;
    }
    let body = match request_body(body) {
        Ok(body) => body,
        Err(resp) => return resp,
    };
    match accounts::reset_password(&*admin, user_id, &body.password).await {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(e) => account_error_response(&e),
    }
}

#[cfg(test)]
#[path = "admin_test.rs"]
mod tests;
