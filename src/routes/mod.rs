//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds the auth API, the admin API, the SSE navigation stream
//! and a fallback page handler under a single Axum router. Every page path
//! that is not an API route goes through the navigation gate.

pub mod admin;
pub mod auth;
pub mod pages;

use axum::Router;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post, put};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::error::ErrorCode;
use crate::state::AppState;

pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/refresh", post(auth::refresh))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/events", get(auth::events))
        .route("/api/gate", get(auth::gate))
        .route("/api/admin/metrics", get(admin::metrics))
        .route("/api/admin/users", post(admin::create_user))
        .route("/api/admin/users/{id}/profile", put(admin::upsert_profile))
        .route("/api/admin/users/{id}/password", post(admin::reset_password))
        .route("/healthz", get(healthz))
        .fallback(pages::page)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

/// JSON error body: `{error, code, retryable}`.
pub(crate) fn error_response<E: ErrorCode + ?Sized>(status: StatusCode, err: &E) -> Response {
    let body = serde_json::json!({
        "error": err.to_string(),
        "code": err.error_code(),
        "retryable": err.retryable(),
    });
    (status, Json(body)).into_response()
}

/// JSON error body for failures with no error value behind them.
pub(crate) fn error_body(status: StatusCode, code: &'static str, message: &str) -> Response {
    let body = serde_json::json!({ "error": message, "code": code, "retryable": false });
    (status, Json(body)).into_response()
}


#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
