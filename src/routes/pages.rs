//! Page requests: every non-API `GET` path is decided by the navigation gate.

use axum::extract::State;
use axum::http::{Method, StatusCode, Uri};
use axum::response::{IntoResponse, Json, Redirect, Response};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};

use super::auth::resolve_viewer;
use super::error_body;
use crate::backend::User;
use crate::services::gate::{self, Navigation};
use crate::services::role::{Role, Section};
use crate::state::AppState;

/// What a rendered page is given to work with.
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageContext {
    pub path: String,
    pub section: Option<Section>,
    pub role: Option<Role>,
    pub user: Option<User>,
}

/// Router fallback. Redirects answer `303 See Other`.
pub async fn page(State(state): State<AppState>, method: Method, uri: Uri, jar: CookieJar) -> Response {
    let path = uri.path();
    if !matches!(method, Method::GET | Method::HEAD) || path.starts_with("/api/") {
        return error_body(StatusCode::NOT_FOUND, "E_NOT_FOUND", "no such route");
    }

    let viewer = resolve_viewer(&state, &jar).await;
    match gate::evaluate(&state.guard, &viewer.snapshot, path) {
        Navigation::Redirect { to } => {
            tracing::debug!(path, to, "page redirect");
            Redirect::to(to).into_response()
        }
        Navigation::Render { section } => Json(PageContext {
            path: path.to_owned(),
            section,
            role: viewer.snapshot.role,
            user: viewer.snapshot.user,
        })
        .into_response(),
        Navigation::Loading => error_body(StatusCode::SERVICE_UNAVAILABLE, "E_LOADING", "auth state not settled"),
    }
}

#[cfg(test)]
#[path = "pages_test.rs"]
mod tests;
