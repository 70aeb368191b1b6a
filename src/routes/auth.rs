//! Auth routes: password sign-in, session cookies, navigation decisions and
//! the SSE navigation stream.
//!
//! DESIGN
//! ======
//! The browser holds three cookies: the access token, the refresh token and
//! a long-lived client id. The client id ties auth changes made through one
//! request (login, refresh, logout) to the SSE streams open in that browser.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::{FromRef, Query, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Json, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use futures::Stream;
use serde::{Deserialize, Serialize};
use time::Duration;
use uuid::Uuid;

use super::{error_body, error_response};
use crate::backend::{BackendError, Session, User};
use crate::services::auth_events::AuthChange;
use crate::services::auth_state::{AuthSnapshot, AuthStateHolder};
use crate::services::gate::{self, Navigation};
use crate::services::role::Role;
use crate::services::session::{RequestSessionSource, SessionSource, SessionTokens};
use crate::state::AppState;

pub(crate) const ACCESS_COOKIE: &str = "fg_access_token";
pub(crate) const REFRESH_COOKIE: &str = "fg_refresh_token";
pub(crate) const CLIENT_COOKIE: &str = "fg_client";

pub(crate) fn env_bool(key: &str) -> Option<bool> {
    std::env::var(key)
        .ok()
        .and_then(|raw| match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => Some(true),
            "0" | "false" | "no" | "off" => Some(false),
            _ => None,
        })
}

pub(crate) fn cookie_secure() -> bool {
    if let Some(value) = env_bool("COOKIE_SECURE") {
        return value;
    }

    std::env::var("APP_URL")
        .map(|url| url.starts_with("https://"))
        .unwrap_or(false)
}

// =============================================================================
// COOKIES
// =============================================================================

fn build_cookie(name: &'static str, value: String, secure: bool) -> Cookie<'static> {
    Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .build()
}

fn clear_cookie(name: &'static str, secure: bool) -> Cookie<'static> {
    let mut cookie = build_cookie(name, String::new(), secure);
    cookie.set_max_age(Duration::ZERO);
    cookie
}

fn with_session_cookies(jar: CookieJar, session: &Session) -> CookieJar {
    let secure = cookie_secure();
    let jar = jar.add(build_cookie(ACCESS_COOKIE, session.access_token.clone(), secure));
    match &session.refresh_token {
        Some(refresh) => jar.add(build_cookie(REFRESH_COOKIE, refresh.clone(), secure)),
        None => jar.add(clear_cookie(REFRESH_COOKIE, secure)),
    }
}

fn without_session_cookies(jar: CookieJar) -> CookieJar {
    let secure = cookie_secure();
    jar.add(clear_cookie(ACCESS_COOKIE, secure))
        .add(clear_cookie(REFRESH_COOKIE, secure))
}

pub(crate) fn tokens_from(jar: &CookieJar) -> SessionTokens {
    let value = |name| {
        jar.get(name)
            .map(Cookie::value)
            .filter(|v| !v.is_empty())
            .map(str::to_owned)
    };
    SessionTokens { access_token: value(ACCESS_COOKIE), refresh_token: value(REFRESH_COOKIE) }
}

pub(crate) fn client_id_from(jar: &CookieJar) -> Option<Uuid> {
    jar.get(CLIENT_COOKIE)
        .and_then(|c| Uuid::parse_str(c.value()).ok())
}

/// Existing client id, or a fresh one added to the jar.
fn ensure_client_id(jar: CookieJar) -> (CookieJar, Uuid) {
    if let Some(id) = client_id_from(&jar) {
        return (jar, id);
    }
    let id = Uuid::new_v4();
    let mut cookie = build_cookie(CLIENT_COOKIE, id.to_string(), cookie_secure());
    cookie.set_max_age(Duration::days(365));
    (jar.add(cookie), id)
}

// =============================================================================
// VIEWER EXTRACTOR
// =============================================================================

/// The caller's settled auth snapshot. Never `loading`: the request path
/// waits for the session and role before a handler runs.
pub struct Viewer {
    pub snapshot: AuthSnapshot,
}

/// Resolve the caller's session and role from request cookies. Uses the same
/// session source and role pipeline as a mounted holder.
pub(crate) async fn resolve_viewer(state: &AppState, jar: &CookieJar) -> Viewer {
    let source = RequestSessionSource::new(
        state.auth.clone(),
        state.events.clone(),
        client_id_from(jar).unwrap_or_default(),
        tokens_from(jar),
    );
    let session = match source.get_session().await {
        Ok(session) => session,
        Err(e) => {
            tracing::warn!(error = %e, "session validation failed; treating as signed out");
            None
        }
    };
    Viewer { snapshot: gate::snapshot_for(&state.roles, session).await }
}

impl<S> axum::extract::FromRequestParts<S> for Viewer
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let app_state = AppState::from_ref(state);
        Ok(resolve_viewer(&app_state, &jar).await)
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

#[derive(Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct LoginResponse {
    pub user: User,
    pub role: Option<Role>,
    pub redirect: String,
}

/// `POST /api/auth/login`: password sign-in. A session whose user has no
/// usable profile is signed straight back out and sent to the login page.
pub async fn login(State(state): State<AppState>, jar: CookieJar, Json(body): Json<LoginRequest>) -> Response {
    let email = body.email.trim().to_ascii_lowercase();
    let session = match state.auth.sign_in_with_password(&email, &body.password).await {
        Ok(session) => session,
        Err(BackendError::InvalidCredentials) => {
            return error_response(StatusCode::UNAUTHORIZED, &BackendError::InvalidCredentials);
        }
        Err(e) => {
            tracing::error!(error = %e, "password sign-in failed");
            return error_response(StatusCode::BAD_GATEWAY, &e);
        }
    };

    let snapshot = gate::snapshot_for(&state.roles, Some(session.clone())).await;
    let Some(role) = snapshot.role else {
        tracing::warn!(user_id = %session.user.id, "sign-in without usable profile; signing out");
        if let Err(e) = state.auth.sign_out(&session.access_token).await {
            tracing::warn!(error = %e, "sign-out after missing profile failed");
        }
        let body = LoginResponse { user: session.user, role: None, redirect: state.guard.login_path().to_owned() };
        return (StatusCode::FORBIDDEN, Json(body)).into_response();
    };

    let (jar, client_id) = ensure_client_id(jar);
    let jar = with_session_cookies(jar, &session);
    let body = LoginResponse { user: session.user.clone(), role: Some(role), redirect: role.landing_route().to_owned() };
    tracing::info!(user_id = %session.user.id, %role, "signed in");
    state.events.publish(AuthChange::signed_in(client_id, session));
    (jar, Json(body)).into_response()
}

/// `POST /api/auth/logout`: best-effort remote sign-out, clear cookies. The
/// user is looked up before the token is revoked so the sign-out event names
/// them.
pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> Response {
    let mut user_id = None;
    if let Some(access_token) = tokens_from(&jar).access_token {
        match state.auth.user_for_token(&access_token).await {
            Ok(user) => user_id = user.map(|user| user.id),
            Err(e) => tracing::warn!(error = %e, "user lookup before sign-out failed"),
        }
        if let Err(e) = state.auth.sign_out(&access_token).await {
            tracing::warn!(error = %e, "remote sign-out failed; clearing cookies anyway");
        }
    }
    let client_id = client_id_from(&jar);
    if client_id.is_some() || user_id.is_some() {
        state.events.publish(AuthChange::signed_out(client_id.unwrap_or_default(), user_id));
    }
    (without_session_cookies(jar), StatusCode::NO_CONTENT).into_response()
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RefreshResponse {
    pub user: User,
    pub expires_at: Option<i64>,
}

/// `POST /api/auth/refresh`: exchange the refresh token for a new session.
pub async fn refresh(State(state): State<AppState>, jar: CookieJar) -> Response {
    let Some(refresh_token) = tokens_from(&jar).refresh_token else {
        return error_body(StatusCode::UNAUTHORIZED, "E_NO_SESSION", "no refresh token");
    };
    let session = match state.auth.refresh_session(&refresh_token).await {
        Ok(session) => session,
        Err(BackendError::InvalidCredentials) => {
            let jar = without_session_cookies(jar);
            let err = error_response(StatusCode::UNAUTHORIZED, &BackendError::InvalidCredentials);
            return (jar, err).into_response();
        }
        Err(e) => {
            tracing::error!(error = %e, "session refresh failed");
            return error_response(StatusCode::BAD_GATEWAY, &e);
        }
    };

    let (jar, client_id) = ensure_client_id(jar);
    let jar = with_session_cookies(jar, &session);
    let body = RefreshResponse { user: session.user.clone(), expires_at: session.expires_at };
    state.events.publish(AuthChange::token_refreshed(client_id, session));
    (jar, Json(body)).into_response()
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MeResponse {
    pub user: User,
    pub role: Option<Role>,
}

/// `GET /api/auth/me`: current user and role.
pub async fn me(viewer: Viewer) -> Response {
    let AuthSnapshot { user: Some(user), role, .. } = viewer.snapshot else {
        return error_body(StatusCode::UNAUTHORIZED, "E_NO_SESSION", "not signed in");
    };
    Json(MeResponse { user, role }).into_response()
}

#[derive(Deserialize)]
pub struct PathQuery {
    #[serde(default = "root_path")]
    pub path: String,
}

fn root_path() -> String {
    "/".to_owned()
}

/// `GET /api/gate?path=`: navigation decision for a client-side router.
pub async fn gate(State(state): State<AppState>, viewer: Viewer, Query(query): Query<PathQuery>) -> Json<Navigation> {
    Json(gate::evaluate(&state.guard, &viewer.snapshot, &query.path))
}

/// `GET /api/auth/events?path=`: mounts an auth state holder for this
/// connection and streams a `navigation` event on every holder update.
/// Disconnecting drops the stream, which tears the holder down.
pub async fn events(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<PathQuery>,
) -> (CookieJar, Sse<impl Stream<Item = Result<Event, axum::Error>>>) {
    let (jar, client_id) = ensure_client_id(jar);
    let source: Arc<dyn SessionSource> = Arc::new(RequestSessionSource::new(
        state.auth.clone(),
        state.events.clone(),
        client_id,
        tokens_from(&jar),
    ));
    let holder = AuthStateHolder::mount(source, state.roles.clone());
    tracing::debug!(%client_id, path = %query.path, "navigation stream opened");
    let stream = navigation_stream(holder, state.guard, query.path);
    (jar, Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn navigation_stream(
    holder: AuthStateHolder,
    guard: crate::services::guard::RouteGuard,
    path: String,
) -> impl Stream<Item = Result<Event, axum::Error>> {
    let rx = holder.watch();
    futures::stream::unfold((holder, rx, true), move |(holder, mut rx, first)| {
        let path = path.clone();
        async move {
            if !first && rx.changed().await.is_err() {
                return None;
            }
            let snapshot = rx.borrow_and_update().clone();
            let navigation = gate::evaluate(&guard, &snapshot, &path);
            tracing::debug!(
                user_id = ?holder.current_user().map(|user| user.id),
                role = ?holder.current_role(),
                signed_in = holder.current_session().is_some(),
                loading = holder.is_loading(),
                ?navigation,
                "navigation update"
            );
            let event = Event::default().event("navigation").json_data(navigation);
            Some((event, (holder, rx, false)))
        }
    })
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
