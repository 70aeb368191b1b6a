//! Navigation gate: the one decision pipeline behind every page.
//!
//! SYSTEM CONTEXT
//! ==============
//! Server-rendered page requests and long-lived client views (SSE) both build
//! an `AuthSnapshot` with [`snapshot_for`] and decide with [`evaluate`]. No
//! page is reachable through one path and blocked through the other because
//! there is no second implementation.

use serde::Serialize;

use super::auth_state::AuthSnapshot;
use super::guard::{GuardDecision, RouteGuard};
use super::role::{Section, SectionRoute, normalize_path};
use super::role_router::{Authorization, RoleLookup, RoleRouter};
use crate::backend::Session;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Navigation {
    /// Show the requested page. `section` is `None` for pages outside the
    /// role sections (public pages, account pages).
    Render { section: Option<Section> },
    Redirect { to: &'static str },
    Loading,
}

/// Settle role for `session`. A missing/unusable profile or a failed lookup
/// leaves `role` empty, which [`evaluate`] treats as signed out.
pub async fn snapshot_for(roles: &RoleRouter, session: Option<Session>) -> AuthSnapshot {
    let Some(session) = session else {
        return AuthSnapshot::signed_out();
    };
    let user_id = session.user.id;
    let role = match roles.resolve_role(user_id).await {
        Ok(RoleLookup::Found(role)) => Some(role),
        Ok(RoleLookup::NotFound) => None,
        Err(e) => {
            tracing::error!(%user_id, error = %e, "profile lookup failed");
            None
        }
    };
    AuthSnapshot::resolved(session, role)
}

#[must_use]
pub fn evaluate(guard: &RouteGuard, snapshot: &AuthSnapshot, path: &str) -> Navigation {
    match guard.decide(snapshot, path) {
        GuardDecision::ShowLoading => return Navigation::Loading,
        GuardDecision::RedirectTo(to) => return Navigation::Redirect { to },
        GuardDecision::Allow => {}
    }

    if guard.is_public(path) {
        return Navigation::Render { section: None };
    }

    // Past the guard with no session only happens on public paths, so from
    // here a session exists. Without a role it counts as signed out.
    let Some(role) = snapshot.role else {
        return Navigation::Redirect { to: guard.login_path() };
    };

    let path = normalize_path(path);
    if path == "/" {
        return Navigation::Redirect { to: role.landing_route() };
    }

    let Some(route) = SectionRoute::from_path(path) else {
        return Navigation::Render { section: None };
    };

    match RoleRouter::authorize(role, route.section) {
        Authorization::Deny(to) => Navigation::Redirect { to },
        Authorization::Allow if route.bare => Navigation::Redirect { to: role.landing_route() },
        Authorization::Allow => Navigation::Render { section: Some(route.section) },
    }
}

#[cfg(test)]
#[path = "gate_test.rs"]
mod tests;
