//! Route guard: the first gate every navigation passes.
//!
//! Only answers "is there a settled session for a non-public path". Role
//! checks happen afterwards in the role router.

use serde::Serialize;

use super::auth_state::AuthSnapshot;
use super::role::normalize_path;

pub const LOGIN_PATH: &str = "/login";
pub const UNAUTHORIZED_PATH: &str = "/unauthorized";

/// Paths reachable without a session. Sub-paths of an entry are public too.
pub const PUBLIC_PATHS: &[&str] = &[LOGIN_PATH, UNAUTHORIZED_PATH, "/forgot-password", "/healthz"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "to", rename_all = "snake_case")]
pub enum GuardDecision {
    Allow,
    RedirectTo(&'static str),
    ShowLoading,
}

#[derive(Debug, Clone, Copy)]
pub struct RouteGuard {
    public_paths: &'static [&'static str],
    login_path: &'static str,
}

impl Default for RouteGuard {
    fn default() -> Self {
        Self { public_paths: PUBLIC_PATHS, login_path: LOGIN_PATH }
    }
}

impl RouteGuard {
    #[cfg(test)]
    #[must_use]
    pub fn new(public_paths: &'static [&'static str], login_path: &'static str) -> Self {
        Self { public_paths, login_path }
    }

    #[must_use]
    pub fn login_path(&self) -> &'static str {
        self.login_path
    }

    #[must_use]
    pub fn is_public(&self, path: &str) -> bool {
        let path = normalize_path(path);
        self.public_paths.iter().any(|public| {
            path.strip_prefix(public)
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
        })
    }

    /// Loading wins over everything, so nothing guarded renders before the
    /// session is settled.
    #[must_use]
    pub fn decide(&self, snapshot: &AuthSnapshot, path: &str) -> GuardDecision {
        if snapshot.loading {
            return GuardDecision::ShowLoading;
        }
        if snapshot.session.is_none() && !self.is_public(path) {
            return GuardDecision::RedirectTo(self.login_path);
        }
        GuardDecision::Allow
    }
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;
