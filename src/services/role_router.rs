//! Role router: profile role resolution and section authorization.

use std::sync::Arc;

use serde::Serialize;
use uuid::Uuid;

use super::guard::UNAUTHORIZED_PATH;
use super::profile_cache::ProfileCache;
use super::role::{Role, Section};
use crate::backend::{BackendError, ProfileStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoleLookup {
    Found(Role),
    /// No usable profile row. Callers treat this exactly like "no session".
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "decision", content = "to", rename_all = "snake_case")]
pub enum Authorization {
    Allow,
    Deny(&'static str),
}

#[derive(Clone)]
pub struct RoleRouter {
    profiles: Arc<dyn ProfileStore>,
    cache: Option<Arc<ProfileCache>>,
}

impl RoleRouter {
    #[must_use]
    pub fn new(profiles: Arc<dyn ProfileStore>, cache: Option<Arc<ProfileCache>>) -> Self {
        Self { profiles, cache }
    }

    #[must_use]
    pub fn cache(&self) -> Option<&Arc<ProfileCache>> {
        self.cache.as_ref()
    }

    /// One profile lookup per call (cache hits excepted). A row whose role
    /// is not recognized is reported and treated as missing.
    ///
    /// # Errors
    ///
    /// Returns the upstream error when the lookup itself fails.
    pub async fn resolve_role(&self, user_id: Uuid) -> Result<RoleLookup, BackendError> {
        if let Some(role) = self.cache.as_ref().and_then(|c| c.get(user_id)) {
            return Ok(RoleLookup::Found(role));
        }

        let Some(row) = self.profiles.select_profile(user_id).await? else {
            tracing::warn!(%user_id, "no profile row for authenticated user");
            return Ok(RoleLookup::NotFound);
        };

        match row.role.parse::<Role>() {
            Ok(role) => {
                if let Some(cache) = &self.cache {
                    cache.insert(user_id, role);
                }
                Ok(RoleLookup::Found(role))
            }
            Err(e) => {
                tracing::error!(%user_id, error = %e, "profile carries unrecognized role");
                Ok(RoleLookup::NotFound)
            }
        }
    }

    /// Sections name their permitted roles; everyone else goes to the
    /// unauthorized page.
    #[must_use]
    pub fn authorize(role: Role, section: Section) -> Authorization {
        if section.permits(role) {
            Authorization::Allow
        } else {
            Authorization::Deny(UNAUTHORIZED_PATH)
        }
    }
}

#[cfg(test)]
#[path = "role_router_test.rs"]
mod tests;
