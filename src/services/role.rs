//! Roles and the application sections they unlock.
//!
//! DESIGN
//! ======
//! Roles arrive from the `profiles` table as strings. They are parsed into a
//! closed enum at the boundary; unknown strings are an error, never a
//! fallback role. Each top-level section declares its permitted role set and
//! every role declares its landing route.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoleError {
    #[error("unrecognized role: {0:?}")]
    Unrecognized(String),
}

impl crate::error::ErrorCode for RoleError {
    fn error_code(&self) -> &'static str {
        "E_UNRECOGNIZED_ROLE"
    }
}

// =============================================================================
// ROLE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Role {
    Admin,
    Client,
    Worker,
    Checker,
    Refueler,
    #[serde(alias = "floor_manager")]
    FloorManager,
}

impl Role {
    #[cfg(test)]
    pub const ALL: [Role; 6] = [Self::Admin, Self::Client, Self::Worker, Self::Checker, Self::Refueler, Self::FloorManager];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Client => "client",
            Self::Worker => "worker",
            Self::Checker => "checker",
            Self::Refueler => "refueler",
            Self::FloorManager => "floor-manager",
        }
    }

    /// The section this role lives in.
    #[cfg(test)]
    #[must_use]
    pub fn home_section(self) -> Section {
        match self {
            Self::Admin => Section::Admin,
            Self::Client => Section::Client,
            Self::Worker => Section::Worker,
            Self::Checker => Section::Checker,
            Self::Refueler => Section::Refueler,
            Self::FloorManager => Section::FloorManager,
        }
    }

    /// Default route after login or when a bare section is requested.
    #[must_use]
    pub fn landing_route(self) -> &'static str {
        match self {
            Self::Admin => "/admin/trucks",
            Self::Client => "/client/stores",
            Self::Worker => "/worker/trucks",
            Self::Checker => "/checker/trucks",
            Self::Refueler => "/refueler/trucks",
            Self::FloorManager => "/floor-manager/trucks",
        }
    }
}

impl FromStr for Role {
    type Err = RoleError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        match raw.trim() {
            "admin" => Ok(Self::Admin),
            "client" => Ok(Self::Client),
            "worker" => Ok(Self::Worker),
            "checker" => Ok(Self::Checker),
            "refueler" => Ok(Self::Refueler),
            "floor-manager" | "floor_manager" => Ok(Self::FloorManager),
            other => Err(RoleError::Unrecognized(other.to_owned())),
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// SECTION
// =============================================================================

/// Top-level guarded area of the application, keyed by its first path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Section {
    Admin,
    Client,
    Worker,
    Checker,
    Refueler,
    FloorManager,
}

impl Section {
    pub const ALL: [Section; 6] =
        [Self::Admin, Self::Client, Self::Worker, Self::Checker, Self::Refueler, Self::FloorManager];

    #[must_use]
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Admin => "/admin",
            Self::Client => "/client",
            Self::Worker => "/worker",
            Self::Checker => "/checker",
            Self::Refueler => "/refueler",
            Self::FloorManager => "/floor-manager",
        }
    }

    #[must_use]
    pub fn permitted_roles(self) -> &'static [Role] {
        match self {
            Self::Admin => &[Role::Admin],
            Self::Client => &[Role::Client],
            Self::Worker => &[Role::Worker],
            Self::Checker => &[Role::Checker],
            Self::Refueler => &[Role::Refueler],
            Self::FloorManager => &[Role::FloorManager],
        }
    }

    #[must_use]
    pub fn permits(self, role: Role) -> bool {
        self.permitted_roles().contains(&role)
    }
}

/// A path resolved against the section table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SectionRoute {
    pub section: Section,
    /// `true` for the section root itself (`/admin`, `/admin/`).
    pub bare: bool,
}

impl SectionRoute {
    /// Match `path` against section prefixes on a segment boundary, so
    /// `/administration` is not the admin section.
    #[must_use]
    pub fn from_path(path: &str) -> Option<Self> {
        let path = normalize_path(path);
        Section::ALL.into_iter().find_map(|section| {
            let rest = path.strip_prefix(section.prefix())?;
            if rest.is_empty() {
                Some(Self { section, bare: true })
            } else if rest.starts_with('/') {
                Some(Self { section, bare: false })
            } else {
                None
            }
        })
    }
}

/// Drop query/fragment and trailing slashes; empty becomes `/`.
#[must_use]
pub fn normalize_path(path: &str) -> &str {
    let path = path.split(['?', '#']).next().unwrap_or_default();
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() { "/" } else { trimmed }
}

#[cfg(test)]
#[path = "role_test.rs"]
mod tests;
