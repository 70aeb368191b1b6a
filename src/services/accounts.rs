//! Administrative account operations.
//!
//! ERROR HANDLING
//! ==============
//! Account creation is two remote steps (auth user, then profile row) with no
//! shared transaction. A failure in the second step is reported with the new
//! user's id so the caller can retry the profile upsert, which is idempotent.
//! Nothing is rolled back.

use uuid::Uuid;

use super::role::Role;
use crate::backend::{AdminApi, BackendError, User};
use crate::error::ErrorCode;

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("invalid email")]
    InvalidEmail,
    #[error("password must be at least {min} characters")]
    WeakPassword { min: usize },
    #[error("account request failed: {0}")]
    Upstream(#[from] BackendError),
    #[error("user {user_id} created but profile write failed: {source}")]
    ProfileStep { user_id: Uuid, source: BackendError },
}

impl ErrorCode for AccountError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidEmail => "E_INVALID_EMAIL",
            Self::WeakPassword { .. } => "E_WEAK_PASSWORD",
            Self::Upstream(_) => "E_UPSTREAM",
            Self::ProfileStep { .. } => "E_PROFILE_STEP",
        }
    }

    fn retryable(&self) -> bool {
        match self {
            Self::Upstream(e) => e.retryable(),
            Self::ProfileStep { .. } => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct CreatedAccount {
    pub user: User,
    pub role: Role,
}

#[must_use]
pub fn normalize_email(email: &str) -> Option<String> {
    let normalized = email.trim().to_ascii_lowercase();
    let (local, domain) = normalized.split_once('@')?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return None;
    }
    Some(normalized)
}

fn check_password(password: &str) -> Result<(), AccountError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AccountError::WeakPassword { min: MIN_PASSWORD_LEN });
    }
    Ok(())
}

/// Create an auth user and its profile row.
///
/// # Errors
///
/// Validation errors before any remote call; `Upstream` if the user could
/// not be created; `ProfileStep` if the user exists but the profile does not.
pub async fn create_account(
    admin: &dyn AdminApi,
    email: &str,
    password: &str,
    role: Role,
) -> Result<CreatedAccount, AccountError> {
    let email = normalize_email(email).ok_or(AccountError::InvalidEmail)?;
    check_password(password)?;

    let user = admin.create_user(&email, password).await?;
    tracing::info!(user_id = %user.id, %role, "auth user created");

    if let Err(source) = admin.upsert_profile(user.id, role).await {
        tracing::error!(user_id = %user.id, error = %source, "profile write failed after user creation");
        return Err(AccountError::ProfileStep { user_id: user.id, source });
    }

    Ok(CreatedAccount { user, role })
}

/// Idempotent profile write; also the retry path for a failed `ProfileStep`.
///
/// # Errors
///
/// Returns `Upstream` if the write fails.
pub async fn assign_role(admin: &dyn AdminApi, user_id: Uuid, role: Role) -> Result<(), AccountError> {
    admin.upsert_profile(user_id, role).await?;
    tracing::info!(%user_id, %role, "profile role assigned");
    Ok(())
}

/// # Errors
///
/// `WeakPassword` before any remote call; `Upstream` if the update fails.
pub async fn reset_password(admin: &dyn AdminApi, user_id: Uuid, password: &str) -> Result<(), AccountError> {
    check_password(password)?;
    admin.update_password(user_id, password).await?;
    tracing::info!(%user_id, "password reset");
    Ok(())
}

#[cfg(test)]
#[path = "accounts_test.rs"]
mod tests;
