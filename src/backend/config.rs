//! Hosted backend configuration parsed from environment variables.

use crate::error::ErrorCode;

pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_METRICS_RPC_NAME: &str = "get_dashboard_metrics";

pub const URL_VAR: &str = "BACKEND_URL";
pub const ANON_KEY_VAR: &str = "BACKEND_ANON_KEY";
pub const SERVICE_ROLE_KEY_VAR: &str = "BACKEND_SERVICE_ROLE_KEY";

/// A required configuration value is absent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("missing configuration: env var {var} not set")]
    Missing { var: &'static str },
}

impl ErrorCode for ConfigError {
    fn error_code(&self) -> &'static str {
        "E_CONFIG"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackendTimeouts {
    pub request_secs: u64,
    pub connect_secs: u64,
}

/// Raw backend settings. Credentials stay optional here; callers ask for the
/// set they need through [`BackendConfig::public_credentials`] or
/// [`BackendConfig::admin_credentials`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendConfig {
    pub url: Option<String>,
    pub anon_key: Option<String>,
    pub service_role_key: Option<String>,
    pub metrics_rpc: String,
    pub timeouts: BackendTimeouts,
}

/// Project URL + anonymous key, used for browser-equivalent calls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicCredentials {
    pub url: String,
    pub anon_key: String,
}

/// Project URL + elevated service key, used for administrative calls only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminCredentials {
    pub url: String,
    pub service_role_key: String,
}

impl BackendConfig {
    /// Build config from process environment.
    ///
    /// - `BACKEND_URL`: project base URL (trailing `/` trimmed)
    /// - `BACKEND_ANON_KEY`: public anonymous key
    /// - `BACKEND_SERVICE_ROLE_KEY`: elevated key for admin operations
    /// - `METRICS_RPC_NAME`: dashboard RPC, default `get_dashboard_metrics`
    /// - `BACKEND_REQUEST_TIMEOUT_SECS`: default 30
    /// - `BACKEND_CONNECT_TIMEOUT_SECS`: default 10
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build config from an arbitrary key lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let non_empty = |key: &str| lookup(key).map(|v| v.trim().to_owned()).filter(|v| !v.is_empty());
        let parse_u64 = |key: &str, default: u64| {
            lookup(key)
                .and_then(|v| v.trim().parse::<u64>().ok())
                .unwrap_or(default)
        };

        Self {
            url: non_empty(URL_VAR).map(|u| u.trim_end_matches('/').to_owned()),
            anon_key: non_empty(ANON_KEY_VAR),
            service_role_key: non_empty(SERVICE_ROLE_KEY_VAR),
            metrics_rpc: non_empty("METRICS_RPC_NAME").unwrap_or_else(|| DEFAULT_METRICS_RPC_NAME.to_owned()),
            timeouts: BackendTimeouts {
                request_secs: parse_u64("BACKEND_REQUEST_TIMEOUT_SECS", DEFAULT_REQUEST_TIMEOUT_SECS),
                connect_secs: parse_u64("BACKEND_CONNECT_TIMEOUT_SECS", DEFAULT_CONNECT_TIMEOUT_SECS),
            },
        }
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] naming the first absent variable.
    pub fn public_credentials(&self) -> Result<PublicCredentials, ConfigError> {
        let url = self.url.clone().ok_or(ConfigError::Missing { var: URL_VAR })?;
        let anon_key = self
            .anon_key
            .clone()
            .ok_or(ConfigError::Missing { var: ANON_KEY_VAR })?;
        Ok(PublicCredentials { url, anon_key })
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::Missing`] naming the first absent variable.
    pub fn admin_credentials(&self) -> Result<AdminCredentials, ConfigError> {
        let url = self.url.clone().ok_or(ConfigError::Missing { var: URL_VAR })?;
        let service_role_key = self
            .service_role_key
            .clone()
            .ok_or(ConfigError::Missing { var: SERVICE_ROLE_KEY_VAR })?;
        Ok(AdminCredentials { url, service_role_key })
    }
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
