//! Administrative client: user creation, password reset, profile upsert.
//!
//! Only ever built from [`AdminCredentials`], so holding an `AdminClient`
//! means the service key was present at startup.

use uuid::Uuid;

use super::config::{AdminCredentials, BackendConfig};
use super::rest::parse_user;
use super::types::{AdminApi, BackendError, User};
use super::{HttpBackend, is_success};
use crate::services::role::Role;

pub struct AdminClient {
    backend: HttpBackend,
    service_key: String,
}

impl AdminClient {
    /// # Errors
    ///
    /// Returns an error if the HTTP client fails to build.
    pub fn new(config: &BackendConfig, credentials: AdminCredentials) -> Result<Self, BackendError> {
        let backend = HttpBackend::new(&credentials.url, config.timeouts)?;
        Ok(Self { backend, service_key: credentials.service_role_key })
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        request
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
    }
}

#[async_trait::async_trait]
impl AdminApi for AdminClient {
    async fn create_user(&self, email: &str, password: &str) -> Result<User, BackendError> {
        let request = self.authorized(
            self.backend
                .http
                .post(self.backend.endpoint("/auth/v1/admin/users"))
                .json(&create_user_body(email, password)),
        );
        let (status, text) = self.backend.send(request).await?;
        if !is_success(status) {
            return Err(BackendError::Response { status, body: text });
        }
        parse_user(&text)
    }

    async fn update_password(&self, user_id: Uuid, password: &str) -> Result<(), BackendError> {
        let request = self.authorized(
            self.backend
                .http
                .put(self.backend.endpoint(&format!("/auth/v1/admin/users/{user_id}")))
                .json(&serde_json::json!({ "password": password })),
        );
        let (status, text) = self.backend.send(request).await?;
        if !is_success(status) {
            return Err(BackendError::Response { status, body: text });
        }
        Ok(())
    }

    async fn upsert_profile(&self, user_id: Uuid, role: Role) -> Result<(), BackendError> {
        let request = self.authorized(
            self.backend
                .http
                .post(self.backend.endpoint("/rest/v1/profiles?on_conflict=id"))
                .header("Prefer", "resolution=merge-duplicates,return=minimal")
                .json(&upsert_profile_body(user_id, role)),
        );
        let (status, text) = self.backend.send(request).await?;
        if !is_success(status) {
            return Err(BackendError::Response { status, body: text });
        }
        Ok(())
    }
}

pub(crate) fn create_user_body(email: &str, password: &str) -> serde_json::Value {
    serde_json::json!({ "email": email, "password": password, "email_confirm": true })
}

pub(crate) fn upsert_profile_body(user_id: Uuid, role: Role) -> serde_json::Value {
    serde_json::json!([{ "id": user_id, "role": role.as_str() }])
}

#[cfg(test)]
#[path = "admin_test.rs"]
mod tests;
