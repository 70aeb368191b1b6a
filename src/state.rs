//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the remote capabilities behind trait objects, the role router, the
//! route guard and the auth event hub. The admin capability is a `Result`:
//! when the service key is missing the configuration error is kept and
//! returned by admin handlers before they touch anything remote.

use std::sync::Arc;

use crate::backend::{AdminApi, AuthApi, ConfigError, MetricsRpc};
use crate::services::auth_events::AuthEvents;
use crate::services::guard::RouteGuard;
use crate::services::role_router::RoleRouter;

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped or Copy.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<dyn AuthApi>,
    pub roles: RoleRouter,
    pub metrics: Arc<dyn MetricsRpc>,
    pub admin: Result<Arc<dyn AdminApi>, ConfigError>,
    pub events: AuthEvents,
    pub guard: RouteGuard,
}

impl AppState {
    #[must_use]
    pub fn new(
        auth: Arc<dyn AuthApi>,
        roles: RoleRouter,
        metrics: Arc<dyn MetricsRpc>,
        admin: Result<Arc<dyn AdminApi>, ConfigError>,
        events: AuthEvents,
    ) -> Self {
        Self { auth, roles, metrics, admin, events, guard: RouteGuard::default() }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================

#[cfg(test)]
pub mod test_helpers {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    use uuid::Uuid;

    use crate::backend::{BackendError, ProfileRow, ProfileStore, Session, User};
    use crate::backend::config::SERVICE_ROLE_KEY_VAR;
    use crate::services::role::Role;

    #[must_use]
    pub fn session_for(user_id: Uuid) -> Session {
        Session {
            access_token: format!("access-{user_id}"),
            refresh_token: Some(format!("refresh-{user_id}")),
            expires_at: None,
            user: User { id: user_id, email: Some(format!("{user_id}@fleet.test")) },
        }
    }

    struct Account {
        password: String,
        user: User,
    }

    /// In-memory stand-in for the hosted service. Implements every backend
    /// capability and counts remote calls.
    #[derive(Default)]
    pub struct FakeBackend {
        accounts: Mutex<HashMap<String, Account>>,
        access: Mutex<HashMap<String, User>>,
        refresh: Mutex<HashMap<String, User>>,
        profiles: Mutex<HashMap<Uuid, String>>,
        issued: AtomicUsize,
        calls: AtomicUsize,
        profile_lookups: AtomicUsize,
        signed_out: AtomicUsize,
        fail_profile_lookups: AtomicBool,
        fail_profile_upserts: AtomicBool,
    }

    impl FakeBackend {
        #[must_use]
        pub fn new() -> Arc<Self> {
            Arc::new(Self::default())
        }

        /// Create an account (optionally with a profile) and issue a session.
        pub fn register(&self, email: &str, password: &str, role: Option<&str>) -> Session {
            let user = User { id: Uuid::new_v4(), email: Some(email.to_owned()) };
            self.accounts
                .lock()
                .unwrap()
                .insert(email.to_owned(), Account { password: password.to_owned(), user: user.clone() });
            if let Some(role) = role {
                self.set_profile(user.id, role);
            }
            self.issue(&user)
        }

        pub fn set_profile(&self, user_id: Uuid, role: &str) {
            self.profiles.lock().unwrap().insert(user_id, role.to_owned());
        }

        #[must_use]
        pub fn profile_of(&self, user_id: Uuid) -> Option<String> {
            self.profiles.lock().unwrap().get(&user_id).cloned()
        }

        #[must_use]
        pub fn has_account(&self, email: &str) -> bool {
            self.accounts.lock().unwrap().contains_key(email)
        }

        pub fn fail_profile_lookups(&self, fail: bool) {
            self.fail_profile_lookups.store(fail, Ordering::SeqCst);
        }

        pub fn fail_profile_upserts(&self, fail: bool) {
            self.fail_profile_upserts.store(fail, Ordering::SeqCst);
        }

        /// Every remote call of any kind.
        #[must_use]
        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        #[must_use]
        pub fn profile_lookups(&self) -> usize {
            self.profile_lookups.load(Ordering::SeqCst)
        }

        #[must_use]
        pub fn sign_outs(&self) -> usize {
            self.signed_out.load(Ordering::SeqCst)
        }

        fn issue(&self, user: &User) -> Session {
            let n = self.issued.fetch_add(1, Ordering::SeqCst);
            let session = Session {
                access_token: format!("access-{n}-{}", user.id),
                refresh_token: Some(format!("refresh-{n}-{}", user.id)),
                expires_at: Some(1_900_000_000),
                user: user.clone(),
            };
            self.access
                .lock()
                .unwrap()
                .insert(session.access_token.clone(), user.clone());
            if let Some(refresh) = &session.refresh_token {
                self.refresh.lock().unwrap().insert(refresh.clone(), user.clone());
            }
            session
        }

        fn call(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[async_trait::async_trait]
    impl AuthApi for FakeBackend {
        async fn user_for_token(&self, access_token: &str) -> Result<Option<User>, BackendError> {
            self.call();
            Ok(self.access.lock().unwrap().get(access_token).cloned())
        }

        async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<Session, BackendError> {
            self.call();
            let user = {
                let accounts = self.accounts.lock().unwrap();
                match accounts.get(email) {
                    Some(account) if account.password == password => account.user.clone(),
                    _ => return Err(BackendError::InvalidCredentials),
                }
            };
            Ok(self.issue(&user))
        }

        async fn refresh_session(&self, refresh_token: &str) -> Result<Session, BackendError> {
            self.call();
            let user = self.refresh.lock().unwrap().remove(refresh_token);
            let user = user.ok_or(BackendError::InvalidCredentials)?;
            Ok(self.issue(&user))
        }

        async fn sign_out(&self, access_token: &str) -> Result<(), BackendError> {
            self.call();
            self.access.lock().unwrap().remove(access_token);
            self.signed_out.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[async_trait::async_trait]
    impl ProfileStore for FakeBackend {
        async fn select_profile(&self, user_id: Uuid) -> Result<Option<ProfileRow>, BackendError> {
            self.call();
            self.profile_lookups.fetch_add(1, Ordering::SeqCst);
            if self.fail_profile_lookups.load(Ordering::SeqCst) {
                return Err(BackendError::Request("connection reset".into()));
            }
            Ok(self
                .profile_of(user_id)
                .map(|role| ProfileRow { id: user_id, role }))
        }
    }

    #[async_trait::async_trait]
    impl MetricsRpc for FakeBackend {
        async fn dashboard_metrics(&self, access_token: &str) -> Result<serde_json::Value, BackendError> {
            self.call();
            if !self.access.lock().unwrap().contains_key(access_token) {
                return Err(BackendError::Response { status: 401, body: "JWT expired".into() });
            }
            Ok(serde_json::json!({
                "total_workers": 14,
                "total_trucks": 6,
                "total_fuel_cost": 2310.75,
                "roles": {"admin": 1, "worker": 9, "client": 4}
            }))
        }
    }

    #[async_trait::async_trait]
    impl AdminApi for FakeBackend {
        async fn create_user(&self, email: &str, password: &str) -> Result<User, BackendError> {
            self.call();
            let mut accounts = self.accounts.lock().unwrap();
            if accounts.contains_key(email) {
                return Err(BackendError::Response {
                    status: 422,
                    body: "A user with this email address has already been registered".into(),
                });
            }
            let user = User { id: Uuid::new_v4(), email: Some(email.to_owned()) };
            accounts.insert(email.to_owned(), Account { password: password.to_owned(), user: user.clone() });
            Ok(user)
        }

        async fn update_password(&self, user_id: Uuid, password: &str) -> Result<(), BackendError> {
            self.call();
            let mut accounts = self.accounts.lock().unwrap();
            let account = accounts
                .values_mut()
                .find(|a| a.user.id == user_id)
                .ok_or(BackendError::Response { status: 404, body: "User not found".into() })?;
            password.clone_into(&mut account.password);
            Ok(())
        }

        async fn upsert_profile(&self, user_id: Uuid, role: Role) -> Result<(), BackendError> {
            self.call();
            if self.fail_profile_upserts.load(Ordering::SeqCst) {
                return Err(BackendError::Response { status: 500, body: "insert failed".into() });
            }
            self.set_profile(user_id, role.as_str());
            Ok(())
        }
    }

    /// `AppState` wired entirely to `fake`. With `admin_enabled = false` the
    /// admin capability is the missing-service-key configuration error.
    #[must_use]
    pub fn test_app_state(fake: &Arc<FakeBackend>, admin_enabled: bool) -> AppState {
        let admin: Result<Arc<dyn AdminApi>, ConfigError> = if admin_enabled {
            Ok(fake.clone())
        } else {
            Err(ConfigError::Missing { var: SERVICE_ROLE_KEY_VAR })
        };
        AppState::new(fake.clone(), RoleRouter::new(fake.clone(), None), fake.clone(), admin, AuthEvents::default())
    }
}
