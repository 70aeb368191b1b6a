//! Session source capability and its cookie-backed implementation.
//!
//! ARCHITECTURE
//! ============
//! A `SessionSource` answers "who is signed in right now" and streams
//! replacements of that answer. `RequestSessionSource` binds one browser's
//! cookie tokens to the auth service: the current session is whatever the
//! access token validates to, and changes come from the auth event hub
//! filtered to the browser's client id.

use std::sync::{Arc, Mutex};

use futures::StreamExt;
use futures::stream::BoxStream;
use uuid::Uuid;

use super::auth_events::AuthEvents;
use crate::backend::{AuthApi, BackendError, Session, User};

#[async_trait::async_trait]
pub trait SessionSource: Send + Sync {
    async fn get_session(&self) -> Result<Option<Session>, BackendError>;

    async fn get_user(&self) -> Result<Option<User>, BackendError> {
        Ok(self.get_session().await?.map(|s| s.user))
    }

    /// Stream of session replacements in emission order. Dropping the stream
    /// cancels the subscription.
    fn on_auth_state_change(&self) -> BoxStream<'static, Option<Session>>;
}

/// Access/refresh tokens carried by one browser.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionTokens {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl SessionTokens {
    fn replace_with(&mut self, session: Option<&Session>) {
        match session {
            Some(s) => {
                self.access_token = Some(s.access_token.clone());
                self.refresh_token.clone_from(&s.refresh_token);
            }
            None => *self = Self::default(),
        }
    }
}

pub struct RequestSessionSource {
    auth: Arc<dyn AuthApi>,
    events: AuthEvents,
    client_id: Uuid,
    tokens: Arc<Mutex<SessionTokens>>,
}

impl RequestSessionSource {
    #[must_use]
    pub fn new(auth: Arc<dyn AuthApi>, events: AuthEvents, client_id: Uuid, tokens: SessionTokens) -> Self {
        Self { auth, events, client_id, tokens: Arc::new(Mutex::new(tokens)) }
    }

    #[must_use]
    pub fn tokens(&self) -> SessionTokens {
        lock_tokens(&self.tokens).clone()
    }
}

fn lock_tokens(tokens: &Mutex<SessionTokens>) -> std::sync::MutexGuard<'_, SessionTokens> {
    tokens
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

#[async_trait::async_trait]
impl SessionSource for RequestSessionSource {
    async fn get_session(&self) -> Result<Option<Session>, BackendError> {
        let SessionTokens { access_token, refresh_token } = self.tokens();
        let Some(access_token) = access_token else {
            return Ok(None);
        };
        let Some(user) = self.auth.user_for_token(&access_token).await? else {
            return Ok(None);
        };
        Ok(Some(Session { access_token, refresh_token, expires_at: None, user }))
    }

    fn on_auth_state_change(&self) -> BoxStream<'static, Option<Session>> {
        let tokens = self.tokens.clone();
        self.events
            .client_changes(self.client_id)
            .map(move |change| {
                lock_tokens(&tokens).replace_with(change.session.as_ref());
                change.session
            })
            .boxed()
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
