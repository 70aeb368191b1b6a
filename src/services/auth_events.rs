//! Auth change hub.
//!
//! ARCHITECTURE
//! ============
//! Login, logout and refresh handlers publish an [`AuthChange`] tagged with
//! the browser's client id. Per-connection session sources subscribe to the
//! changes for their own client id; the profile cache subscribes to all of
//! them. Delivery order is the broadcast order. A subscriber that falls
//! more than the channel capacity behind loses the overflow (logged).

use futures::StreamExt;
use futures::stream::BoxStream;
use serde::Serialize;
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use crate::backend::Session;

const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuthEvent {
    SignedIn,
    SignedOut,
    TokenRefreshed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthChange {
    pub event: AuthEvent,
    /// Browser the change belongs to.
    pub client_id: Uuid,
    pub user_id: Option<Uuid>,
    /// Session in force after the change; `None` once signed out.
    pub session: Option<Session>,
}

impl AuthChange {
    #[must_use]
    pub fn signed_in(client_id: Uuid, session: Session) -> Self {
        Self { event: AuthEvent::SignedIn, client_id, user_id: Some(session.user.id), session: Some(session) }
    }

    #[must_use]
    pub fn token_refreshed(client_id: Uuid, session: Session) -> Self {
        Self { event: AuthEvent::TokenRefreshed, client_id, user_id: Some(session.user.id), session: Some(session) }
    }

    #[must_use]
    pub fn signed_out(client_id: Uuid, user_id: Option<Uuid>) -> Self {
        Self { event: AuthEvent::SignedOut, client_id, user_id, session: None }
    }
}

#[derive(Clone)]
pub struct AuthEvents {
    tx: broadcast::Sender<AuthChange>,
}

impl Default for AuthEvents {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl AuthEvents {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publish a change; returns how many subscribers will see it.
    pub fn publish(&self, change: AuthChange) -> usize {
        tracing::debug!(event = ?change.event, client_id = %change.client_id, "auth change published");
        self.tx.send(change).unwrap_or(0)
    }

    /// Every change, in publication order.
    #[must_use]
    pub fn all_changes(&self) -> BoxStream<'static, AuthChange> {
        changes(self.tx.subscribe(), None)
    }

    /// Changes for one browser, in publication order. Dropping the stream
    /// unsubscribes.
    #[must_use]
    pub fn client_changes(&self, client_id: Uuid) -> BoxStream<'static, AuthChange> {
        changes(self.tx.subscribe(), Some(client_id))
    }
}

fn changes(rx: broadcast::Receiver<AuthChange>, client_id: Option<Uuid>) -> BoxStream<'static, AuthChange> {
    futures::stream::unfold(rx, move |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(change) if client_id.is_none_or(|id| id == change.client_id) => return Some((change, rx)),
                Ok(_) => {}
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "auth change subscriber lagged; changes dropped");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    })
    .boxed()
}

#[cfg(test)]
#[path = "auth_events_test.rs"]
mod tests;
