//! Auth state holder: one reactive view of "who is signed in, as what".
//!
//! DESIGN
//! ======
//! A holder is mounted per long-lived view (an SSE connection). It
//! subscribes to its session source first, then runs one initial fetch, then
//! applies change notifications strictly in receipt order. Every published
//! value has the canonical shape `{session, user, role, loading}`; `loading`
//! is true only before the initial fetch settles. A notification resolves
//! the new session's role first and then replaces session and role in one
//! publication, so the previous snapshot stays visible meanwhile and a
//! dependent view never sees a session without its role settled.
//!
//! Teardown flips `mounted` under the same lock that guards publication and
//! aborts the notification task, so nothing is published afterwards. The
//! initial fetch runs in its own task and is not cancelled; it checks
//! `mounted` before publishing and is otherwise discarded.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures::StreamExt;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;

use super::gate;
use super::role::Role;
use super::role_router::RoleRouter;
use super::session::SessionSource;
use crate::backend::{Session, User};

// =============================================================================
// SNAPSHOT
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthSnapshot {
    pub session: Option<Session>,
    pub user: Option<User>,
    pub role: Option<Role>,
    pub loading: bool,
}

impl AuthSnapshot {
    #[must_use]
    pub fn loading() -> Self {
        Self { loading: true, ..Self::default() }
    }

    #[must_use]
    pub fn signed_out() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn resolved(session: Session, role: Option<Role>) -> Self {
        Self { user: Some(session.user.clone()), session: Some(session), role, loading: false }
    }
}

// =============================================================================
// HOLDER
// =============================================================================

struct Shared {
    mounted: Mutex<bool>,
    tx: watch::Sender<AuthSnapshot>,
}

impl Shared {
    /// Returns `true` when dependents were notified.
    fn publish(&self, snapshot: AuthSnapshot) -> bool {
        let mounted = lock(&self.mounted);
        if !*mounted {
            return false;
        }
        self.tx.send_if_modified(|current| {
            if *current == snapshot {
                return false;
            }
            *current = snapshot;
            true
        })
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct AuthStateHolder {
    shared: Arc<Shared>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl AuthStateHolder {
    /// Subscribe to `source` and start the initial session fetch. Must be
    /// called inside a Tokio runtime.
    #[must_use]
    pub fn mount(source: Arc<dyn SessionSource>, roles: RoleRouter) -> Self {
        let (tx, _) = watch::channel(AuthSnapshot::loading());
        let shared = Arc::new(Shared { mounted: Mutex::new(true), tx });
        let mut changes = source.on_auth_state_change();
        let (fetched_tx, fetched_rx) = oneshot::channel::<Option<Session>>();

        tokio::spawn({
            let shared = shared.clone();
            let roles = roles.clone();
            async move {
                let session = match source.get_session().await {
                    Ok(session) => session,
                    Err(e) => {
                        tracing::warn!(error = %e, "initial session fetch failed; treating as signed out");
                        None
                    }
                };
                let snapshot = gate::snapshot_for(&roles, session.clone()).await;
                if !shared.publish(snapshot) {
                    tracing::debug!("initial session fetch produced no change");
                }
                let _ = fetched_tx.send(session);
            }
        });

        let task = tokio::spawn({
            let shared = shared.clone();
            async move {
                // Changes received during the initial fetch queue up in the
                // stream and are applied after it, so the newest one wins.
                let mut last = fetched_rx.await.unwrap_or_default();
                while let Some(session) = changes.next().await {
                    if session == last {
                        continue;
                    }
                    last.clone_from(&session);
                    apply(&shared, &roles, session).await;
                }
            }
        });

        Self { shared, task: Mutex::new(Some(task)) }
    }

    #[cfg(test)]
    #[must_use]
    pub fn snapshot(&self) -> AuthSnapshot {
        self.shared.tx.borrow().clone()
    }

    #[must_use]
    pub fn current_session(&self) -> Option<Session> {
        self.shared.tx.borrow().session.clone()
    }

    #[must_use]
    pub fn current_user(&self) -> Option<User> {
        self.shared.tx.borrow().user.clone()
    }

    #[must_use]
    pub fn current_role(&self) -> Option<Role> {
        self.shared.tx.borrow().role
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.shared.tx.borrow().loading
    }

    #[cfg(test)]
    #[must_use]
    pub fn is_mounted(&self) -> bool {
        *lock(&self.shared.mounted)
    }

    /// Receiver notified on every published change.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<AuthSnapshot> {
        self.shared.tx.subscribe()
    }

    /// Cancel the subscription. Returns `false` if already torn down.
    pub fn teardown(&self) -> bool {
        let Some(task) = lock(&self.task).take() else {
            return false;
        };
        *lock(&self.shared.mounted) = false;
        task.abort();
        true
    }
}

impl Drop for AuthStateHolder {
    fn drop(&mut self) {
        self.teardown();
    }
}

async fn apply(shared: &Shared, roles: &RoleRouter, session: Option<Session>) {
    let snapshot = gate::snapshot_for(roles, session).await;
    shared.publish(snapshot);
}

#[cfg(test)]
#[path = "auth_state_test.rs"]
mod tests;
