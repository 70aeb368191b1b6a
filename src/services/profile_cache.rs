//! Bounded role cache keyed by user id.
//!
//! DESIGN
//! ======
//! Disabled by default (capacity 0): every guarded render then performs its
//! own profile lookup. When enabled, entries expire after a TTL, the oldest
//! insertion is evicted at capacity, and any auth change for a user drops
//! that user's entry. Only found roles are cached; a missing profile is
//! always re-checked.

use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use futures::StreamExt;
use tokio::task::JoinHandle;
use uuid::Uuid;

use super::auth_events::AuthEvents;
use super::role::Role;

const DEFAULT_CAPACITY: usize = 0;
const DEFAULT_TTL_SECS: u64 = 60;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileCacheConfig {
    pub capacity: usize,
    pub ttl: Duration,
}

impl ProfileCacheConfig {
    /// `PROFILE_CACHE_CAPACITY` (default 0 = off), `PROFILE_CACHE_TTL_SECS` (default 60).
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            capacity: env_parse("PROFILE_CACHE_CAPACITY", DEFAULT_CAPACITY),
            ttl: Duration::from_secs(env_parse("PROFILE_CACHE_TTL_SECS", DEFAULT_TTL_SECS)),
        }
    }
}

fn env_parse<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr + Copy,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse::<T>().ok())
        .unwrap_or(default)
}

struct CacheInner {
    entries: HashMap<Uuid, (Role, Instant)>,
    /// Insertion order for FIFO eviction.
    order: VecDeque<Uuid>,
}

pub struct ProfileCache {
    inner: Mutex<CacheInner>,
    capacity: usize,
    ttl: Duration,
}

impl ProfileCache {
    /// `None` when the configured capacity is zero.
    #[must_use]
    pub fn new(config: ProfileCacheConfig) -> Option<Arc<Self>> {
        if config.capacity == 0 {
            return None;
        }
        Some(Arc::new(Self {
            inner: Mutex::new(CacheInner { entries: HashMap::new(), order: VecDeque::new() }),
            capacity: config.capacity,
            ttl: config.ttl,
        }))
    }

    #[must_use]
    pub fn get(&self, user_id: Uuid) -> Option<Role> {
        self.get_at(user_id, Instant::now())
    }

    pub fn insert(&self, user_id: Uuid, role: Role) {
        self.insert_at(user_id, role, Instant::now());
    }

    pub fn invalidate(&self, user_id: Uuid) {
        let mut inner = self.lock();
        inner.entries.remove(&user_id);
        inner.order.retain(|id| *id != user_id);
    }

    #[cfg(test)]
    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    #[cfg(test)]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, CacheInner> {
        self.inner
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn get_at(&self, user_id: Uuid, now: Instant) -> Option<Role> {
        let mut inner = self.lock();
        let (role, inserted) = *inner.entries.get(&user_id)?;
        if now.duration_since(inserted) >= self.ttl {
            inner.entries.remove(&user_id);
            inner.order.retain(|id| *id != user_id);
            return None;
        }
        Some(role)
    }

    fn insert_at(&self, user_id: Uuid, role: Role, now: Instant) {
        let mut inner = self.lock();
        if inner.entries.insert(user_id, (role, now)).is_some() {
            inner.order.retain(|id| *id != user_id);
        }
        inner.order.push_back(user_id);
        while inner.entries.len() > self.capacity {
            let Some(oldest) = inner.order.pop_front() else {
                break;
            };
            inner.entries.remove(&oldest);
        }
    }
}

/// Drop cached roles whenever the event hub reports an auth change for the
/// user. Runs until the hub is closed.
pub fn spawn_invalidation_task(cache: Arc<ProfileCache>, events: &AuthEvents) -> JoinHandle<()> {
    let mut changes = events.all_changes();
    tokio::spawn(async move {
        while let Some(change) = changes.next().await {
            if let Some(user_id) = change.user_id {
                cache.invalidate(user_id);
                tracing::debug!(%user_id, event = ?change.event, "profile cache entry invalidated");
            }
        }
    })
}

#[cfg(test)]
#[path = "profile_cache_test.rs"]
mod tests;
