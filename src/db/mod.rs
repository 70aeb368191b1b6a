//! Direct Postgres access to the hosted database.
//!
//! SYSTEM CONTEXT
//! ==============
//! Optional. When `DATABASE_URL` is set, startup opens a SQLx pool and role
//! lookups read `profiles` over it instead of the REST table endpoint. The
//! schema is owned by the hosted service, so no migrations run here.

use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use crate::backend::{BackendError, ProfileRow, ProfileStore};

const DEFAULT_DB_MAX_CONNECTIONS: u32 = 5;

fn db_max_connections() -> u32 {
    std::env::var("DB_MAX_CONNECTIONS")
        .ok()
        .and_then(|v| v.parse::<u32>().ok())
        .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS)
}

/// Initialize the `PostgreSQL` connection pool.
///
/// # Errors
///
/// Returns an error if the connection fails.
pub async fn init_pool(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(db_max_connections())
        .connect(database_url)
        .await
}

/// `profiles` lookup over a direct connection.
pub struct PgProfileStore {
    pool: PgPool,
}

impl PgProfileStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait::async_trait]
impl ProfileStore for PgProfileStore {
    async fn select_profile(&self, user_id: Uuid) -> Result<Option<ProfileRow>, BackendError> {
        let row = sqlx::query("SELECT id, role::text AS role FROM profiles WHERE id = $1 LIMIT 1")
            .bind(user_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|r| ProfileRow { id: r.get("id"), role: r.get("role") }))
    }
}
