mod backend;
mod db;
mod error;
mod routes;
mod services;
mod state;

use std::sync::Arc;

use backend::{AdminApi, AdminClient, BackendClient, BackendConfig, ConfigError, ProfileStore};
use services::auth_events::AuthEvents;
use services::profile_cache::{self, ProfileCache, ProfileCacheConfig};
use services::role_router::RoleRouter;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt::init();

    let port: u16 = std::env::var("PORT")
        .unwrap_or_else(|_| "3000".into())
        .parse()
        .expect("invalid PORT");

    let config = BackendConfig::from_env();
    let public = config
        .public_credentials()
        .expect("backend URL and anon key required");
    let client = Arc::new(BackendClient::new(&config, public).expect("backend client init failed"));

    // Direct database profile lookups are optional; the REST table endpoint
    // is used otherwise.
    let profiles: Arc<dyn ProfileStore> = match std::env::var("DATABASE_URL") {
        Ok(database_url) => {
            let pool = db::init_pool(&database_url)
                .await
                .expect("database init failed");
            tracing::info!("profile lookups over direct database connection");
            Arc::new(db::PgProfileStore::new(pool))
        }
        Err(_) => client.clone(),
    };

    // Admin client (non-fatal: admin operations answer a configuration error).
    let admin: Result<Arc<dyn AdminApi>, ConfigError> = match config.admin_credentials() {
        Ok(credentials) => {
            let admin = AdminClient::new(&config, credentials).expect("admin client init failed");
            Ok(Arc::new(admin))
        }
        Err(e) => {
            tracing::warn!(error = %e, "admin client not configured; admin operations disabled");
            Err(e)
        }
    };

    let events = AuthEvents::default();
    let cache = ProfileCache::new(ProfileCacheConfig::from_env());
    let _invalidation = cache.clone().map(|cache| {
        tracing::info!("profile cache enabled");
        profile_cache::spawn_invalidation_task(cache, &events)
    });

    let roles = RoleRouter::new(profiles, cache);
    let state = state::AppState::new(client.clone(), roles, client, admin, events);

    let app = routes::app(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{port}"))
        .await
        .expect("failed to bind");

    tracing::info!(%port, "fleetgate listening");
    axum::serve(listener, app).await.expect("server failed");
}
