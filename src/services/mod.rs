//! Domain services used by the HTTP routes.
//!
//! ARCHITECTURE
//! ============
//! Service modules own the authorization pipeline and account logic so route
//! handlers can stay focused on cookies, status codes and response shapes.

pub mod accounts;
pub mod auth_events;
pub mod auth_state;
pub mod gate;
pub mod guard;
pub mod profile_cache;
pub mod role;
pub mod role_router;
pub mod session;
