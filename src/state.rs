use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AppConfig;
use crate::sessions::SessionStore;

/// Shared per-worker state. The session store sits behind an `Arc` so every
/// worker sees the same tokens.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub sessions: Arc<SessionStore>,
    pub config: AppConfig,
}
