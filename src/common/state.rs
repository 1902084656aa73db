// Application state shared across all modules

use sqlx::SqlitePool;
use std::sync::Arc;

use super::config::AppConfig;
use crate::auth::service::AuthService;
use crate::auth::tokens::TokenIssuer;

/// Built once in `main` and handed to handlers through `Extension<Arc<AppState>>`
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub config: Arc<AppConfig>,
    pub tokens: Arc<TokenIssuer>,
    pub auth: Arc<AuthService>,
}
