//! Policy routes

use axum::{routing::get, Router};

use super::handlers;

/// # Routes
/// - `GET /api/policies/latest` - Latest effective version of each policy
/// - `GET /api/policies/:type/:version` - One exact policy version
pub fn policy_routes() -> Router {
    Router::new()
        .route("/api/policies/latest", get(handlers::latest_policies))
        .route(
            "/api/policies/:type/:version",
            get(handlers::policy_by_type_and_version),
        )
}
