//! Policy handlers

use axum::extract::{Extension, Json, Path};
use chrono::Utc;
use std::sync::Arc;
use tracing::{debug, info, warn};

use super::models::{LatestPolicy, Policy, PolicyType};
use super::repository;
use crate::common::{ApiError, AppState};

/// GET /api/policies/latest
///
/// Latest effective terms and privacy policy, each with a `content_url`.
pub async fn latest_policies(
    Extension(state): Extension<Arc<AppState>>,
) -> Result<Json<Vec<LatestPolicy>>, ApiError> {
    info!("Fetching the latest policy versions");

    let policies = repository::latest(&state.db, Utc::now()).await?;
    let latest: Vec<LatestPolicy> = policies.into_iter().map(LatestPolicy::from).collect();

    debug!(count = latest.len(), "Latest policies retrieved");
    Ok(Json(latest))
}

/// GET /api/policies/:type/:version
pub async fn policy_by_type_and_version(
    Extension(state): Extension<Arc<AppState>>,
    Path((policy_type, version)): Path<(String, String)>,
) -> Result<Json<Policy>, ApiError> {
    info!(policy_type = %policy_type, version = %version, "Fetching policy");

    let not_found = || ApiError::NotFound("Policy not found".to_string());

    let policy_type = match policy_type.parse::<PolicyType>() {
        Ok(parsed) => parsed,
        Err(_) => {
            warn!(policy_type = %policy_type, "Unknown policy type requested");
            return Err(not_found());
        }
    };

    let policy = repository::get_by_type_and_version(&state.db, policy_type, &version)
        .await?
        .ok_or_else(|| {
            warn!(policy_type = %policy_type, version = %version, "Policy not found");
            not_found()
        })?;

    Ok(Json(policy))
}
