//! Authentication extractors for Axum

use async_trait::async_trait;
use axum::{
    extract::{Extension, FromRequestParts},
    http::{header::AUTHORIZATION, request::Parts},
};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::common::{safe_email_log, ApiError, AppState};

/// Principal decoded from a bearer access token
///
/// Verification is signature and expiry only; the store is not consulted, so
/// a user deleted after issuance still gets through here and is caught by
/// the handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthedUser {
    pub id: i64,
    pub email: String,
    pub nickname: String,
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthedUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Extension(app_state): Extension<Arc<AppState>> =
            Extension::from_request_parts(parts, state)
                .await
                .map_err(|_| ApiError::InternalServer("missing app state".to_string()))?;

        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty());

        let token = match token {
            Some(t) => t,
            None => {
                warn!("Authentication failed: missing bearer token");
                return Err(ApiError::Unauthorized("Access token is required".to_string()));
            }
        };

        let claims = app_state.tokens.verify_access(token).map_err(|e| {
            warn!(error = %e, "Access token validation failed");
            ApiError::Forbidden("Invalid or expired token".to_string())
        })?;

        debug!(
            user_id = claims.id,
            email = %safe_email_log(&claims.email),
            "Access token accepted"
        );

        Ok(AuthedUser {
            id: claims.id,
            email: claims.email,
            nickname: claims.nickname,
        })
    }
}
