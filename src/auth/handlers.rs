//! Authentication handlers
//!
//! Thin HTTP adapters over `AuthService`: decode the body, call the flow,
//! shape the JSON. All error mapping happens in `ApiError`.

use axum::{
    extract::{Extension, Json},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

use super::extractors::AuthedUser;
use super::models::{
    EmailRequest, GoogleLoginOutcome, GoogleLoginRequest, LoginRequest, MessageResponse,
    NicknameRequest, RegisterRequest, RegistrationOutcome, ResetPasswordRequest, TokenRequest,
};
use super::tokens::TokenPair;
use crate::accounts::UserProfile;
use crate::common::{ApiError, AppState};

/// POST /api/auth/check-user
///
/// `{ "exists": true, "user": { id, email, nickname, email_confirmed } }` or
/// `{ "exists": false }`
pub async fn check_user(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<EmailRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let body = match state.auth.check_user(payload).await? {
        Some(user) => json!({ "exists": true, "user": user }),
        None => json!({ "exists": false }),
    };
    Ok(Json(body))
}

/// POST /api/auth/check-nickname
pub async fn check_nickname(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<NicknameRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let exists = state.auth.check_nickname(payload).await?;
    Ok(Json(json!({ "exists": exists })))
}

/// POST /api/auth/register
///
/// # Request Body
/// ```json
/// {
///   "email": "a@b.com",
///   "nickname": "abc",
///   "password": "...",            // or "googleToken"
///   "termsAccepted": true,
///   "privacyAccepted": true,
///   "agreedPolicyVersions": { "terms": { "version": "1.0" }, "privacy": { "version": "1.0" } }
/// }
/// ```
///
/// 201 for a new account (tokens included on the Google path), 200 when an
/// unconfirmed account was sent a new confirmation link.
pub async fn register(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Response, ApiError> {
    info!("User registration initiated");

    let response = match state.auth.register(payload).await? {
        RegistrationOutcome::Created {
            user_id,
            email_confirmed,
            tokens: Some(tokens),
        } => (
            StatusCode::CREATED,
            Json(json!({
                "message": "User registered successfully.",
                "userId": user_id,
                "emailConfirmed": email_confirmed,
                "accessToken": tokens.access_token,
                "refreshToken": tokens.refresh_token,
            })),
        ),
        RegistrationOutcome::Created {
            user_id,
            email_confirmed,
            tokens: None,
        } => (
            StatusCode::CREATED,
            Json(json!({
                "message": "Registration successful. Please check your email to confirm your account.",
                "userId": user_id,
                "emailConfirmed": email_confirmed,
            })),
        ),
        RegistrationOutcome::Resent { user_id } => (
            StatusCode::OK,
            Json(json!({
                "message": "Registration successful. A new confirmation email has been sent.",
                "userId": user_id,
                "emailConfirmed": false,
            })),
        ),
    };

    Ok(response.into_response())
}

/// POST /api/auth/google-login
///
/// Known email: `{ userId, accessToken, refreshToken }`.
/// Unknown email: `{ email, name }` so the client can finish registration.
pub async fn google_login(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<GoogleLoginRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    info!("Google login initiated");

    let body = match state.auth.google_login(payload).await? {
        GoogleLoginOutcome::SignedIn { user_id, tokens } => json!({
            "userId": user_id,
            "accessToken": tokens.access_token,
            "refreshToken": tokens.refresh_token,
        }),
        GoogleLoginOutcome::NeedsRegistration(identity) => json!({
            "email": identity.email,
            "name": identity.name,
        }),
    };
    Ok(Json(body))
}

/// POST /api/auth/login
pub async fn login(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<LoginRequest>,
) -> Result<Json<TokenPair>, ApiError> {
    let tokens = state.auth.login(payload).await?;
    Ok(Json(tokens))
}

/// POST /api/auth/confirm-email
pub async fn confirm_email(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<TokenRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.auth.confirm_email(payload).await?;
    Ok(Json(MessageResponse::new("Email confirmed successfully.")))
}

/// POST /api/auth/request-password-reset
pub async fn request_password_reset(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<EmailRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let outcome = state.auth.request_password_reset(payload).await?;
    Ok(Json(MessageResponse::new(outcome.message())))
}

/// POST /api/auth/validate-reset-token
pub async fn validate_reset_token(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<TokenRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let message = state.auth.validate_reset_token(payload).await?;
    Ok(Json(MessageResponse::new(message)))
}

/// POST /api/auth/reset-password
pub async fn reset_password(
    Extension(state): Extension<Arc<AppState>>,
    Json(payload): Json<ResetPasswordRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.auth.reset_password(payload).await?;
    Ok(Json(MessageResponse::new(
        "Password reset successfully. You can now log in.",
    )))
}

/// GET /api/auth/me
pub async fn me(
    Extension(state): Extension<Arc<AppState>>,
    user: AuthedUser,
) -> Result<Json<UserProfile>, ApiError> {
    let profile = state.auth.me(user.id).await?;
    Ok(Json(profile))
}
