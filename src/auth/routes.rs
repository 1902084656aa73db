//! Authentication routes

use axum::{
    routing::{get, post},
    Router,
};

use super::handlers;

/// Creates and returns the authentication router
///
/// # Routes
/// - `POST /api/auth/check-user` - Does an account exist for this email
/// - `POST /api/auth/check-nickname` - Is this nickname taken
/// - `POST /api/auth/register` - Password or Google registration
/// - `POST /api/auth/google-login` - Sign in with a Google ID token
/// - `POST /api/auth/login` - Password sign-in
/// - `POST /api/auth/confirm-email` - Consume a confirmation token
/// - `POST /api/auth/request-password-reset` - Email a reset link
/// - `POST /api/auth/validate-reset-token` - Check a reset token without using it
/// - `POST /api/auth/reset-password` - Consume a reset token
/// - `GET /api/auth/me` - Current user profile (bearer token)
pub fn auth_routes() -> Router {
    Router::new()
        .route("/api/auth/check-user", post(handlers::check_user))
        .route("/api/auth/check-nickname", post(handlers::check_nickname))
        .route("/api/auth/register", post(handlers::register))
        .route("/api/auth/google-login", post(handlers::google_login))
        .route("/api/auth/login", post(handlers::login))
        .route("/api/auth/confirm-email", post(handlers::confirm_email))
        .route(
            "/api/auth/request-password-reset",
            post(handlers::request_password_reset),
        )
        .route(
            "/api/auth/validate-reset-token",
            post(handlers::validate_reset_token),
        )
        .route("/api/auth/reset-password", post(handlers::reset_password))
        .route("/api/auth/me", get(handlers::me))
}
