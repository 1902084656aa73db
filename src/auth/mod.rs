//! # Auth Module
//!
//! Credential lifecycle for the service:
//! - Registration with a password or a Google ID token
//! - Password and Google sign-in issuing access/refresh token pairs
//! - Email confirmation and password reset with single-use tokens
//! - `AuthedUser` extractor for protected routes

pub mod extractors;
pub mod handlers;
pub mod models;
pub mod one_time_token;
pub mod password;
pub mod routes;
pub mod service;
pub mod tokens;
pub mod validators;


pub use routes::auth_routes;
pub use service::AuthService;
