//! Account store
//!
//! Owns the `users`, `refresh_tokens` and `password_reset_tokens` tables.
//! Uniqueness of email and nickname is enforced by the schema; the lookups
//! here are only fast paths for friendlier errors.

pub mod models;
pub mod refresh_tokens;
pub mod repository;
pub mod reset_tokens;

#[cfg(test)]
mod tests;

pub use models::{ConfirmationState, NewUser, User, UserProfile, UserSummary};
