//! # Policies Module
//!
//! Versioned legal documents (terms, privacy) and the record of which
//! exact version each user agreed to at registration.

pub mod handlers;
pub mod models;
pub mod repository;
pub mod routes;


pub use routes::policy_routes;
