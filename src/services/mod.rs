// src/services/mod.rs
//
// Collaborators the auth flows talk to: outgoing mail and the Google
// identity provider

pub mod email;
pub mod google;

pub use email::{EmailService, LogTransport, MailTransport, SesTransport};
pub use google::GoogleVerifier;
