use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;

/// Full user row
#[derive(Debug, Clone, FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub nickname: String,
    pub password_hash: Option<String>,
    pub google_oauth: bool,
    pub email_confirmed: bool,
    pub email_confirmation_token: Option<String>,
    pub email_confirmation_token_expires: Option<DateTime<Utc>>,
    pub terms_version: Option<String>,
    pub privacy_version: Option<String>,
    pub accepted_policies: bool,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Where an account stands on the confirmation axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfirmationState {
    /// Password account waiting for its email link
    Unconfirmed,
    Confirmed,
    /// Google accounts are confirmed at creation and never carry a password
    GoogleOwned,
}

impl User {
    pub fn confirmation_state(&self) -> ConfirmationState {
        if self.google_oauth {
            ConfirmationState::GoogleOwned
        } else if self.email_confirmed {
            ConfirmationState::Confirmed
        } else {
            ConfirmationState::Unconfirmed
        }
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }
}

/// Projection returned by `GET /api/auth/me`
#[derive(Debug, Clone, Serialize, FromRow, PartialEq, Eq)]
pub struct UserProfile {
    pub id: i64,
    pub email: String,
    pub nickname: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Summary returned by `POST /api/auth/check-user`
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct UserSummary {
    pub id: i64,
    pub email: String,
    pub nickname: String,
    pub email_confirmed: bool,
}

impl From<&User> for UserSummary {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            nickname: user.nickname.clone(),
            email_confirmed: user.email_confirmed,
        }
    }
}

/// Everything needed to insert a user row
#[derive(Debug, Clone)]
pub struct NewUser<'a> {
    pub email: &'a str,
    pub nickname: &'a str,
    pub password_hash: Option<&'a str>,
    pub google_oauth: bool,
    pub terms_version: &'a str,
    pub privacy_version: &'a str,
    /// Confirmation token and expiry for password accounts
    pub confirmation: Option<(&'a str, DateTime<Utc>)>,
}

/// Audit row for an issued refresh token; read back only by tests
#[cfg(test)]
#[derive(Debug, Clone, FromRow)]
pub struct RefreshToken {
    pub id: i64,
    pub user_id: i64,
    pub token: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow)]
pub struct PasswordResetToken {
    pub id: i64,
    pub user_id: i64,
    pub reset_token: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    /// Set when a newer request or a completed reset retires the row
    pub consumed_at: Option<DateTime<Utc>>,
}
