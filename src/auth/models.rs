//! Request bodies and flow outcomes for the auth endpoints
//!
//! Every request field is optional so that missing input is reported as a
//! validation error with a readable message rather than a JSON rejection.

use serde::{Deserialize, Serialize};

use super::tokens::TokenPair;
use crate::services::google::GoogleIdentity;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PolicyVersion {
    pub version: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AgreedPolicyVersions {
    pub terms: Option<PolicyVersion>,
    pub privacy: Option<PolicyVersion>,
}

impl AgreedPolicyVersions {
    pub fn terms_version(&self) -> Option<&str> {
        self.terms.as_ref().and_then(|p| p.version.as_deref())
    }

    pub fn privacy_version(&self) -> Option<&str> {
        self.privacy.as_ref().and_then(|p| p.version.as_deref())
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub email: Option<String>,
    pub password: Option<String>,
    pub nickname: Option<String>,
    pub google_token: Option<String>,
    #[serde(default)]
    pub terms_accepted: bool,
    #[serde(default)]
    pub privacy_accepted: bool,
    #[serde(default)]
    pub agreed_policy_versions: AgreedPolicyVersions,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GoogleLoginRequest {
    pub google_token: Option<String>,
}

/// Body carrying a confirmation or reset token
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenRequest {
    pub token: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResetPasswordRequest {
    pub token: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EmailRequest {
    pub email: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct NicknameRequest {
    pub nickname: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// New row. Tokens only on the Google path.
    Created {
        user_id: i64,
        email_confirmed: bool,
        tokens: Option<TokenPair>,
    },
    /// Existing unconfirmed row refreshed and a new link sent
    Resent { user_id: i64 },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoogleLoginOutcome {
    SignedIn { user_id: i64, tokens: TokenPair },
    /// No account yet; the client continues with registration
    NeedsRegistration(GoogleIdentity),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResetRequestOutcome {
    ResetLinkSent,
    /// Unknown or Google-owned email
    NoAction,
    ConfirmationResent,
}

impl ResetRequestOutcome {
    pub fn message(&self) -> &'static str {
        match self {
            ResetRequestOutcome::ResetLinkSent | ResetRequestOutcome::NoAction => {
                "If the email exists, a password reset link has been sent."
            }
            ResetRequestOutcome::ConfirmationResent => {
                "Your account is not confirmed. A new confirmation email has been sent."
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}
