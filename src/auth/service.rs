// src/auth/service.rs
//! Account lifecycle: registration, sign-in, email confirmation and
//! password reset.
//!
//! The service owns no state of its own. Every operation reads and writes
//! through the account and policy stores, and registration is the only flow
//! that needs a transaction spanning several rows.

use chrono::{DateTime, Utc};
use sqlx::{Sqlite, SqlitePool, Transaction};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::models::{
    EmailRequest, GoogleLoginOutcome, GoogleLoginRequest, LoginRequest, NicknameRequest,
    RegisterRequest, RegistrationOutcome, ResetPasswordRequest, ResetRequestOutcome,
    TokenRequest,
};
use super::one_time_token;
use super::password::{PasswordComplexity, PasswordHasher};
use super::tokens::{TokenIssuer, TokenPair};
use super::validators::RegistrationValidator;
use crate::accounts::{
    refresh_tokens, repository as users, reset_tokens, ConfirmationState, NewUser, User,
    UserProfile, UserSummary,
};
use crate::common::error::conflict_on_unique;
use crate::common::helpers::{safe_email_log, safe_token_log};
use crate::common::validation::{non_blank, valid_email, Validator};
use crate::common::ApiError;
use crate::policies::models::PolicyType;
use crate::policies::repository as policies;
use crate::services::email::EmailService;
use crate::services::google::IdentityVerifier;

const POLICY_MISMATCH: &str = "You must agree to the latest Terms and Privacy Policy.";
const USER_EXISTS: &str = "User already exists.";
const NICKNAME_EXISTS: &str = "Nickname already exists.";
const INVALID_LOGIN: &str = "Invalid email or password";
const INVALID_CREDENTIALS: &str = "Invalid credentials";
const ACCOUNT_DELETED: &str =
    "This account has been deleted. Please contact support or create a new account.";
const INVALID_CONFIRMATION: &str = "Invalid or expired token.";
const INVALID_RESET_TOKEN: &str = "Invalid token.";
const EXPIRED_RESET_TOKEN: &str = "Token has expired.";

/// Policy rows a registration must agree to
struct AgreedPolicies {
    terms_version: String,
    privacy_version: String,
    policy_ids: [i64; 2],
}

/// How a new account proves its email
enum Credential {
    Password(String),
    Google,
}

pub struct AuthService {
    db: SqlitePool,
    tokens: Arc<TokenIssuer>,
    hasher: PasswordHasher,
    complexity: PasswordComplexity,
    emails: Arc<EmailService>,
    identity: Arc<dyn IdentityVerifier>,
}

impl AuthService {
    pub fn new(
        db: SqlitePool,
        tokens: Arc<TokenIssuer>,
        hasher: PasswordHasher,
        complexity: PasswordComplexity,
        emails: Arc<EmailService>,
        identity: Arc<dyn IdentityVerifier>,
    ) -> Self {
        Self {
            db,
            tokens,
            hasher,
            complexity,
            emails,
            identity,
        }
    }

    /// Register with a password or a Google ID token.
    ///
    /// Checks run in a fixed order: email and nickname shape, nickname
    /// availability, policy agreement, password or Google token, then the
    /// existing-account branch. A second registration for an unconfirmed
    /// password account takes the resend transition instead of inserting.
    pub async fn register(&self, req: RegisterRequest) -> Result<RegistrationOutcome, ApiError> {
        RegistrationValidator.validate(&req).into_result()?;

        let email = req.email.as_deref().unwrap_or_default();
        let nickname = non_blank(req.nickname.as_deref()).unwrap_or_default();
        debug!(email = %safe_email_log(email), nickname = %nickname, "Registration requested");

        // The same email may keep its nickname when it registers again
        if let Some(owner) = users::find_by_nickname(&self.db, nickname).await? {
            if owner.email != email {
                warn!(nickname = %nickname, "Registration failed: nickname already exists");
                return Err(ApiError::Conflict(NICKNAME_EXISTS.to_string()));
            }
        }

        let agreed = self.check_policy_agreement(&req).await?;

        let google_token = non_blank(req.google_token.as_deref());
        let credential = match google_token {
            None => {
                let password = req
                    .password
                    .as_deref()
                    .filter(|p| !p.is_empty())
                    .ok_or_else(|| ApiError::Validation("Password is required.".to_string()))?;
                if !self.complexity.is_acceptable(password) {
                    return Err(ApiError::Validation(
                        self.complexity.requirement().to_string(),
                    ));
                }
                Credential::Password(self.hasher.hash(password).await?)
            }
            Some(token) => {
                let identity = self.identity.verify(token).await?;
                if identity.email != email {
                    warn!(
                        email = %safe_email_log(email),
                        "Registration failed: Google token email mismatch"
                    );
                    return Err(ApiError::Authentication(
                        "Google token email does not match provided email".to_string(),
                    ));
                }
                Credential::Google
            }
        };

        if let Some(existing) = users::find_by_email(&self.db, email).await? {
            return match existing.confirmation_state() {
                ConfirmationState::Unconfirmed => {
                    let hash = match &credential {
                        Credential::Password(hash) => Some(hash.as_str()),
                        Credential::Google => None,
                    };
                    self.resend_confirmation(&existing, nickname, hash).await
                }
                ConfirmationState::Confirmed | ConfirmationState::GoogleOwned => {
                    warn!(email = %safe_email_log(email), "Registration failed: user already exists");
                    Err(ApiError::Conflict(USER_EXISTS.to_string()))
                }
            };
        }

        let mut tx = self.db.begin().await?;
        let result = self
            .insert_account(&mut tx, email, nickname, &credential, &agreed)
            .await;
        let outcome = finish(tx, result).await?;

        if let RegistrationOutcome::Created { user_id, .. } = &outcome {
            info!(user_id = *user_id, google = google_token.is_some(), "Registration successful");
        }
        Ok(outcome)
    }

    /// Latest policy versions must match what the caller agreed to, and both
    /// acceptance flags must be set.
    async fn check_policy_agreement(
        &self,
        req: &RegisterRequest,
    ) -> Result<AgreedPolicies, ApiError> {
        let latest = policies::latest(&self.db, Utc::now()).await?;
        let find = |kind: PolicyType| latest.iter().find(|p| p.policy_type == kind);

        let (terms, privacy) = match (find(PolicyType::Terms), find(PolicyType::Privacy)) {
            (Some(terms), Some(privacy)) => (terms, privacy),
            _ => {
                error!("Registration failed: no effective terms or privacy policy");
                return Err(ApiError::InternalServer(
                    "Unable to fetch policy versions.".to_string(),
                ));
            }
        };

        let versions = &req.agreed_policy_versions;
        let agrees = versions.terms_version() == Some(terms.version.as_str())
            && versions.privacy_version() == Some(privacy.version.as_str())
            && req.terms_accepted
            && req.privacy_accepted;
        if !agrees {
            warn!(
                latest_terms = %terms.version,
                latest_privacy = %privacy.version,
                "Registration failed: policy agreement mismatch"
            );
            return Err(ApiError::Conflict(POLICY_MISMATCH.to_string()));
        }

        Ok(AgreedPolicies {
            terms_version: terms.version.clone(),
            privacy_version: privacy.version.clone(),
            policy_ids: [terms.id, privacy.id],
        })
    }

    /// Unconfirmed --resend--> Unconfirmed: new nickname, new link, and the
    /// new password hash when one was given.
    async fn resend_confirmation(
        &self,
        user: &User,
        nickname: &str,
        password_hash: Option<&str>,
    ) -> Result<RegistrationOutcome, ApiError> {
        let now = Utc::now();
        let confirmation = one_time_token::generate_at(now);

        let mut tx = self.db.begin().await?;
        let result: Result<RegistrationOutcome, ApiError> = async {
            let updated = users::refresh_unconfirmed(
                &mut *tx,
                user.id,
                nickname,
                password_hash,
                &confirmation.token,
                confirmation.expires_at,
                now,
            )
            .await
            .map_err(account_conflict)?;
            if updated == 0 {
                // Confirmed between the lookup and the update
                return Err(ApiError::Conflict(USER_EXISTS.to_string()));
            }

            self.emails
                .send_confirmation_email(&user.email, &confirmation.token)
                .await?;
            Ok(RegistrationOutcome::Resent { user_id: user.id })
        }
        .await;
        let outcome = finish(tx, result).await?;

        info!(user_id = user.id, "Confirmation email re-sent for unconfirmed account");
        Ok(outcome)
    }

    async fn insert_account(
        &self,
        tx: &mut Transaction<'_, Sqlite>,
        email: &str,
        nickname: &str,
        credential: &Credential,
        agreed: &AgreedPolicies,
    ) -> Result<RegistrationOutcome, ApiError> {
        let now = Utc::now();

        match credential {
            Credential::Google => {
                let new_user = NewUser {
                    email,
                    nickname,
                    password_hash: None,
                    google_oauth: true,
                    terms_version: &agreed.terms_version,
                    privacy_version: &agreed.privacy_version,
                    confirmation: None,
                };
                let user_id = users::create(&mut **tx, &new_user, now)
                    .await
                    .map_err(account_conflict)?;
                policies::record_agreements(&mut **tx, user_id, &agreed.policy_ids, now).await?;

                let tokens = self.tokens.issue_pair(user_id, email, nickname)?;
                refresh_tokens::save(&mut **tx, user_id, &tokens.refresh_token, now).await?;

                Ok(RegistrationOutcome::Created {
                    user_id,
                    email_confirmed: true,
                    tokens: Some(tokens),
                })
            }
            Credential::Password(hash) => {
                let confirmation = one_time_token::generate_at(now);
                let new_user = NewUser {
                    email,
                    nickname,
                    password_hash: Some(hash),
                    google_oauth: false,
                    terms_version: &agreed.terms_version,
                    privacy_version: &agreed.privacy_version,
                    confirmation: Some((&confirmation.token, confirmation.expires_at)),
                };
                let user_id = users::create(&mut **tx, &new_user, now)
                    .await
                    .map_err(account_conflict)?;
                policies::record_agreements(&mut **tx, user_id, &agreed.policy_ids, now).await?;

                self.emails
                    .send_confirmation_email(email, &confirmation.token)
                    .await?;

                Ok(RegistrationOutcome::Created {
                    user_id,
                    email_confirmed: false,
                    tokens: None,
                })
            }
        }
    }

    /// Password sign-in for confirmed accounts.
    pub async fn login(&self, req: LoginRequest) -> Result<TokenPair, ApiError> {
        let email = req.email.as_deref().unwrap_or_default();
        let password = req.password.as_deref().unwrap_or_default();
        debug!(email = %safe_email_log(email), "Login attempt");

        let user = match users::find_by_email(&self.db, email).await? {
            Some(user) if user.email_confirmed => user,
            _ => {
                warn!(
                    email = %safe_email_log(email),
                    "Login failed: unknown email or unconfirmed account"
                );
                return Err(ApiError::Authentication(INVALID_LOGIN.to_string()));
            }
        };

        if user.is_deleted() {
            warn!(user_id = user.id, "Login refused for deleted account");
            return Err(ApiError::Forbidden(ACCOUNT_DELETED.to_string()));
        }

        let matches = match user.password_hash.as_deref() {
            Some(digest) => self.hasher.verify(password, digest).await?,
            None => false,
        };
        if !matches {
            warn!(email = %safe_email_log(email), "Login failed: invalid password");
            return Err(ApiError::Authentication(INVALID_CREDENTIALS.to_string()));
        }

        let tokens = self.issue_session(&user).await?;
        info!(user_id = user.id, "Login successful");
        Ok(tokens)
    }

    /// Sign in with a Google ID token. An unknown email is not an error: the
    /// caller gets the identity back and continues with registration.
    pub async fn google_login(
        &self,
        req: GoogleLoginRequest,
    ) -> Result<GoogleLoginOutcome, ApiError> {
        let token = non_blank(req.google_token.as_deref())
            .ok_or_else(|| ApiError::Validation("Google token is required".to_string()))?;

        let identity = self.identity.verify(token).await?;
        if identity.name.is_none() {
            warn!("Google login failed: token payload has no name");
            return Err(ApiError::Authentication("Invalid Google token".to_string()));
        }

        match users::find_by_email(&self.db, &identity.email).await? {
            Some(user) => {
                if user.is_deleted() {
                    warn!(user_id = user.id, "Google login refused for deleted account");
                    return Err(ApiError::Forbidden(ACCOUNT_DELETED.to_string()));
                }
                let tokens = self.issue_session(&user).await?;
                info!(user_id = user.id, "Google login successful");
                Ok(GoogleLoginOutcome::SignedIn {
                    user_id: user.id,
                    tokens,
                })
            }
            None => {
                info!(
                    email = %safe_email_log(&identity.email),
                    "Google login requires registration"
                );
                Ok(GoogleLoginOutcome::NeedsRegistration(identity))
            }
        }
    }

    async fn issue_session(&self, user: &User) -> Result<TokenPair, ApiError> {
        let tokens = self.tokens.issue_pair(user.id, &user.email, &user.nickname)?;
        refresh_tokens::save(&self.db, user.id, &tokens.refresh_token, Utc::now()).await?;
        Ok(tokens)
    }

    /// Unconfirmed --confirm--> Confirmed. The token is cleared, so it works once.
    pub async fn confirm_email(&self, req: TokenRequest) -> Result<(), ApiError> {
        let token = non_blank(req.token.as_deref())
            .ok_or_else(|| ApiError::Validation("Token is required.".to_string()))?;
        let now = Utc::now();

        let user = users::find_by_confirmation_token(&self.db, token)
            .await?
            .filter(|user| confirmation_usable(user, now));
        let user = match user {
            Some(user) => user,
            None => {
                warn!(token = %safe_token_log(token), "Email confirmation failed: invalid or expired token");
                return Err(ApiError::Authentication(INVALID_CONFIRMATION.to_string()));
            }
        };

        if users::mark_confirmed(&self.db, user.id, token, now).await? == 0 {
            return Err(ApiError::Authentication(INVALID_CONFIRMATION.to_string()));
        }

        info!(user_id = user.id, "Email confirmed");
        Ok(())
    }

    /// Starts a password reset. Unknown and Google-owned emails get the same
    /// answer as a successful request; an unconfirmed account gets a fresh
    /// confirmation link and a message saying so.
    pub async fn request_password_reset(
        &self,
        req: EmailRequest,
    ) -> Result<ResetRequestOutcome, ApiError> {
        let email = req
            .email
            .as_deref()
            .filter(|e| !e.is_empty())
            .ok_or_else(|| ApiError::Validation("Email is required.".to_string()))?;
        if !valid_email(email) {
            warn!("Password reset request failed: invalid email format");
            return Err(ApiError::Validation("Invalid email format.".to_string()));
        }

        let user = match users::find_by_email(&self.db, email).await? {
            Some(user) if !user.is_deleted() => user,
            _ => {
                info!(email = %safe_email_log(email), "Password reset: no action required");
                return Ok(ResetRequestOutcome::NoAction);
            }
        };

        let now = Utc::now();
        let generated = one_time_token::generate_at(now);

        match user.confirmation_state() {
            ConfirmationState::GoogleOwned => {
                info!(user_id = user.id, "Password reset: Google account, no action");
                Ok(ResetRequestOutcome::NoAction)
            }
            ConfirmationState::Unconfirmed => {
                users::set_confirmation_token(
                    &self.db,
                    user.id,
                    &generated.token,
                    generated.expires_at,
                    now,
                )
                .await?;
                self.emails
                    .send_confirmation_email(&user.email, &generated.token)
                    .await?;
                info!(user_id = user.id, "Password reset: account unconfirmed, confirmation re-sent");
                Ok(ResetRequestOutcome::ConfirmationResent)
            }
            ConfirmationState::Confirmed => {
                // Only the newest link stays usable
                let mut tx = self.db.begin().await?;
                let result: Result<(), ApiError> = async {
                    reset_tokens::retire_for_user(&mut *tx, user.id, now).await?;
                    reset_tokens::save(&mut *tx, user.id, &generated.token, generated.expires_at, now)
                        .await?;
                    Ok(())
                }
                .await;
                finish(tx, result).await?;

                self.emails
                    .send_password_reset_email(&user.email, &generated.token)
                    .await?;
                info!(user_id = user.id, "Password reset email sent");
                Ok(ResetRequestOutcome::ResetLinkSent)
            }
        }
    }

    /// Read-only check of a reset token.
    pub async fn validate_reset_token(&self, req: TokenRequest) -> Result<&'static str, ApiError> {
        let token = non_blank(req.token.as_deref())
            .ok_or_else(|| ApiError::Validation("Token is required.".to_string()))?;

        let record = reset_tokens::find_by_token(&self.db, token)
            .await?
            .ok_or_else(|| {
                warn!(token = %safe_token_log(token), "Invalid reset token");
                ApiError::Authentication(INVALID_RESET_TOKEN.to_string())
            })?;

        if one_time_token::is_expired(record.expires_at, Utc::now()) {
            warn!(token = %safe_token_log(token), "Expired reset token");
            return Err(ApiError::Authentication(EXPIRED_RESET_TOKEN.to_string()));
        }

        Ok("Token is valid.")
    }

    /// Consumes a reset token. The token row is deleted, any other outstanding
    /// token of the user retired, and the hash replaced in one transaction, so
    /// a reset can happen at most once per issued link.
    pub async fn reset_password(&self, req: ResetPasswordRequest) -> Result<(), ApiError> {
        let (token, password) = match (
            non_blank(req.token.as_deref()),
            req.password.as_deref().filter(|p| !p.is_empty()),
        ) {
            (Some(token), Some(password)) => (token, password),
            _ => {
                return Err(ApiError::Validation(
                    "Token and new password are required.".to_string(),
                ))
            }
        };

        if !self.complexity.is_acceptable(password) {
            warn!("Password reset failed: complexity rule not met");
            return Err(ApiError::Validation(
                self.complexity.requirement().to_string(),
            ));
        }

        let now = Utc::now();
        let record = reset_tokens::find_by_token(&self.db, token)
            .await?
            .ok_or_else(|| ApiError::Authentication(INVALID_RESET_TOKEN.to_string()))?;
        if one_time_token::is_expired(record.expires_at, now) {
            warn!(token = %safe_token_log(token), "Expired password reset token");
            return Err(ApiError::Authentication(EXPIRED_RESET_TOKEN.to_string()));
        }

        let user = users::find_by_id(&self.db, record.user_id)
            .await?
            .ok_or_else(|| {
                error!(user_id = record.user_id, "User not found for reset token");
                ApiError::Authentication(
                    "User associated with this token does not exist.".to_string(),
                )
            })?;

        match user.confirmation_state() {
            ConfirmationState::Unconfirmed => {
                return Err(ApiError::Authentication(
                    "Email not confirmed. Please confirm your email first.".to_string(),
                ))
            }
            ConfirmationState::GoogleOwned => {
                return Err(ApiError::Authentication(
                    "Password reset is not available for Google accounts.".to_string(),
                ))
            }
            ConfirmationState::Confirmed => {}
        }

        let digest = self.hasher.hash(password).await?;

        let mut tx = self.db.begin().await?;
        let result: Result<(), ApiError> = async {
            if reset_tokens::delete_by_token(&mut *tx, token).await? == 0 {
                return Err(ApiError::Authentication(INVALID_RESET_TOKEN.to_string()));
            }
            reset_tokens::retire_for_user(&mut *tx, user.id, now).await?;
            users::set_password_hash(&mut *tx, user.id, &digest, now).await?;
            Ok(())
        }
        .await;
        finish(tx, result).await?;

        info!(user_id = user.id, "Password reset successfully");
        Ok(())
    }

    pub async fn me(&self, user_id: i64) -> Result<UserProfile, ApiError> {
        users::profile(&self.db, user_id).await?.ok_or_else(|| {
            warn!(user_id, "User profile not found");
            ApiError::NotFound("User not found".to_string())
        })
    }

    pub async fn check_user(&self, req: EmailRequest) -> Result<Option<UserSummary>, ApiError> {
        let email = non_blank(req.email.as_deref())
            .ok_or_else(|| ApiError::Validation("Email is required.".to_string()))?;

        let user = users::find_by_email(&self.db, email).await?;
        debug!(email = %safe_email_log(email), exists = user.is_some(), "Checked user existence");
        Ok(user.as_ref().map(UserSummary::from))
    }

    pub async fn check_nickname(&self, req: NicknameRequest) -> Result<bool, ApiError> {
        let nickname = non_blank(req.nickname.as_deref())
            .ok_or_else(|| ApiError::Validation("Nickname is required.".to_string()))?;

        let taken = users::find_by_nickname(&self.db, nickname).await?.is_some();
        debug!(nickname = %nickname, taken, "Checked nickname availability");
        Ok(taken)
    }
}

fn confirmation_usable(user: &User, now: DateTime<Utc>) -> bool {
    user.email_confirmation_token_expires
        .is_some_and(|expires| !one_time_token::is_expired(expires, now))
}

/// Unique violations on `users` become conflicts naming the column hit.
pub(super) fn account_conflict(err: sqlx::Error) -> ApiError {
    let message = match &err {
        sqlx::Error::Database(db_err) if db_err.message().contains("users.nickname") => {
            NICKNAME_EXISTS
        }
        _ => USER_EXISTS,
    };
    conflict_on_unique(err, message)
}

/// Commits on success, rolls back on error.
async fn finish<T>(
    tx: Transaction<'_, Sqlite>,
    result: Result<T, ApiError>,
) -> Result<T, ApiError> {
    match result {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            if let Err(rollback_err) = tx.rollback().await {
                error!(error = %rollback_err, "Transaction rollback failed");
            }
            Err(err)
        }
    }
}
