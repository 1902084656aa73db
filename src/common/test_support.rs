//! Shared fixtures for unit and HTTP tests

use async_trait::async_trait;
use chrono::{Duration, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::str::FromStr;
use std::sync::{Arc, Mutex};

use crate::auth::password::{PasswordComplexity, PasswordHasher};
use crate::auth::service::AuthService;
use crate::auth::tokens::TokenIssuer;
use crate::common::config::{AppConfig, TokenConfig};
use crate::common::migrations::{run_migrations, seed_default_policies};
use crate::common::state::AppState;
use crate::services::email::{EmailService, MailError, MailTransport, OutgoingEmail};
use crate::services::google::{GoogleIdentity, IdentityError, IdentityVerifier};

/// Fresh in-memory database with the full schema.
/// A single long-lived connection keeps the memory database alive.
pub async fn setup_test_db() -> SqlitePool {
    let options = SqliteConnectOptions::from_str("sqlite::memory:")
        .unwrap()
        .foreign_keys(true);
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect_with(options)
        .await
        .unwrap();

    run_migrations(&pool, false).await.unwrap();
    pool
}

/// `setup_test_db` plus the default v1.0 policies
pub async fn setup_seeded_db() -> SqlitePool {
    let pool = setup_test_db().await;
    seed_default_policies(&pool).await.unwrap();
    pool
}

pub fn test_token_config() -> TokenConfig {
    TokenConfig {
        access_secret: "test-access-secret".to_string(),
        refresh_secret: "test-refresh-secret".to_string(),
        access_ttl: Duration::minutes(15),
        refresh_ttl: Duration::days(7),
    }
}

/// Captures every delivered message instead of sending it
#[derive(Default)]
pub struct RecordingTransport {
    sent: Mutex<Vec<(String, OutgoingEmail)>>,
    fail: bool,
}

impl RecordingTransport {
    pub fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: true,
        }
    }

    pub fn sent(&self) -> Vec<(String, OutgoingEmail)> {
        self.sent.lock().unwrap().clone()
    }

    /// Token from the last confirmation or reset link sent
    pub fn last_token(&self) -> Option<String> {
        self.sent().last().and_then(|(_, email)| {
            email
                .html
                .split("token=")
                .nth(1)
                .map(|rest| rest.chars().take_while(|c| c.is_ascii_hexdigit()).collect())
        })
    }
}

#[async_trait]
impl MailTransport for RecordingTransport {
    async fn deliver(&self, from: &str, email: &OutgoingEmail) -> Result<(), MailError> {
        if self.fail {
            return Err(MailError::Send("recording transport set to fail".to_string()));
        }
        self.sent
            .lock()
            .unwrap()
            .push((from.to_string(), email.clone()));
        Ok(())
    }
}

/// Accepts `google:<email>[:<name>]`, rejects anything else,
/// and reports the provider as down for `google-down`.
pub struct StubVerifier;

#[async_trait]
impl IdentityVerifier for StubVerifier {
    async fn verify(&self, id_token: &str) -> Result<GoogleIdentity, IdentityError> {
        if id_token == "google-down" {
            return Err(IdentityError::Unavailable("stub outage".to_string()));
        }
        let mut parts = id_token.splitn(3, ':');
        match (parts.next(), parts.next(), parts.next()) {
            (Some("google"), Some(email), name) if !email.is_empty() => Ok(GoogleIdentity {
                email: email.to_string(),
                name: name.map(str::to_string),
            }),
            _ => Err(IdentityError::Rejected("stub rejects token".to_string())),
        }
    }
}

pub struct TestHarness {
    pub db: SqlitePool,
    pub mail: Arc<RecordingTransport>,
    pub tokens: Arc<TokenIssuer>,
    pub auth: Arc<AuthService>,
}

impl TestHarness {
    /// State for router tests, sharing this harness's store and issuer
    pub fn app_state(&self) -> Arc<AppState> {
        let config = AppConfig::from_lookup(|_| None).unwrap();
        Arc::new(AppState {
            db: self.db.clone(),
            config: Arc::new(config),
            tokens: self.tokens.clone(),
            auth: self.auth.clone(),
        })
    }
}

pub async fn harness_with(complexity: PasswordComplexity, mail: RecordingTransport) -> TestHarness {
    let db = setup_seeded_db().await;
    let mail = Arc::new(mail);
    let emails = Arc::new(EmailService::new(
        mail.clone(),
        "http://localhost:3000",
        "hello@example.com",
        "no-reply@example.com",
    ));
    let tokens = Arc::new(TokenIssuer::new(&test_token_config()));
    let auth = Arc::new(AuthService::new(
        db.clone(),
        tokens.clone(),
        PasswordHasher::with_cost(4),
        complexity,
        emails,
        Arc::new(StubVerifier),
    ));

    TestHarness {
        db,
        mail,
        tokens,
        auth,
    }
}

pub async fn harness() -> TestHarness {
    harness_with(PasswordComplexity::Simple, RecordingTransport::default()).await
}

/// Marks a user deleted out of band
pub async fn soft_delete(pool: &SqlitePool, user_id: i64) {
    sqlx::query("UPDATE users SET deleted_at = ? WHERE id = ?")
        .bind(Utc::now())
        .bind(user_id)
        .execute(pool)
        .await
        .unwrap();
}
