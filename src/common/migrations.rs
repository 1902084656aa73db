// src/common/migrations.rs
//! Database schema management
//!
//! Tables are created idempotently at startup. Timestamps are written from
//! Rust as RFC 3339 text, so every comparison against "now" happens in Rust
//! rather than in SQL.

use chrono::{TimeZone, Utc};
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::policies::models::PolicyType;
use crate::policies::repository as policies_repo;

/// Version of the policies seeded into an empty database
pub const DEFAULT_POLICY_VERSION: &str = "1.0";

/// Run all database migrations
pub async fn run_migrations(pool: &SqlitePool, reset_db: bool) -> Result<(), sqlx::Error> {
    if reset_db {
        warn!("⚠️  RESET_DB=true - Dropping all tables and recreating schema...");
        drop_all_tables(pool).await?;
        info!("✅ Dropped old tables");
    } else {
        info!("ℹ️  Skipping table drop (RESET_DB not set). Tables will be created if they don't exist.");
    }

    create_account_tables(pool).await?;
    create_policy_tables(pool).await?;
    create_indexes(pool).await?;

    info!("✅ Database migration completed successfully!");
    Ok(())
}

async fn drop_all_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // Children first so foreign keys never block a drop
    let tables = [
        "user_policies",
        "password_reset_tokens",
        "refresh_tokens",
        "policies",
        "users",
    ];

    for table in tables {
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", table))
            .execute(pool)
            .await?;
    }

    Ok(())
}

async fn create_account_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    // A password hash may only be absent on Google-owned accounts
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            email TEXT NOT NULL UNIQUE,
            nickname TEXT NOT NULL UNIQUE,
            password_hash TEXT,
            google_oauth INTEGER NOT NULL DEFAULT 0,
            email_confirmed INTEGER NOT NULL DEFAULT 0,
            email_confirmation_token TEXT,
            email_confirmation_token_expires TEXT,
            terms_version TEXT,
            privacy_version TEXT,
            accepted_policies INTEGER NOT NULL DEFAULT 0,
            deleted_at TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            CHECK (google_oauth = 1 OR password_hash IS NOT NULL)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS refresh_tokens (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            token TEXT NOT NULL UNIQUE,
            created_at TEXT NOT NULL,
            FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS password_reset_tokens (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            user_id INTEGER NOT NULL,
            reset_token TEXT NOT NULL UNIQUE,
            expires_at TEXT NOT NULL,
            created_at TEXT NOT NULL,
            consumed_at TEXT,
            FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_policy_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS policies (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            version TEXT NOT NULL,
            type TEXT NOT NULL CHECK (type IN ('terms', 'privacy')),
            content TEXT NOT NULL,
            effective_date TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            UNIQUE(type, version)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_policies (
            user_id INTEGER NOT NULL,
            policy_id INTEGER NOT NULL,
            agreed_at TEXT NOT NULL,
            PRIMARY KEY(user_id, policy_id),
            FOREIGN KEY(user_id) REFERENCES users(id) ON DELETE CASCADE,
            FOREIGN KEY(policy_id) REFERENCES policies(id) ON DELETE CASCADE
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_indexes(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let indexes = [
        "CREATE INDEX IF NOT EXISTS idx_users_confirmation_token ON users(email_confirmation_token)",
        "CREATE INDEX IF NOT EXISTS idx_refresh_tokens_user ON refresh_tokens(user_id)",
        "CREATE INDEX IF NOT EXISTS idx_password_reset_tokens_user ON password_reset_tokens(user_id)",
        "CREATE INDEX IF NOT EXISTS idx_policies_type_effective ON policies(type, effective_date)",
    ];

    for statement in indexes {
        sqlx::query(statement).execute(pool).await?;
    }

    Ok(())
}

/// Seeds terms and privacy v1.0 when the policies table is empty.
/// Returns the number of rows inserted.
pub async fn seed_default_policies(pool: &SqlitePool) -> Result<u64, sqlx::Error> {
    let (existing,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM policies")
        .fetch_one(pool)
        .await?;
    if existing > 0 {
        info!(existing, "Policies already present, skipping seed");
        return Ok(0);
    }

    let effective = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).single().unwrap_or_else(Utc::now);
    let defaults = [
        (
            PolicyType::Terms,
            "# Terms of Service\n\nBy creating an account you agree to use this service lawfully and to keep your credentials private.",
        ),
        (
            PolicyType::Privacy,
            "# Privacy Policy\n\nWe store your email address, nickname and the policy versions you agreed to. We never share them with third parties.",
        ),
    ];

    let mut inserted = 0;
    for (policy_type, content) in defaults {
        policies_repo::insert(pool, policy_type, DEFAULT_POLICY_VERSION, content, effective).await?;
        inserted += 1;
    }

    info!(inserted, version = DEFAULT_POLICY_VERSION, "🌱 Seeded default policies");
    Ok(inserted)
}
