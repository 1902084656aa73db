//! User row persistence
//!
//! Functions take any SQLite executor so they run against the pool or inside
//! an open transaction (`&mut *tx`).

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite};

use super::models::{NewUser, User, UserProfile};

pub async fn find_by_id<'e, E>(executor: E, id: i64) -> Result<Option<User>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
        .bind(id)
        .fetch_optional(executor)
        .await
}

/// Exact, case-sensitive match on the stored email.
pub async fn find_by_email<'e, E>(executor: E, email: &str) -> Result<Option<User>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE email = ?")
        .bind(email)
        .fetch_optional(executor)
        .await
}

pub async fn find_by_nickname<'e, E>(
    executor: E,
    nickname: &str,
) -> Result<Option<User>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE nickname = ?")
        .bind(nickname)
        .fetch_optional(executor)
        .await
}

/// Looks up the owner of a confirmation token. Expiry is checked by the caller.
pub async fn find_by_confirmation_token<'e, E>(
    executor: E,
    token: &str,
) -> Result<Option<User>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, User>("SELECT * FROM users WHERE email_confirmation_token = ?")
        .bind(token)
        .fetch_optional(executor)
        .await
}

/// Inserts a user and returns its id. Unique violations on email or
/// nickname surface as `sqlx::Error::Database`.
pub async fn create<'e, E>(
    executor: E,
    user: &NewUser<'_>,
    now: DateTime<Utc>,
) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let (token, expires) = match user.confirmation {
        Some((token, expires)) => (Some(token), Some(expires)),
        None => (None, None),
    };

    let result = sqlx::query(
        r#"
        INSERT INTO users (
            email, nickname, password_hash, google_oauth, email_confirmed,
            email_confirmation_token, email_confirmation_token_expires,
            terms_version, privacy_version, accepted_policies, created_at, updated_at
        ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 1, ?, ?)
        "#,
    )
    .bind(user.email)
    .bind(user.nickname)
    .bind(user.password_hash)
    .bind(user.google_oauth)
    .bind(user.google_oauth)
    .bind(token)
    .bind(expires)
    .bind(user.terms_version)
    .bind(user.privacy_version)
    .bind(now)
    .bind(now)
    .execute(executor)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Resend transition on an unconfirmed password account: new nickname, new
/// confirmation token, and a new hash when one is given. Rows that are
/// confirmed or Google-owned are left alone; returns rows affected.
pub async fn refresh_unconfirmed<'e, E>(
    executor: E,
    id: i64,
    nickname: &str,
    password_hash: Option<&str>,
    token: &str,
    expires: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE users
        SET nickname = ?,
            password_hash = COALESCE(?, password_hash),
            email_confirmation_token = ?,
            email_confirmation_token_expires = ?,
            updated_at = ?
        WHERE id = ? AND email_confirmed = 0 AND google_oauth = 0
        "#,
    )
    .bind(nickname)
    .bind(password_hash)
    .bind(token)
    .bind(expires)
    .bind(now)
    .bind(id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

pub async fn set_confirmation_token<'e, E>(
    executor: E,
    id: i64,
    token: &str,
    expires: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "UPDATE users SET email_confirmation_token = ?, email_confirmation_token_expires = ?, updated_at = ? WHERE id = ?",
    )
    .bind(token)
    .bind(expires)
    .bind(now)
    .bind(id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

/// Confirms the account and clears its token, only while `token` is still the
/// stored one. Returns rows affected so a concurrent confirmation loses cleanly.
pub async fn mark_confirmed<'e, E>(
    executor: E,
    id: i64,
    token: &str,
    now: DateTime<Utc>,
) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        r#"
        UPDATE users
        SET email_confirmed = 1,
            email_confirmation_token = NULL,
            email_confirmation_token_expires = NULL,
            updated_at = ?
        WHERE id = ? AND email_confirmation_token = ?
        "#,
    )
    .bind(now)
    .bind(id)
    .bind(token)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}

pub async fn set_password_hash<'e, E>(
    executor: E,
    id: i64,
    password_hash: &str,
    now: DateTime<Utc>,
) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("UPDATE users SET password_hash = ?, updated_at = ? WHERE id = ?")
        .bind(password_hash)
        .bind(now)
        .bind(id)
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}

/// Public projection of a live (not soft-deleted) account.
pub async fn profile<'e, E>(executor: E, id: i64) -> Result<Option<UserProfile>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, UserProfile>(
        "SELECT id, email, nickname, created_at, updated_at FROM users WHERE id = ? AND deleted_at IS NULL",
    )
    .bind(id)
    .fetch_optional(executor)
    .await
}
