//! Password reset tokens. A row is deleted when it is used; any other
//! outstanding rows of the same user are retired through `consumed_at`.

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite};

use super::models::PasswordResetToken;

pub async fn save<'e, E>(
    executor: E,
    user_id: i64,
    reset_token: &str,
    expires_at: DateTime<Utc>,
    now: DateTime<Utc>,
) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "INSERT INTO password_reset_tokens (user_id, reset_token, expires_at, created_at) VALUES (?, ?, ?, ?)",
    )
    .bind(user_id)
    .bind(reset_token)
    .bind(expires_at)
    .bind(now)
    .execute(executor)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn find_by_token<'e, E>(
    executor: E,
    reset_token: &str,
) -> Result<Option<PasswordResetToken>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, PasswordResetToken>(
        "SELECT * FROM password_reset_tokens WHERE reset_token = ? AND consumed_at IS NULL",
    )
    .bind(reset_token)
    .fetch_optional(executor)
    .await
}

/// Returns rows affected; zero means someone else consumed it first.
pub async fn delete_by_token<'e, E>(executor: E, reset_token: &str) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query("DELETE FROM password_reset_tokens WHERE reset_token = ?")
        .bind(reset_token)
        .execute(executor)
        .await?;

    Ok(result.rows_affected())
}

/// Marks every outstanding token of `user_id` as consumed. Returns rows retired.
pub async fn retire_for_user<'e, E>(
    executor: E,
    user_id: i64,
    now: DateTime<Utc>,
) -> Result<u64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result = sqlx::query(
        "UPDATE password_reset_tokens SET consumed_at = ? WHERE user_id = ? AND consumed_at IS NULL",
    )
    .bind(now)
    .bind(user_id)
    .execute(executor)
    .await?;

    Ok(result.rows_affected())
}
