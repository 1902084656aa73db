//! Issued refresh tokens, kept for audit. Verification never reads this table.

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite};

#[cfg(test)]
use super::models::RefreshToken;

pub async fn save<'e, E>(
    executor: E,
    user_id: i64,
    token: &str,
    now: DateTime<Utc>,
) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let result =
        sqlx::query("INSERT INTO refresh_tokens (user_id, token, created_at) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(token)
            .bind(now)
            .execute(executor)
            .await?;

    Ok(result.last_insert_rowid())
}

/// Newest first
#[cfg(test)]
pub async fn list_for_user<'e, E>(
    executor: E,
    user_id: i64,
) -> Result<Vec<RefreshToken>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, RefreshToken>(
        "SELECT id, user_id, token, created_at FROM refresh_tokens WHERE user_id = ? ORDER BY id DESC",
    )
    .bind(user_id)
    .fetch_all(executor)
    .await
}
