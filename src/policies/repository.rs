//! Policy store

use chrono::{DateTime, Utc};
use sqlx::{Executor, Sqlite, SqliteConnection};

use super::models::{Policy, PolicyType};

/// For each type, the policy with the greatest `effective_date <= now`.
/// Ordered by type name.
pub async fn latest<'e, E>(executor: E, now: DateTime<Utc>) -> Result<Vec<Policy>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let mut rows: Vec<Policy> = sqlx::query_as::<_, Policy>("SELECT * FROM policies")
        .fetch_all(executor)
        .await?
        .into_iter()
        .filter(|p| p.effective_date <= now)
        .collect();

    // Newest effective first within each type; later inserts win ties
    rows.sort_by(|a, b| {
        a.policy_type
            .as_str()
            .cmp(b.policy_type.as_str())
            .then(b.effective_date.cmp(&a.effective_date))
            .then(b.id.cmp(&a.id))
    });

    let mut latest: Vec<Policy> = Vec::new();
    for policy in rows {
        if latest
            .last()
            .map_or(true, |seen| seen.policy_type != policy.policy_type)
        {
            latest.push(policy);
        }
    }

    Ok(latest)
}

pub async fn get_by_type_and_version<'e, E>(
    executor: E,
    policy_type: PolicyType,
    version: &str,
) -> Result<Option<Policy>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    sqlx::query_as::<_, Policy>("SELECT * FROM policies WHERE type = ? AND version = ?")
        .bind(policy_type)
        .bind(version)
        .fetch_optional(executor)
        .await
}

pub async fn insert<'e, E>(
    executor: E,
    policy_type: PolicyType,
    version: &str,
    content: &str,
    effective_date: DateTime<Utc>,
) -> Result<i64, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let now = Utc::now();
    let result = sqlx::query(
        "INSERT INTO policies (version, type, content, effective_date, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?)",
    )
    .bind(version)
    .bind(policy_type)
    .bind(content)
    .bind(effective_date)
    .bind(now)
    .bind(now)
    .execute(executor)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Records which exact policy rows a user agreed to.
pub async fn record_agreements(
    conn: &mut SqliteConnection,
    user_id: i64,
    policy_ids: &[i64],
    now: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    for policy_id in policy_ids {
        sqlx::query("INSERT INTO user_policies (user_id, policy_id, agreed_at) VALUES (?, ?, ?)")
            .bind(user_id)
            .bind(policy_id)
            .bind(now)
            .execute(&mut *conn)
            .await?;
    }
    Ok(())
}

#[cfg(test)]
pub async fn agreements_for_user<'e, E>(executor: E, user_id: i64) -> Result<Vec<i64>, sqlx::Error>
where
    E: Executor<'e, Database = Sqlite>,
{
    let rows: Vec<(i64,)> =
        sqlx::query_as("SELECT policy_id FROM user_policies WHERE user_id = ? ORDER BY policy_id")
            .bind(user_id)
            .fetch_all(executor)
            .await?;
    Ok(rows.into_iter().map(|(id,)| id).collect())
}
