use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::FromRow;
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum PolicyType {
    Privacy,
    Terms,
}

impl PolicyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            PolicyType::Privacy => "privacy",
            PolicyType::Terms => "terms",
        }
    }
}

impl fmt::Display for PolicyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PolicyType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "terms" => Ok(PolicyType::Terms),
            "privacy" => Ok(PolicyType::Privacy),
            other => Err(format!("unknown policy type '{}'", other)),
        }
    }
}

/// A published policy document. Rows are never updated.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Policy {
    pub id: i64,
    #[sqlx(rename = "type")]
    #[serde(rename = "type")]
    pub policy_type: PolicyType,
    pub version: String,
    pub content: String,
    pub effective_date: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Entry of `GET /api/policies/latest`
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct LatestPolicy {
    #[serde(rename = "type")]
    pub policy_type: PolicyType,
    pub version: String,
    pub content: String,
    pub effective_date: DateTime<Utc>,
    pub content_url: String,
}

impl From<Policy> for LatestPolicy {
    fn from(policy: Policy) -> Self {
        let content_url = format!("/policies/{}-{}", policy.policy_type, policy.version);
        Self {
            policy_type: policy.policy_type,
            version: policy.version,
            content: policy.content,
            effective_date: policy.effective_date,
            content_url,
        }
    }
}
