// src/common/config.rs
//! Process configuration, read from the environment once at startup

use anyhow::{anyhow, bail, Context};
use chrono::Duration;
use std::env;
use tracing::warn;

use crate::auth::password::PasswordComplexity;

const DEFAULT_ACCESS_SECRET: &str = "replace_with_strong_access_secret";
const DEFAULT_REFRESH_SECRET: &str = "replace_with_strong_refresh_secret";

/// Where outgoing mail goes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmailTransport {
    /// AWS SES v2
    Ses,
    /// Development transport: messages are only written to the log
    Log,
}

/// Key material and lifetimes for the two signed token kinds.
/// The two secrets are separate slots and must differ.
#[derive(Clone)]
pub struct TokenConfig {
    pub access_secret: String,
    pub refresh_secret: String,
    pub access_ttl: Duration,
    pub refresh_ttl: Duration,
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("access_secret", &"***")
            .field("refresh_secret", &"***")
            .field("access_ttl", &self.access_ttl)
            .field("refresh_ttl", &self.refresh_ttl)
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub reset_db: bool,
    pub seed_policies: bool,
    pub port: u16,
    pub tokens: TokenConfig,
    pub password_complexity: PasswordComplexity,
    /// Front-end base URL used to build confirmation and reset links
    pub base_url: String,
    pub google_client_id: Option<String>,
    pub email_transport: EmailTransport,
    pub email_from: String,
    pub email_no_reply: String,
    pub ses_region: Option<String>,
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the configuration from any key lookup; `from_env` passes the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());
        let flag = |key: &str, default: bool| {
            get(key)
                .map(|v| v.eq_ignore_ascii_case("true"))
                .unwrap_or(default)
        };

        let access_secret = get("JWT_SECRET").unwrap_or_else(|| {
            warn!("JWT_SECRET not set, using the built-in development secret");
            DEFAULT_ACCESS_SECRET.to_string()
        });
        let refresh_secret = get("JWT_REFRESH_SECRET").unwrap_or_else(|| {
            warn!("JWT_REFRESH_SECRET not set, using the built-in development secret");
            DEFAULT_REFRESH_SECRET.to_string()
        });
        if access_secret == refresh_secret {
            bail!("JWT_SECRET and JWT_REFRESH_SECRET must be different");
        }

        let access_ttl = parse_duration(
            &get("ACCESS_TOKEN_EXPIRATION_TIME").unwrap_or_else(|| "15m".to_string()),
        )
        .context("invalid ACCESS_TOKEN_EXPIRATION_TIME")?;
        let refresh_ttl = parse_duration(
            &get("REFRESH_TOKEN_EXPIRATION_TIME").unwrap_or_else(|| "7d".to_string()),
        )
        .context("invalid REFRESH_TOKEN_EXPIRATION_TIME")?;

        let password_complexity = get("PASSWORD_COMPLEXITY")
            .unwrap_or_else(|| "simple".to_string())
            .parse::<PasswordComplexity>()
            .map_err(|e| anyhow!("invalid PASSWORD_COMPLEXITY: {}", e))?;

        let port = match get("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("invalid PORT '{}'", raw))?,
            None => 5000,
        };

        let email_transport = match get("EMAIL_TRANSPORT").as_deref() {
            None | Some("log") => EmailTransport::Log,
            Some("ses") => EmailTransport::Ses,
            Some(other) => bail!("invalid EMAIL_TRANSPORT '{}', expected 'ses' or 'log'", other),
        };

        let email_from = get("EMAIL_FROM").unwrap_or_else(|| "no-reply@localhost".to_string());
        let email_no_reply = get("EMAIL_NO_REPLY").unwrap_or_else(|| email_from.clone());

        let cors_origins = get("CORS_ORIGINS")
            .unwrap_or_else(|| "http://localhost:3000".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        Ok(Self {
            database_url: get("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://auth_api.db".to_string()),
            reset_db: flag("RESET_DB", false),
            seed_policies: flag("SEED_POLICIES", true),
            port,
            tokens: TokenConfig {
                access_secret,
                refresh_secret,
                access_ttl,
                refresh_ttl,
            },
            password_complexity,
            base_url: get("BASE_URL")
                .unwrap_or_else(|| "http://localhost:3000".to_string())
                .trim_end_matches('/')
                .to_string(),
            google_client_id: get("GOOGLE_CLIENT_ID"),
            email_transport,
            email_from,
            email_no_reply,
            ses_region: get("AWS_SES_REGION").or_else(|| get("AWS_REGION")),
            cors_origins,
        })
    }
}

/// Parses `<n>` (seconds) or `<n>s|m|h|d`.
pub fn parse_duration(raw: &str) -> anyhow::Result<Duration> {
    let raw = raw.trim();
    let split = raw
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(raw.len());
    let (amount, unit) = raw.split_at(split);
    let amount: i64 = amount
        .parse()
        .map_err(|_| anyhow!("'{}' does not start with a number", raw))?;
    if amount <= 0 {
        bail!("'{}' must be positive", raw);
    }

    match unit {
        "" | "s" => Ok(Duration::seconds(amount)),
        "m" => Ok(Duration::minutes(amount)),
        "h" => Ok(Duration::hours(amount)),
        "d" => Ok(Duration::days(amount)),
        other => bail!("unknown duration unit '{}'", other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> anyhow::Result<AppConfig> {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.port, 5000);
        assert_eq!(config.tokens.access_ttl, Duration::minutes(15));
        assert_eq!(config.tokens.refresh_ttl, Duration::days(7));
        assert_eq!(config.password_complexity, PasswordComplexity::Simple);
        assert_eq!(config.email_transport, EmailTransport::Log);
        assert!(config.seed_policies);
        assert!(!config.reset_db);
    }

    #[test]
    fn test_identical_secrets_rejected() {
        let result = config_from(&[("JWT_SECRET", "same"), ("JWT_REFRESH_SECRET", "same")]);
        assert!(result.is_err());
    }

    #[test]
    fn test_unknown_complexity_rejected() {
        assert!(config_from(&[("PASSWORD_COMPLEXITY", "medium")]).is_err());
        let config = config_from(&[("PASSWORD_COMPLEXITY", "complex")]).unwrap();
        assert_eq!(config.password_complexity, PasswordComplexity::Complex);
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let config = config_from(&[("BASE_URL", "https://app.example.com/")]).unwrap();
        assert_eq!(config.base_url, "https://app.example.com");
    }

    #[test]
    fn test_parse_duration() {
        assert_eq!(parse_duration("15m").unwrap(), Duration::minutes(15));
        assert_eq!(parse_duration("7d").unwrap(), Duration::days(7));
        assert_eq!(parse_duration("2h").unwrap(), Duration::hours(2));
        assert_eq!(parse_duration("90").unwrap(), Duration::seconds(90));
        assert!(parse_duration("m").is_err());
        assert!(parse_duration("0s").is_err());
        assert!(parse_duration("3w").is_err());
    }
}
