// src/services/google.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, warn};

const TOKENINFO_ENDPOINT: &str = "https://oauth2.googleapis.com/tokeninfo";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum IdentityError {
    /// The provider looked at the token and refused it
    #[error("identity token rejected: {0}")]
    Rejected(String),

    /// The provider could not be reached or answered with a server error
    #[error("identity provider unavailable: {0}")]
    Unavailable(String),
}

/// Identity asserted by a verified Google ID token
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleIdentity {
    pub email: String,
    pub name: Option<String>,
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, id_token: &str) -> Result<GoogleIdentity, IdentityError>;
}

/// Verifies Google ID tokens against the tokeninfo endpoint.
/// Docs: https://developers.google.com/identity/sign-in/web/backend-auth
pub struct GoogleVerifier {
    http: Client,
    client_id: Option<String>,
}

impl GoogleVerifier {
    pub fn new(http: Client, client_id: Option<String>) -> Self {
        Self { http, client_id }
    }
}

#[async_trait]
impl IdentityVerifier for GoogleVerifier {
    async fn verify(&self, id_token: &str) -> Result<GoogleIdentity, IdentityError> {
        debug!("Initiating Google token validation with tokeninfo endpoint");

        let response = self
            .http
            .get(TOKENINFO_ENDPOINT)
            .query(&[("id_token", id_token)])
            .send()
            .await
            .map_err(|e| {
                error!(
                    error = %e,
                    endpoint = TOKENINFO_ENDPOINT,
                    "HTTP error contacting Google tokeninfo endpoint"
                );
                IdentityError::Unavailable(e.to_string())
            })?;

        let status = response.status();
        debug!(http_status = %status, "Received response from Google tokeninfo endpoint");

        if status.is_server_error() {
            warn!(http_status = %status, "Google tokeninfo returned server error");
            return Err(IdentityError::Unavailable(format!(
                "tokeninfo returned {}",
                status
            )));
        }
        if !status.is_success() {
            warn!(http_status = %status, "Google tokeninfo refused the token");
            return Err(IdentityError::Rejected(format!(
                "tokeninfo returned {}",
                status
            )));
        }

        let body = response.json::<Value>().await.map_err(|e| {
            error!(error = %e, "Failed to parse Google tokeninfo JSON response");
            IdentityError::Rejected("malformed tokeninfo response".to_string())
        })?;

        identity_from_tokeninfo(&body, self.client_id.as_deref(), Utc::now())
    }
}

/// Checks expiry and audience on a tokeninfo body and extracts the identity.
///
/// tokeninfo encodes `exp` and `email_verified` as strings; numeric and
/// boolean values are accepted too.
pub fn identity_from_tokeninfo(
    body: &Value,
    client_id: Option<&str>,
    now: DateTime<Utc>,
) -> Result<GoogleIdentity, IdentityError> {
    let exp = body.get("exp").and_then(|v| match v {
        Value::String(s) => s.parse::<i64>().ok(),
        other => other.as_i64(),
    });
    if let Some(exp) = exp {
        if exp <= now.timestamp() {
            warn!(token_exp = exp, "Google token has expired");
            return Err(IdentityError::Rejected("token has expired".to_string()));
        }
    }

    if let Some(client_id) = client_id {
        match body.get("aud").and_then(Value::as_str) {
            Some(aud) if aud == client_id => {}
            Some(aud) => {
                warn!(token_audience = %aud, "Google token audience mismatch");
                return Err(IdentityError::Rejected("token audience mismatch".to_string()));
            }
            None => {
                warn!("Google token missing audience field");
                return Err(IdentityError::Rejected("token missing audience".to_string()));
            }
        }
    }

    let email = body
        .get("email")
        .and_then(Value::as_str)
        .filter(|e| !e.is_empty())
        .ok_or_else(|| IdentityError::Rejected("token missing email".to_string()))?;

    // Accounts are linked by email, so the provider must vouch for it
    let verified = match body.get("email_verified") {
        Some(Value::String(s)) => s == "true",
        Some(Value::Bool(b)) => *b,
        _ => false,
    };
    if !verified {
        warn!("Google token email is not verified");
        return Err(IdentityError::Rejected("email not verified".to_string()));
    }
    let name = body
        .get("name")
        .and_then(Value::as_str)
        .filter(|n| !n.trim().is_empty())
        .map(str::to_string);

    Ok(GoogleIdentity {
        email: email.to_string(),
        name,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    #[test]
    fn test_identity_extracted() {
        let now = Utc::now();
        let body = json!({
            "email": "a@b.com",
            "email_verified": "true",
            "name": "Ada",
            "aud": "client-1",
            "exp": (now + Duration::minutes(5)).timestamp().to_string(),
        });

        let identity = identity_from_tokeninfo(&body, Some("client-1"), now).unwrap();
        assert_eq!(identity.email, "a@b.com");
        assert_eq!(identity.name.as_deref(), Some("Ada"));
    }

    #[test]
    fn test_numeric_exp_in_past_rejected() {
        let now = Utc::now();
        let body = json!({ "email": "a@b.com", "exp": now.timestamp() - 1 });
        assert!(matches!(
            identity_from_tokeninfo(&body, None, now),
            Err(IdentityError::Rejected(_))
        ));
    }

    #[test]
    fn test_audience_checked_only_when_configured() {
        let now = Utc::now();
        let body = json!({ "email": "a@b.com", "email_verified": "true", "aud": "someone-else" });

        assert!(identity_from_tokeninfo(&body, None, now).is_ok());
        assert!(matches!(
            identity_from_tokeninfo(&body, Some("client-1"), now),
            Err(IdentityError::Rejected(_))
        ));

        let no_aud = json!({ "email": "a@b.com", "email_verified": "true" });
        assert!(identity_from_tokeninfo(&no_aud, Some("client-1"), now).is_err());
    }

    #[test]
    fn test_missing_email_rejected_and_blank_name_dropped() {
        let now = Utc::now();
        assert!(identity_from_tokeninfo(&json!({ "name": "Ada" }), None, now).is_err());

        let body = json!({ "email": "a@b.com", "email_verified": true, "name": "  " });
        let identity = identity_from_tokeninfo(&body, None, now).unwrap();
        assert_eq!(identity.name, None);
    }

    #[test]
    fn test_unverified_email_rejected() {
        let now = Utc::now();
        for verified in [json!("false"), json!(false), serde_json::Value::Null] {
            let mut body = json!({ "email": "a@b.com", "name": "Ada" });
            if !verified.is_null() {
                body["email_verified"] = verified;
            }
            assert!(matches!(
                identity_from_tokeninfo(&body, None, now),
                Err(IdentityError::Rejected(_))
            ));
        }
    }
}
