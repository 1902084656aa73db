//! Signed access and refresh tokens
//!
//! Both kinds are HS256 JWTs, each signed with its own secret. Verification
//! is stateless and always names the kind it expects, so a token of one kind
//! never verifies as the other.

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use rand::{rngs::OsRng, RngCore};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use thiserror::Error;

use crate::common::config::TokenConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    Access,
    Refresh,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TokenError {
    #[error("token expired")]
    Expired,

    #[error("token malformed")]
    Malformed,

    #[error("token signature mismatch")]
    BadSignature,

    #[error("token signing failed: {0}")]
    Signing(String),
}

/// Access token payload
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AccessClaims {
    pub id: i64,
    pub email: String,
    pub nickname: String,
    pub iat: i64,
    pub exp: i64,
}

/// Refresh token payload. Carries no email or nickname.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RefreshClaims {
    pub id: i64,
    /// Random id so two refresh tokens minted in the same second differ
    pub jti: String,
    pub iat: i64,
    pub exp: i64,
}

/// Access/refresh pair as returned to clients
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

struct KeySlot {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl: Duration,
}

impl KeySlot {
    fn new(secret: &str, ttl: Duration) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl,
        }
    }
}

pub struct TokenIssuer {
    access: KeySlot,
    refresh: KeySlot,
}

impl TokenIssuer {
    pub fn new(config: &TokenConfig) -> Self {
        Self {
            access: KeySlot::new(&config.access_secret, config.access_ttl),
            refresh: KeySlot::new(&config.refresh_secret, config.refresh_ttl),
        }
    }

    fn slot(&self, kind: TokenKind) -> &KeySlot {
        match kind {
            TokenKind::Access => &self.access,
            TokenKind::Refresh => &self.refresh,
        }
    }

    fn sign<C: Serialize>(&self, kind: TokenKind, claims: &C) -> Result<String, TokenError> {
        encode(
            &Header::new(Algorithm::HS256),
            claims,
            &self.slot(kind).encoding,
        )
        .map_err(|e| TokenError::Signing(e.to_string()))
    }

    fn verify<C: DeserializeOwned>(&self, kind: TokenKind, token: &str) -> Result<C, TokenError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;

        decode::<C>(token, &self.slot(kind).decoding, &validation)
            .map(|data| data.claims)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => TokenError::Expired,
                ErrorKind::InvalidSignature => TokenError::BadSignature,
                _ => TokenError::Malformed,
            })
    }

    pub fn issue_access(&self, id: i64, email: &str, nickname: &str) -> Result<String, TokenError> {
        self.issue_access_at(id, email, nickname, Utc::now())
    }

    fn issue_access_at(
        &self,
        id: i64,
        email: &str,
        nickname: &str,
        now: DateTime<Utc>,
    ) -> Result<String, TokenError> {
        let claims = AccessClaims {
            id,
            email: email.to_string(),
            nickname: nickname.to_string(),
            iat: now.timestamp(),
            exp: (now + self.access.ttl).timestamp(),
        };
        self.sign(TokenKind::Access, &claims)
    }

    pub fn issue_refresh(&self, id: i64) -> Result<String, TokenError> {
        self.issue_refresh_at(id, Utc::now())
    }

    fn issue_refresh_at(&self, id: i64, now: DateTime<Utc>) -> Result<String, TokenError> {
        let mut jti = [0u8; 16];
        OsRng.fill_bytes(&mut jti);

        let claims = RefreshClaims {
            id,
            jti: hex::encode(jti),
            iat: now.timestamp(),
            exp: (now + self.refresh.ttl).timestamp(),
        };
        self.sign(TokenKind::Refresh, &claims)
    }

    /// Mint a fresh access/refresh pair for a user.
    pub fn issue_pair(&self, id: i64, email: &str, nickname: &str) -> Result<TokenPair, TokenError> {
        Ok(TokenPair {
            access_token: self.issue_access(id, email, nickname)?,
            refresh_token: self.issue_refresh(id)?,
        })
    }

    pub fn verify_access(&self, token: &str) -> Result<AccessClaims, TokenError> {
        self.verify(TokenKind::Access, token)
    }

    #[allow(dead_code)]
    pub fn verify_refresh(&self, token: &str) -> Result<RefreshClaims, TokenError> {
        self.verify(TokenKind::Refresh, token)
    }
}
