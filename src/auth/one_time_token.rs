//! Single-use opaque tokens for email confirmation and password reset

use chrono::{DateTime, Duration, Utc};
use rand::{rngs::OsRng, RngCore};

/// Lifetime of confirmation and reset tokens
pub const ONE_TIME_TOKEN_TTL_SECS: i64 = 3600;

const TOKEN_BYTES: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneTimeToken {
    /// 32 lowercase hex characters
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Generate a fresh token expiring one hour from now.
#[cfg(test)]
pub fn generate() -> OneTimeToken {
    generate_at(Utc::now())
}

pub fn generate_at(now: DateTime<Utc>) -> OneTimeToken {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);

    OneTimeToken {
        token: hex::encode(bytes),
        expires_at: now + Duration::seconds(ONE_TIME_TOKEN_TTL_SECS),
    }
}

/// A stored token is usable only while its expiry is strictly in the future.
pub fn is_expired(expires_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    expires_at <= now
}
