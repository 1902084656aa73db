//! Password hashing and the configurable complexity rule

use std::str::FromStr;
use thiserror::Error;

/// bcrypt work factor used for every stored digest
pub const HASH_COST: u32 = 10;

const SPECIAL_CHARACTERS: &str = "!@#$%^&*_";

#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("bcrypt error: {0}")]
    Bcrypt(#[from] bcrypt::BcryptError),

    #[error("hashing task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

/// One-way password hasher. Digests embed their own salt and cost.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl Default for PasswordHasher {
    fn default() -> Self {
        Self { cost: HASH_COST }
    }
}

impl PasswordHasher {
    #[cfg(test)]
    pub fn with_cost(cost: u32) -> Self {
        Self { cost }
    }

    pub async fn hash(&self, plaintext: &str) -> Result<String, PasswordError> {
        let plaintext = plaintext.to_owned();
        let cost = self.cost;
        let digest = tokio::task::spawn_blocking(move || bcrypt::hash(plaintext, cost)).await??;
        Ok(digest)
    }

    pub async fn verify(&self, plaintext: &str, digest: &str) -> Result<bool, PasswordError> {
        let plaintext = plaintext.to_owned();
        let digest = digest.to_owned();
        let matches =
            tokio::task::spawn_blocking(move || bcrypt::verify(plaintext, &digest)).await??;
        Ok(matches)
    }
}

/// Password complexity rule, chosen once at startup from `PASSWORD_COMPLEXITY`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PasswordComplexity {
    /// At least 3 characters
    Simple,
    /// At least 8 characters with an uppercase letter, a digit and one of `!@#$%^&*_`
    Complex,
}

impl PasswordComplexity {
    pub fn is_acceptable(&self, password: &str) -> bool {
        match self {
            PasswordComplexity::Simple => password.chars().count() >= 3,
            PasswordComplexity::Complex => {
                password.chars().count() >= 8
                    && password.chars().any(|c| c.is_ascii_uppercase())
                    && password.chars().any(|c| c.is_ascii_digit())
                    && password.chars().any(|c| SPECIAL_CHARACTERS.contains(c))
            }
        }
    }

    /// Message returned to the caller when `is_acceptable` fails
    pub fn requirement(&self) -> &'static str {
        match self {
            PasswordComplexity::Simple => "Password must be at least 3 characters long.",
            PasswordComplexity::Complex => {
                "Password must be at least 8 characters long, include an uppercase letter, a number, and a special character."
            }
        }
    }
}

impl FromStr for PasswordComplexity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "simple" => Ok(PasswordComplexity::Simple),
            "complex" => Ok(PasswordComplexity::Complex),
            other => Err(format!(
                "unknown password complexity '{}', expected 'simple' or 'complex'",
                other
            )),
        }
    }
}
