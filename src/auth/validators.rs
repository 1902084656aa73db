// src/auth/validators.rs
use regex::Regex;

use super::models::RegisterRequest;
use crate::common::validation::{non_blank, valid_email, ValidationResult, Validator};

pub const NICKNAME_RULE: &str =
    "Nickname should be 3-15 characters long and contain only letters, numbers, underscores, or dashes.";

pub fn valid_nickname(nickname: &str) -> bool {
    Regex::new(r"^[a-zA-Z0-9_-]{3,15}$").is_ok_and(|regex| regex.is_match(nickname))
}

/// Shape checks on a registration body. Policies, passwords and
/// uniqueness need the store and are checked by the service.
pub struct RegistrationValidator;

impl Validator<RegisterRequest> for RegistrationValidator {
    fn validate(&self, data: &RegisterRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        match data.email.as_deref() {
            Some(email) if valid_email(email) => {}
            _ => {
                result.add_error("email", "A valid email is required.");
                return result;
            }
        }

        match non_blank(data.nickname.as_deref()) {
            None => result.add_error("nickname", "Nickname is required."),
            Some(nickname) if !valid_nickname(nickname) => {
                result.add_error("nickname", NICKNAME_RULE)
            }
            Some(_) => {}
        }

        result
    }
}
