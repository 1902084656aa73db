// Common validation types and traits

use regex::Regex;

use super::error::ApiError;

#[derive(Debug)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

#[derive(Debug)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self {
            is_valid: true,
            errors: Vec::new(),
        }
    }

    pub fn add_error(&mut self, field: &str, message: &str) {
        self.is_valid = false;
        self.errors.push(ValidationError {
            field: field.to_string(),
            message: message.to_string(),
        });
    }

    pub fn has_error_for(&self, field: &str) -> bool {
        self.errors.iter().any(|e| e.field == field)
    }

    /// Turns a failed result into `ApiError::Validation`.
    pub fn into_result(self) -> Result<(), ApiError> {
        if self.is_valid {
            Ok(())
        } else {
            Err(ApiError::from(self))
        }
    }
}

impl Default for ValidationResult {
    fn default() -> Self {
        Self::new()
    }
}

pub trait Validator<T> {
    fn validate(&self, data: &T) -> ValidationResult;
}

/// Basic email shape: something, `@`, a domain containing a dot, no whitespace.
pub fn valid_email(email: &str) -> bool {
    Regex::new(r"^\S+@\S+\.\S+$").is_ok_and(|regex| regex.is_match(email))
}

/// Returns the trimmed value, or `None` when absent or blank.
pub fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_email_shapes() {
        assert!(valid_email("a@b.com"));
        assert!(valid_email("first.last+tag@mail.example.org"));
        assert!(!valid_email("no-at-sign.com"));
        assert!(!valid_email("user@localhost"));
        assert!(!valid_email("user name@example.com"));
        assert!(!valid_email(""));
    }

    #[test]
    fn test_non_blank() {
        assert_eq!(non_blank(Some("  abc ")), Some("abc"));
        assert_eq!(non_blank(Some("   ")), None);
        assert_eq!(non_blank(None), None);
    }

    #[test]
    fn test_into_result() {
        assert!(ValidationResult::new().into_result().is_ok());

        let mut failed = ValidationResult::new();
        failed.add_error("nickname", "Nickname is required.");
        assert!(failed.has_error_for("nickname"));
        assert!(matches!(failed.into_result(), Err(ApiError::Validation(_))));
    }
}
