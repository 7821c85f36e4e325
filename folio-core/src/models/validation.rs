//! Validation error types and shared field checks

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

/// Loose email shape: something@something.tld, no whitespace
static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("invalid email regex")
});

/// Rejected field in an insert or patch payload
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    #[error("{field} exceeds maximum length of {max} characters")]
    TooLong { field: &'static str, max: usize },

    /// Wrong shape, e.g. an email without a domain or a relative URL
    #[error("{field}: {reason}")]
    InvalidFormat { field: &'static str, reason: &'static str },

    /// Unknown status, type or priority
    #[error("invalid {field} value: '{value}'")]
    InvalidVariant { field: &'static str, value: String },

    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: &'static str, min: i64, max: i64 },
}

/// Trimmed, non-empty text no longer than `max` characters.
pub fn required_text(field: &'static str, value: &str, max: usize) -> Result<(), ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::Empty { field });
    }
    if trimmed.chars().count() > max {
        return Err(ValidationError::TooLong { field, max });
    }
    Ok(())
}

/// Optional text: absent is fine, present must satisfy [`required_text`].
pub fn optional_text(
    field: &'static str,
    value: Option<&str>,
    max: usize,
) -> Result<(), ValidationError> {
    match value {
        Some(v) => required_text(field, v, max),
        None => Ok(()),
    }
}

pub fn email(field: &'static str, value: &str) -> Result<(), ValidationError> {
    required_text(field, value, 320)?;
    if !EMAIL_RE.is_match(value.trim()) {
        return Err(ValidationError::InvalidFormat {
            field,
            reason: "must look like name@example.com",
        });
    }
    Ok(())
}

/// Absolute http(s) link, if present.
pub fn optional_link(field: &'static str, value: Option<&str>) -> Result<(), ValidationError> {
    let Some(value) = value else {
        return Ok(());
    };
    required_text(field, value, 2048)?;
    let value = value.trim();
    if !(value.starts_with("https://") || value.starts_with("http://")) {
        return Err(ValidationError::InvalidFormat {
            field,
            reason: "must be an absolute http(s) URL",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = ValidationError::TooLong {
            field: "title",
            max: 256,
        };
        assert_eq!(
            err.to_string(),
            "title exceeds maximum length of 256 characters"
        );

        let err = ValidationError::OutOfRange {
            field: "rating",
            min: 1,
            max: 5,
        };
        assert_eq!(err.to_string(), "rating must be between 1 and 5");
    }

    #[test]
    fn required_text_rejects_blank() {
        assert_eq!(
            required_text("name", "   ", 10),
            Err(ValidationError::Empty { field: "name" })
        );
        assert!(required_text("name", "Ada", 10).is_ok());
        assert!(matches!(
            required_text("name", "abcdefghijk", 10),
            Err(ValidationError::TooLong { max: 10, .. })
        ));
    }

    #[test]
    fn email_shape() {
        assert!(email("email", "a@x.com").is_ok());
        assert!(email("email", "not-an-email").is_err());
        assert!(email("email", "a b@x.com").is_err());
    }

    #[test]
    fn links_must_be_absolute() {
        assert!(optional_link("live_url", None).is_ok());
        assert!(optional_link("live_url", Some("https://example.com")).is_ok());
        assert!(matches!(
            optional_link("live_url", Some("example.com")),
            Err(ValidationError::InvalidFormat { .. })
        ));
    }
}
