//! Field validation shared by import row parsing and staged-record edits
//!
//! Validation failures are collected, not thrown: callers gather every
//! [`FieldError`] for a record and report them together.

use serde::Serialize;
use thiserror::Error;

/// Maximum length accepted for any free-text field.
pub const MAX_TEXT_LENGTH: usize = 512;

/// A single field-level validation failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[error("{field}: {message}")]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Validate a required free-text field: non-blank after trimming, bounded
/// length.
pub fn validate_required_text(field: &str, value: &str) -> Result<(), FieldError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(FieldError::new(field, "is required and cannot be empty"));
    }
    if trimmed.chars().count() > MAX_TEXT_LENGTH {
        return Err(FieldError::new(
            field,
            format!("must be at most {} characters", MAX_TEXT_LENGTH),
        ));
    }
    Ok(())
}

/// Validate an optional free-text field: length-bounded when present.
pub fn validate_optional_text(field: &str, value: Option<&str>) -> Result<(), FieldError> {
    match value {
        Some(text) if text.chars().count() > MAX_TEXT_LENGTH => Err(FieldError::new(
            field,
            format!("must be at most {} characters", MAX_TEXT_LENGTH),
        )),
        _ => Ok(()),
    }
}

/// Validate an estimated cost: finite and non-negative.
pub fn validate_cost(field: &str, value: f64) -> Result<(), FieldError> {
    if !value.is_finite() {
        return Err(FieldError::new(field, "must be a finite number"));
    }
    if value < 0.0 {
        return Err(FieldError::new(field, "must be non-negative"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_text_rejects_blank() {
        assert!(validate_required_text("name_ar", "مسجد النور").is_ok());
        assert!(validate_required_text("name_ar", "   ").is_err());
        assert!(validate_required_text("name_ar", "").is_err());
    }

    #[test]
    fn test_required_text_rejects_overlong() {
        let long = "م".repeat(MAX_TEXT_LENGTH + 1);
        let err = validate_required_text("notes", &long).unwrap_err();
        assert_eq!(err.field, "notes");
    }

    #[test]
    fn test_optional_text() {
        assert!(validate_optional_text("address", None).is_ok());
        assert!(validate_optional_text("address", Some("شارع الجامع")).is_ok());
        let long = "x".repeat(MAX_TEXT_LENGTH + 1);
        assert!(validate_optional_text("address", Some(&long)).is_err());
    }

    #[test]
    fn test_cost_bounds() {
        assert!(validate_cost("estimated_cost", 0.0).is_ok());
        assert!(validate_cost("estimated_cost", 250_000.5).is_ok());
        assert!(validate_cost("estimated_cost", -1.0).is_err());
        assert!(validate_cost("estimated_cost", f64::NAN).is_err());
        assert!(validate_cost("estimated_cost", f64::INFINITY).is_err());
    }
}
