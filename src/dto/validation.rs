//! Validation helpers for DTOs.

use validator::ValidationError;

/// Rejects strings made only of whitespace.
///
/// ```ignore
/// validate_not_blank("great pun") // Ok
/// validate_not_blank("  \n")      // Err
/// ```
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value must contain at least one non-whitespace character".into());
        return Err(err);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_text() {
        assert!(validate_not_blank("nice product").is_ok());
        assert!(validate_not_blank("  padded  ").is_ok());
    }

    #[test]
    fn rejects_blank() {
        assert!(validate_not_blank("").is_err());
        assert!(validate_not_blank(" \t\n").is_err());
    }
}
