/// Validate a required text field with a max length in characters.
pub fn validate_required(value: &str, field_name: &str, max_len: usize) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Some(format!("{field_name} is required"));
    }
    if trimmed.chars().count() > max_len {
        return Some(format!("{field_name} must be at most {max_len} characters"));
    }
    None
}

/// Validate an optional text field with a max length (empty is OK).
pub fn validate_optional(value: Option<&str>, field_name: &str, max_len: usize) -> Option<String> {
    match value {
        Some(v) if v.trim().chars().count() > max_len => {
            Some(format!("{field_name} must be at most {max_len} characters"))
        }
        _ => None,
    }
}

/// Join collected messages into a single `Validation` error, if any.
pub fn into_result(errors: Vec<String>) -> Result<(), crate::errors::AppError> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(crate::errors::AppError::Validation(errors.join("; ")))
    }
}

/// Trimmed value, or `None` when blank.
pub fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_string)
}
