use super::ValidationError;

const MAX_NAME_CHARS: usize = 100;

/// Validates a display name.
///
/// Whitespace is trimmed before checking, so a blank string and an
/// all-spaces string fail the same way. Length is counted in characters,
/// matching the limit quoted to the user.
pub fn validate_name(name: &str) -> Result<(), ValidationError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::NameEmpty);
    }
    if trimmed.chars().count() > MAX_NAME_CHARS {
        return Err(ValidationError::NameTooLong);
    }
    Ok(())
}
