//! Input validation for collection names, applications and labels.

use crate::{Result, SecretServiceError};

/// Maximum allowed length for any name.
const MAX_NAME_LENGTH: usize = 255;

/// Validates a collection name.
///
/// The name becomes the last element of a D-Bus object path, so only
/// ASCII letters, digits and `_` are accepted.
///
/// # Errors
///
/// Returns [`SecretServiceError::InvalidName`] if validation fails.
///
/// # Example
///
/// ```
/// use lkru::validation::validate_collection_name;
///
/// assert!(validate_collection_name("login").is_ok());
/// assert!(validate_collection_name("work_2").is_ok());
///
/// assert!(validate_collection_name("").is_err());
/// assert!(validate_collection_name("my-keyring").is_err());
/// assert!(validate_collection_name("../aliases/default").is_err());
/// ```
pub fn validate_collection_name(name: &str) -> Result<()> {
    check_length("collection name", name)?;

    if let Some(c) = name
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || *c == '_'))
    {
        return Err(SecretServiceError::InvalidName(format!(
            "collection name '{}' contains '{}' (allowed: A-Z a-z 0-9 _)",
            name, c
        )));
    }

    Ok(())
}

/// Validates an attribute value such as the application namespace or a label.
///
/// Checks for:
/// - Empty values
/// - Excessive length (>255 characters)
/// - Null bytes
/// - Control characters
///
/// # Errors
///
/// Returns [`SecretServiceError::InvalidName`] if validation fails.
pub fn validate_attribute_value(kind: &str, value: &str) -> Result<()> {
    check_length(kind, value)?;

    if value.contains('\0') {
        return Err(SecretServiceError::InvalidName(format!(
            "{} contains null byte",
            kind
        )));
    }

    if value.chars().any(|c| c.is_control()) {
        return Err(SecretServiceError::InvalidName(format!(
            "{} contains control characters",
            kind
        )));
    }

    Ok(())
}

fn check_length(kind: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        return Err(SecretServiceError::InvalidName(format!(
            "{} cannot be empty",
            kind
        )));
    }

    if value.len() > MAX_NAME_LENGTH {
        return Err(SecretServiceError::InvalidName(format!(
            "{} exceeds maximum length of {} characters",
            kind, MAX_NAME_LENGTH
        )));
    }

    Ok(())
}
