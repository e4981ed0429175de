//! Validation for names that map one-to-one onto files in a flat directory
//! (script filenames and store keys).

use crate::error::CoreError;

/// Maximum length of a script filename or store key in bytes.
pub const MAX_NAME_LENGTH: usize = 255;

/// Validate that `name` can be joined onto a directory without escaping it.
///
/// Rejects empty names, `.`/`..`, path separators, NUL bytes, and names
/// longer than [`MAX_NAME_LENGTH`]. `what` names the thing in the error.
pub fn validate_plain_name(what: &str, name: &str) -> Result<(), CoreError> {
    if name.is_empty() {
        return Err(CoreError::Validation(format!("{what} must not be empty")));
    }
    if name.len() > MAX_NAME_LENGTH {
        return Err(CoreError::Validation(format!(
            "{what} exceeds maximum length of {MAX_NAME_LENGTH} bytes (got {})",
            name.len()
        )));
    }
    if name == "." || name == ".." {
        return Err(CoreError::Validation(format!("{what} '{name}' is reserved")));
    }
    if name.contains(['/', '\\', '\0']) {
        return Err(CoreError::Validation(format!(
            "{what} '{name}' must not contain path separators"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_names() {
        assert!(validate_plain_name("key", "cookie_token").is_ok());
        assert!(validate_plain_name("script", "check-in.script").is_ok());
        assert!(validate_plain_name("script", "..hidden").is_ok());
    }

    #[test]
    fn rejects_traversal() {
        assert!(validate_plain_name("key", "..").is_err());
        assert!(validate_plain_name("key", "../x").is_err());
        assert!(validate_plain_name("key", "a\\b").is_err());
    }

    #[test]
    fn rejects_overlong() {
        let long = "x".repeat(MAX_NAME_LENGTH + 1);
        let err = validate_plain_name("key", &long).expect_err("too long");
        assert!(err.to_string().contains("maximum length"));
    }
}
