//! Item name validation.
//!
//! Names arrive from archives built on another instance, so they are checked
//! before they are turned into directories or passed to the host.

use std::collections::HashSet;
use std::sync::LazyLock;

/// Characters the host refuses in item names.
pub static UNSAFE_CHARS: LazyLock<HashSet<char>> = LazyLock::new(|| {
    [
        '/', '\\', ':', '?', '*', '"', '<', '>', '|', '[', ']', ';', '%', '!', '@', '#', '$',
        '^', '&',
    ]
    .into_iter()
    .collect()
});

/// Check a single item name (one path segment).
///
/// # Errors
///
/// Returns a human-readable reason when the name is not acceptable.
pub fn validate_item_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("name is empty".to_string());
    }
    if name == "." || name == ".." {
        return Err("name is a relative path marker".to_string());
    }
    if name.trim() != name {
        return Err("name has leading or trailing whitespace".to_string());
    }
    if let Some(c) = name.chars().find(|c| UNSAFE_CHARS.contains(c)) {
        return Err(format!("'{c}' is an unsafe character"));
    }
    if name.chars().any(char::is_control) {
        return Err("name contains control characters".to_string());
    }
    Ok(())
}

/// Check every segment of a full name.
///
/// # Errors
///
/// Returns the first offending segment and its reason.
pub fn validate_full_name(full_name: &str) -> Result<(), (String, String)> {
    for segment in full_name.split('/') {
        validate_item_name(segment).map_err(|reason| (segment.to_string(), reason))?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert!(validate_item_name("build-main").is_ok());
        assert!(validate_item_name("Deploy (prod)").is_ok());
        assert!(validate_item_name("ünïcode_job.v2").is_ok());
    }

    #[test]
    fn test_invalid_names() {
        assert!(validate_item_name("").is_err());
        assert!(validate_item_name(".").is_err());
        assert!(validate_item_name("..").is_err());
        assert!(validate_item_name(" padded").is_err());
        assert!(validate_item_name("a/b").is_err());
        assert!(validate_item_name("a\\b").is_err());
        assert!(validate_item_name("what?").is_err());
        assert!(validate_item_name("tab\there").is_err());
    }

    #[test]
    fn test_validate_full_name() {
        assert!(validate_full_name("A/B/job").is_ok());
        let err = validate_full_name("A/../job").unwrap_err();
        assert_eq!(err.0, "..");
        assert!(validate_full_name("A//job").is_err());
    }
}
