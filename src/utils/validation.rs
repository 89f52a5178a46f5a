//! Client-side validation of user input, applied before any backend call.

use regex::Regex;
use std::sync::OnceLock;
use thiserror::Error;

/// A field-level validation failure with a message fit for display.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

const MAX_NAME_LEN: usize = 255;

fn invalid_name_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"[\\/:*?"<>|]"#).expect("static regex"))
}

fn non_root_repo_path() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"/blob/|/tree/|/commit/").expect("static regex"))
}

fn archive_suffix() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\.(zip|tar|gz|rar|7z)$").expect("static regex"))
}

/// Validates a remote repository URL and returns it trimmed.
pub fn validate_repo_url(input: &str) -> Result<String, ValidationError> {
    const FIELD: &str = "url";
    let url = input.trim();

    if url.is_empty() {
        return Err(ValidationError::new(FIELD, "URL cannot be empty"));
    }
    let Some(rest) = url.strip_prefix("https://") else {
        if url.contains("://") {
            return Err(ValidationError::new(FIELD, "URL must start with https://"));
        }
        return Err(ValidationError::new(FIELD, "Invalid URL format"));
    };

    let (host, path) = match rest.split_once('/') {
        Some((host, path)) => (host, path),
        None => (rest, ""),
    };
    if host.is_empty() || host.contains(char::is_whitespace) {
        return Err(ValidationError::new(FIELD, "Invalid URL format"));
    }

    let path = path.split(['?', '#']).next().unwrap_or_default();
    if path.split('/').filter(|s| !s.is_empty()).count() < 2 {
        return Err(ValidationError::new(
            FIELD,
            "Incomplete repository path. Example: https://github.com/user/repo",
        ));
    }
    if non_root_repo_path().is_match(url) {
        return Err(ValidationError::new(
            FIELD,
            "Please provide the root repository URL (remove /tree/, /blob/, etc.)",
        ));
    }
    if archive_suffix().is_match(url) {
        return Err(ValidationError::new(FIELD, "Cannot clone archive files directly"));
    }

    Ok(url.to_string())
}

/// Validates a new artifact name used by rename.
pub fn validate_artifact_name(input: &str) -> Result<(), ValidationError> {
    const FIELD: &str = "name";

    if input.is_empty() {
        return Err(ValidationError::new(FIELD, "Name cannot be empty"));
    }
    if input.chars().count() > MAX_NAME_LEN {
        return Err(ValidationError::new(
            FIELD,
            "Name cannot be longer than 255 characters",
        ));
    }
    if invalid_name_chars().is_match(input) {
        return Err(ValidationError::new(FIELD, "Invalid characters in filename"));
    }
    Ok(())
}

/// Validates a preset name; the same character rules apply as for artifacts.
pub fn validate_preset_name(input: &str) -> Result<(), ValidationError> {
    if input.trim().is_empty() {
        return Err(ValidationError::new("preset", "Preset name cannot be empty"));
    }
    validate_artifact_name(input).map_err(|e| ValidationError::new("preset", e.message))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_accepts_root_repository_urls() {
        assert_eq!(
            validate_repo_url("  https://github.com/user/repo ").unwrap(),
            "https://github.com/user/repo"
        );
        assert!(validate_repo_url("https://gitlab.com/group/sub/repo.git").is_ok());
        assert!(validate_repo_url("https://localhost/user/repo").is_ok());
        assert!(validate_repo_url("https://git.internal:8443/team/repo").is_ok());
    }

    #[test]
    fn test_rejects_malformed_repository_urls() {
        let message = |url: &str| validate_repo_url(url).unwrap_err().message;

        assert_eq!(message(""), "URL cannot be empty");
        assert_eq!(message("http://github.com/user/repo"), "URL must start with https://");
        assert_eq!(message("github.com/user/repo"), "Invalid URL format");
        assert_eq!(
            message("https://github.com/user"),
            "Incomplete repository path. Example: https://github.com/user/repo"
        );
        assert_eq!(
            message("https://github.com/user/repo/tree/main"),
            "Please provide the root repository URL (remove /tree/, /blob/, etc.)"
        );
        assert_eq!(
            message("https://example.com/user/repo.ZIP"),
            "Cannot clone archive files directly"
        );
    }

    #[test]
    fn test_artifact_name_rules() {
        assert!(validate_artifact_name("my export 2025").is_ok());
        assert_eq!(
            validate_artifact_name("").unwrap_err().message,
            "Name cannot be empty"
        );
        assert_eq!(
            validate_artifact_name("a/b").unwrap_err().message,
            "Invalid characters in filename"
        );
        assert!(validate_artifact_name(&"x".repeat(256)).is_err());
        assert!(validate_artifact_name(&"x".repeat(255)).is_ok());
    }

    #[test]
    fn test_preset_name_reports_preset_field() {
        let err = validate_preset_name("   ").unwrap_err();
        assert_eq!(err.field, "preset");
        assert_eq!(validate_preset_name("bad:name").unwrap_err().field, "preset");
    }
}
