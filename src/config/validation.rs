//! Configuration validation
//!
//! Validates FollowGraph configuration for correctness:
//! - A usable caller login
//! - A parsable API root
//! - Sensible paging and timeout values

use super::followgraph_config::FollowGraphConfig;
use crate::FollowGraphError;

/// Validation error details
#[derive(Debug, Clone)]
pub struct ValidationError {
    pub field: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Validation result
pub type ValidationResult = std::result::Result<(), Vec<ValidationError>>;

/// Check that a login can be placed in a backend path segment
pub fn check_login(login: &str) -> std::result::Result<(), String> {
    if login.trim().is_empty() {
        return Err("login must not be empty".to_string());
    }
    if login.chars().any(|c| c.is_whitespace() || c == '/' || c == '?' || c == '#') {
        return Err(format!(
            "login '{}' contains characters not allowed in a handle",
            login
        ));
    }
    Ok(())
}

/// Validate a FollowGraph configuration, collecting every problem
pub fn validate_config(config: &FollowGraphConfig) -> ValidationResult {
    let mut errors = Vec::new();

    if let Err(message) = check_login(&config.login) {
        errors.push(ValidationError::new("login", message));
    }

    let api_url = config.api_url.trim();
    if !(api_url.starts_with("https://") || api_url.starts_with("http://")) {
        errors.push(ValidationError::new(
            "api_url",
            format!("API URL must be http(s): {}", config.api_url),
        ));
    } else if reqwest::Url::parse(api_url).is_err() {
        errors.push(ValidationError::new(
            "api_url",
            format!("API URL is not a valid URL: {}", config.api_url),
        ));
    }

    if config.server.default_per_page == 0 {
        errors.push(ValidationError::new(
            "server.default_per_page",
            "Page size must be greater than 0",
        ));
    }

    if config.request_timeout_secs == 0 {
        errors.push(ValidationError::new(
            "request_timeout_secs",
            "Timeout must be greater than 0",
        ));
    }

    if config.server.listen.parse::<std::net::SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "server.listen",
            format!("Invalid listen address: {}", config.server.listen),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Validate and convert to a single crate error
pub fn validate_config_result(config: &FollowGraphConfig) -> crate::Result<()> {
    validate_config(config).map_err(|errors| {
        let joined = errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        FollowGraphError::Config(format!("Invalid configuration: {}", joined))
    })
}
