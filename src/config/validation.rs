//! Configuration validation
//!
//! Validates the rt2jira configuration before any network call:
//! - Required fields are present and non-empty
//! - URL prefixes use http(s)
//! - The search suffix asks RT for the long record format
//! - The operator review gate is set

use super::rt2jira_config::Rt2JiraConfig;
use crate::Rt2JiraError;

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

/// Validate an rt2jira configuration, collecting every problem found
pub fn validate_config(config: &Rt2JiraConfig) -> ValidationResult {
    let mut errors = Vec::new();

    if !config.sanity.reviewed {
        errors.push(ValidationError::new(
            "sanity.reviewed",
            "Must be set to true after reviewing the configuration",
        ));
    }

    let required = [
        ("rt.api_url_prefix", &config.rt.api_url_prefix),
        ("rt.username", &config.rt.username),
        ("rt.password", &config.rt.password),
        ("rt.api_search_suffix", &config.rt.api_search_suffix),
        (
            "rt.url_ticket_display_prefix",
            &config.rt.url_ticket_display_prefix,
        ),
        ("jira.api_url_prefix", &config.jira.api_url_prefix),
        ("jira.username", &config.jira.username),
        ("jira.password", &config.jira.password),
        ("jira.project", &config.jira.project),
        ("jira.component", &config.jira.component),
        ("jira.issue_type", &config.jira.issue_type),
    ];
    for (field, value) in required {
        if value.trim().is_empty() {
            errors.push(ValidationError::new(field, "Cannot be empty"));
        }
    }

    for (field, url) in [
        ("rt.api_url_prefix", &config.rt.api_url_prefix),
        ("jira.api_url_prefix", &config.jira.api_url_prefix),
    ] {
        if !url.is_empty() && !is_http_url(url) {
            errors.push(ValidationError::new(
                field,
                format!("Invalid URL (expected http:// or https://): {}", url),
            ));
        }
    }

    if !config.rt.api_search_suffix.is_empty() && !config.rt.api_search_suffix.contains("format=l")
    {
        tracing::warn!(
            suffix = %config.rt.api_search_suffix,
            "rt.api_search_suffix does not request format=l; ticket records may lack fields"
        );
    }

    if config.jira.project.contains(char::is_whitespace) {
        errors.push(ValidationError::new(
            "jira.project",
            format!("Project key cannot contain whitespace: {}", config.jira.project),
        ));
    }

    if config.jira.component.contains('"') {
        errors.push(ValidationError::new(
            "jira.component",
            "Component name cannot contain double quotes",
        ));
    }

    if config.http.timeout_secs == 0 {
        errors.push(ValidationError::new(
            "http.timeout_secs",
            "Timeout must be greater than 0",
        ));
    }

    if !config.jira.verify {
        tracing::warn!("jira.verify is false; TLS certificates will not be checked");
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_http_url(url: &str) -> bool {
    url.starts_with("http://") || url.starts_with("https://")
}

/// Validate configuration and return a Result
pub fn validate_config_result(config: &Rt2JiraConfig) -> crate::Result<()> {
    validate_config(config).map_err(|errors| {
        let messages: Vec<String> = errors.iter().map(|e| e.to_string()).collect();
        Rt2JiraError::Config(format!(
            "Configuration validation failed:\n  - {}",
            messages.join("\n  - ")
        ))
    })
}
