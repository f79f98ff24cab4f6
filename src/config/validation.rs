//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate origins (http/https for the API, ws/wss for real-time)
//! - Validate value ranges (timeouts, TTL, page sizes > 0)
//! - Detect duplicate resource names and empty endpoint paths
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: FleetConfig → Result<(), Vec<ValidationError>>

use std::collections::HashSet;
use thiserror::Error;
use url::Url;

use crate::config::schema::FleetConfig;

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid {field} '{value}': {reason}")]
    InvalidUrl {
        field: &'static str,
        value: String,
        reason: String,
    },

    #[error("{0} must be greater than zero")]
    Zero(&'static str),

    #[error("duplicate resource '{0}'")]
    DuplicateResource(String),

    #[error("resource '{0}' has an endpoint with an empty path")]
    EmptyPath(String),
}

/// Validate a configuration, collecting every problem found.
pub fn validate_config(config: &FleetConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_url(&mut errors, "api.base_url", &config.api.base_url, &["http", "https"]);
    check_url(&mut errors, "realtime.url", &config.realtime.url, &["ws", "wss"]);

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::Zero("timeouts.request_secs"));
    }
    if config.cache.ttl_secs == 0 {
        errors.push(ValidationError::Zero("cache.ttl_secs"));
    }
    if config.pagination.page_size == 0 {
        errors.push(ValidationError::Zero("pagination.page_size"));
    }
    if config.pagination.max_pages == 0 {
        errors.push(ValidationError::Zero("pagination.max_pages"));
    }

    let mut seen = HashSet::new();
    for resource in &config.resources {
        if !seen.insert(resource.name.as_str()) {
            errors.push(ValidationError::DuplicateResource(resource.name.clone()));
        }
        if resource.page_size == Some(0) {
            errors.push(ValidationError::Zero("resources.page_size"));
        }
        let empty_path = std::iter::once(&resource.primary)
            .chain(resource.fallbacks.iter())
            .any(|e| e.path.trim().is_empty());
        if empty_path {
            errors.push(ValidationError::EmptyPath(resource.name.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_url(
    errors: &mut Vec<ValidationError>,
    field: &'static str,
    value: &str,
    schemes: &[&str],
) {
    match Url::parse(value) {
        Ok(url) if schemes.contains(&url.scheme()) => {}
        Ok(url) => errors.push(ValidationError::InvalidUrl {
            field,
            value: value.to_string(),
            reason: format!("unsupported scheme '{}'", url.scheme()),
        }),
        Err(e) => errors.push(ValidationError::InvalidUrl {
            field,
            value: value.to_string(),
            reason: e.to_string(),
        }),
    }
}
