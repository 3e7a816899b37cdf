//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Check that header and field names are usable on the wire
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::HeaderName;

use crate::config::schema::{ProxyConfig, StoreBackend};

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
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

/// Validate a parsed configuration, collecting every error.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_socket_addr(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.listener.max_connections == 0 {
        errors.push(ValidationError::new("listener.max_connections", "must be greater than 0"));
    }

    if config.timeouts.connect_secs == 0 {
        errors.push(ValidationError::new("timeouts.connect_secs", "must be greater than 0"));
    }
    if config.timeouts.fetch_secs == 0 {
        errors.push(ValidationError::new("timeouts.fetch_secs", "must be greater than 0"));
    }

    let api = &config.api;
    if !api.path_prefix.starts_with('/') {
        errors.push(ValidationError::new("api.path_prefix", "must start with '/'"));
    }
    if api.account_field.is_empty() {
        errors.push(ValidationError::new("api.account_field", "must not be empty"));
    }
    check_header_name(&mut errors, "api.session_header", &api.session_header);
    check_header_name(&mut errors, "api.request_id_header", &api.request_id_header);
    if api.max_body_size == 0 {
        errors.push(ValidationError::new("api.max_body_size", "must be greater than 0"));
    }
    if let Some(base) = &api.upstream_base {
        match url::Url::parse(base) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.has_host() => {}
            Ok(_) => errors.push(ValidationError::new("api.upstream_base", "must be an http(s) URL with a host")),
            Err(e) => errors.push(ValidationError::new("api.upstream_base", e.to_string())),
        }
    }

    if config.store.backend == StoreBackend::File && config.store.path.is_none() {
        errors.push(ValidationError::new("store.path", "required for the file backend"));
    }
    // Cache keys always contain the separator, so a key without it never collides.
    if config.store.availability_key.is_empty() || config.store.availability_key.contains('-') {
        errors.push(ValidationError::new(
            "store.availability_key",
            "must be non-empty and must not contain '-'",
        ));
    }

    if config.observability.metrics_enabled {
        check_socket_addr(&mut errors, "observability.metrics_address", &config.observability.metrics_address);
    }
    if config.admin.enabled {
        check_socket_addr(&mut errors, "admin.bind_address", &config.admin.bind_address);
        if config.admin.api_key.is_empty() {
            errors.push(ValidationError::new("admin.api_key", "must not be empty"));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_socket_addr(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if let Err(e) = value.parse::<SocketAddr>() {
        errors.push(ValidationError::new(field, format!("invalid socket address {:?}: {}", value, e)));
    }
}

fn check_header_name(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if HeaderName::from_bytes(value.as_bytes()).is_err() {
        errors.push(ValidationError::new(field, format!("invalid header name {:?}", value)));
    }
}
