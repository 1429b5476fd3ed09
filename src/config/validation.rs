//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses and the origin URL
//! - Validate value ranges (timeouts > 0, non-empty prefixes)
//! - Detect conflicting routes
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: PageSpeedConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;
use url::Url;

use crate::config::schema::PageSpeedConfig;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field}: invalid socket address {value:?}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("origin.url: {0}")]
    InvalidOrigin(String),

    #[error("lazy_load.media_prefix must be a non-empty path starting with '/' (got {0:?})")]
    InvalidMediaPrefix(String),

    #[error("lazy_load.crawler_bots[{0}] is blank")]
    BlankCrawlerBot(usize),

    #[error("route #{index}: {field} must not be empty")]
    EmptyRouteField { index: usize, field: &'static str },

    #[error("duplicate route name {0:?}")]
    DuplicateRoute(String),

    #[error("{0} must be greater than zero")]
    ZeroValue(&'static str),
}

/// Check a parsed configuration, collecting every problem found.
pub fn validate_config(config: &PageSpeedConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    check_address(&mut errors, "listener.bind_address", &config.listener.bind_address);
    if config.observability.metrics_enabled {
        check_address(
            &mut errors,
            "observability.metrics_address",
            &config.observability.metrics_address,
        );
    }

    match Url::parse(&config.origin.url) {
        Ok(url) if url.scheme() == "http" && url.host().is_some() => {}
        Ok(url) => errors.push(ValidationError::InvalidOrigin(format!(
            "unsupported URL {url} (expected http:// with a host)"
        ))),
        Err(e) => errors.push(ValidationError::InvalidOrigin(e.to_string())),
    }

    let lazy_load = &config.lazy_load;
    if lazy_load.media_prefix.is_empty() || !lazy_load.media_prefix.starts_with('/') {
        errors.push(ValidationError::InvalidMediaPrefix(lazy_load.media_prefix.clone()));
    }
    for (i, bot) in lazy_load.crawler_bots.entries().iter().enumerate() {
        if bot.trim().is_empty() {
            errors.push(ValidationError::BlankCrawlerBot(i));
        }
    }

    let mut names = HashSet::new();
    for (index, route) in config.routes.iter().enumerate() {
        for (field, value) in [
            ("name", &route.name),
            ("controller", &route.controller),
            ("action", &route.action),
        ] {
            if value.trim().is_empty() {
                errors.push(ValidationError::EmptyRouteField { index, field });
            }
        }
        if !route.name.is_empty() && !names.insert(route.name.as_str()) {
            errors.push(ValidationError::DuplicateRoute(route.name.clone()));
        }
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroValue("timeouts.request_secs"));
    }
    if config.origin.max_body_bytes == 0 {
        errors.push(ValidationError::ZeroValue("origin.max_body_bytes"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_address(errors: &mut Vec<ValidationError>, field: &'static str, value: &str) {
    if value.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field,
            value: value.to_string(),
        });
    }
}
