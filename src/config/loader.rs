//! Configuration loading from disk.

use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::config::schema::{BotList, PageSpeedConfig};
use crate::config::validation::{validate_config, ValidationError};

/// Environment variable overriding `lazy_load.crawler_bots` (`;`-separated).
pub const CRAWLER_BOTS_ENV: &str = "PAGESPEED_CRAWLER_BOTS";

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("validation failed: {}", join(.0))]
    Validation(Vec<ValidationError>),
}

fn join(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<PageSpeedConfig, ConfigError> {
    let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let mut config = parse_config(&content)?;

    apply_env_overrides(&mut config, std::env::var(CRAWLER_BOTS_ENV).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Parse a TOML document without validating it.
pub fn parse_config(content: &str) -> Result<PageSpeedConfig, ConfigError> {
    Ok(toml::from_str(content)?)
}

/// Apply the crawler-list override when it is set and non-empty.
pub fn apply_env_overrides(config: &mut PageSpeedConfig, crawler_bots: Option<String>) {
    if let Some(bots) = crawler_bots.filter(|b| !b.trim().is_empty()) {
        tracing::debug!(bots = %bots, "Crawler list overridden from environment");
        config.lazy_load.crawler_bots = BotList::Joined(bots);
    }
}
