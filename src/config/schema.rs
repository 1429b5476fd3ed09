//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the proxy.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::html::rewriter::{DEFAULT_MEDIA_PREFIX, DEFAULT_WEBP_QUERY};
use crate::interceptor::bots::BOT_LIST_SEPARATOR;
use crate::keys::DEFAULT_KEY_PREFIX;

/// Root configuration for the lazy-load proxy.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct PageSpeedConfig {
    /// Listener configuration.
    pub listener: ListenerConfig,

    /// Origin application the proxy renders pages from.
    pub origin: OriginConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Markup rewriting settings.
    pub lazy_load: LazyLoadConfig,

    /// Route definitions mapping requests to controller/action pairs.
    pub routes: Vec<RouteConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Origin configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct OriginConfig {
    /// Base URL of the origin (e.g., "http://127.0.0.1:3000").
    pub url: String,

    /// Largest response body buffered for rewriting.
    pub max_body_bytes: usize,
}

impl Default for OriginConfig {
    fn default() -> Self {
        Self {
            url: "http://127.0.0.1:3000".to_string(),
            max_body_bytes: 8 * 1024 * 1024,
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Connection establishment timeout in seconds.
    pub connect_secs: u64,

    /// Request timeout (total time for request/response) in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 5,
            request_secs: 30,
        }
    }
}

/// Crawler list as written in the file: `"Googlebot;Bingbot"` or
/// `["Googlebot", "Bingbot"]`.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum BotList {
    Joined(String),
    List(Vec<String>),
}

impl BotList {
    /// Entries exactly as written. Empty segments of a joined string
    /// (`"Googlebot;"`) are dropped; blank array entries are kept so
    /// validation can report them.
    pub fn entries(&self) -> Vec<String> {
        match self {
            BotList::Joined(joined) => joined
                .split(BOT_LIST_SEPARATOR)
                .filter(|b| !b.is_empty())
                .map(str::to_string)
                .collect(),
            BotList::List(list) => list.clone(),
        }
    }
}

impl Default for BotList {
    fn default() -> Self {
        BotList::List(vec!["Googlebot".to_string(), "Screaming Frog".to_string()])
    }
}

/// Lazy-load rewriting configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LazyLoadConfig {
    /// Disable to proxy pages untouched.
    pub enabled: bool,

    /// Path prefix of images that get the responsive WebP treatment.
    pub media_prefix: String,

    /// User-agent substrings that bypass rewriting.
    pub crawler_bots: BotList,

    /// Prefix of generated cache keys.
    pub key_prefix: String,

    /// Query appended to media URLs for the WebP source.
    pub webp_query: String,

    /// Request header marking a partial (child) render.
    pub partial_render_header: String,
}

impl Default for LazyLoadConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            media_prefix: DEFAULT_MEDIA_PREFIX.to_string(),
            crawler_bots: BotList::default(),
            key_prefix: DEFAULT_KEY_PREFIX.to_string(),
            webp_query: DEFAULT_WEBP_QUERY.to_string(),
            partial_render_header: "x-partial-render".to_string(),
        }
    }
}

/// Route configuration mapping requests to a controller/action pair.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier for logging.
    pub name: String,

    /// Host header to match (case-insensitive, port ignored).
    pub host: Option<String>,

    /// Path prefix to match.
    pub path_prefix: Option<String>,

    pub controller: String,

    pub action: String,

    /// Optional area, carried as a data token.
    pub area: Option<String>,

    /// Route priority (higher = checked first).
    #[serde(default)]
    pub priority: u32,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
