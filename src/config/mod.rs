//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse, deserialize, environment overrides)
//!     → validation.rs (semantic checks)
//!     → PageSpeedConfig (validated, immutable)
//!     → handed to HttpServer, which builds the router and the filter
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    BotList, LazyLoadConfig, ListenerConfig, ObservabilityConfig, OriginConfig, PageSpeedConfig,
    RouteConfig, TimeoutConfig,
};
pub use validation::{validate_config, ValidationError};
