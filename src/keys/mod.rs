//! Per-request key derivation.
//!
//! # Data Flow
//! ```text
//! RouteData (controller, action, values, data tokens)
//!     → generator.rs (filter reserved names and provider placeholders,
//!                     append the area)
//!     → builder.rs (prefix + lowercased fragments)
//!     → CacheKey
//! ```
//!
//! # Design Decisions
//! - Keys are pure functions of RouteData; computing twice gives the same key
//! - A key only correlates the BEFORE and AFTER phases of one request;
//!   nothing is cached under it

use std::fmt;

pub mod builder;
pub mod generator;

pub use builder::{KeyBuilder, PrefixKeyBuilder, DEFAULT_KEY_PREFIX};
pub use generator::{KeyGenerator, RouteKeyGenerator};

/// Opaque key derived from a request's routing state.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}
