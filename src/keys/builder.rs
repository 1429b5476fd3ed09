//! Key string composition.
//!
//! A key is the prefix followed by `controller.`, `action#` and one
//! `name=value#` fragment per parameter, all lowercased. Absent values are
//! written as `<null>`.

use crate::routing::RouteValue;

/// Prefix used when none is configured.
pub const DEFAULT_KEY_PREFIX: &str = "_l4zyl04der.";

/// Literal written for absent parameter values.
const NULL_FRAGMENT: &str = "<null>";

/// Composes cache keys from normalized name/value fragments.
pub trait KeyBuilder: Send + Sync {
    /// Build a key from a controller, an optional action and optional parameters.
    fn build_key(
        &self,
        controller: Option<&str>,
        action: Option<&str>,
        parameters: Option<&[(String, RouteValue)]>,
    ) -> String;

    /// Key for a controller alone.
    fn build_controller_key(&self, controller: &str) -> String {
        self.build_key(Some(controller), None, None)
    }

    /// Key for a controller/action pair without parameters.
    fn build_action_key(&self, controller: &str, action: &str) -> String {
        self.build_key(Some(controller), Some(action), None)
    }
}

/// Default builder: a fixed prefix followed by lowercased fragments.
#[derive(Debug, Clone)]
pub struct PrefixKeyBuilder {
    prefix: String,
}

impl PrefixKeyBuilder {
    pub fn new() -> Self {
        Self::with_prefix(DEFAULT_KEY_PREFIX)
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn set_prefix(&mut self, prefix: impl Into<String>) {
        self.prefix = prefix.into();
    }

    /// A single `name=value#` fragment.
    pub fn build_fragment(&self, name: &str, value: &RouteValue) -> String {
        let mut out = String::new();
        push_fragment(&mut out, name, value);
        out
    }
}

impl Default for PrefixKeyBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyBuilder for PrefixKeyBuilder {
    fn build_key(
        &self,
        controller: Option<&str>,
        action: Option<&str>,
        parameters: Option<&[(String, RouteValue)]>,
    ) -> String {
        let mut key = String::with_capacity(self.prefix.len() + 64);
        key.push_str(&self.prefix);

        if let Some(controller) = controller {
            key.push_str(&controller.to_lowercase());
            key.push('.');
        }
        if let Some(action) = action {
            key.push_str(&action.to_lowercase());
            key.push('#');
        }
        for (name, value) in parameters.unwrap_or_default() {
            push_fragment(&mut key, name, value);
        }
        key
    }
}

fn push_fragment(out: &mut String, name: &str, value: &RouteValue) {
    out.push_str(&name.to_lowercase());
    out.push('=');
    match value.as_text() {
        Some(text) => out.push_str(&text.to_lowercase()),
        None => out.push_str(NULL_FRAGMENT),
    }
    out.push('#');
}
