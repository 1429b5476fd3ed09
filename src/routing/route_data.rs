//! Routing state attached to a request.
//!
//! # Responsibilities
//! - Hold the controller/action/extra values a request was resolved to
//! - Hold routing metadata (data tokens) such as the area
//! - Case-insensitive name lookup, insertion order preserved
//!
//! # Design Decisions
//! - Values are an ordered list, not a map: key derivation depends on order
//! - Provider placeholders are a distinct variant so they can be filtered
//!   without inspecting the string form

use std::fmt;

/// Route value name holding the controller.
pub const CONTROLLER: &str = "controller";
/// Route value name holding the action.
pub const ACTION: &str = "action";
/// Data token name holding the area.
pub const AREA: &str = "area";

/// A single route value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteValue {
    /// Plain string value.
    Text(String),
    /// Explicitly absent value.
    Null,
    /// Placeholder injected by the host for value providers. Never part of a key.
    ValueProvider,
}

impl RouteValue {
    /// String form of the value, `None` for `Null` and provider placeholders.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            RouteValue::Text(s) => Some(s),
            RouteValue::Null | RouteValue::ValueProvider => None,
        }
    }

    pub fn is_value_provider(&self) -> bool {
        matches!(self, RouteValue::ValueProvider)
    }
}

impl fmt::Display for RouteValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RouteValue::Text(s) => f.write_str(s),
            RouteValue::Null => f.write_str("<null>"),
            RouteValue::ValueProvider => f.write_str("<provider>"),
        }
    }
}

impl From<&str> for RouteValue {
    fn from(value: &str) -> Self {
        RouteValue::Text(value.to_string())
    }
}

impl From<String> for RouteValue {
    fn from(value: String) -> Self {
        RouteValue::Text(value)
    }
}

impl<T: Into<RouteValue>> From<Option<T>> for RouteValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(RouteValue::Null)
    }
}

/// Ordered name/value pairs with case-insensitive lookup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteValues {
    entries: Vec<(String, RouteValue)>,
}

impl RouteValues {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a value. Replacing keeps the original position.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<RouteValue>) {
        let name = name.into();
        let value = value.into();
        match self.position(&name) {
            Some(i) => self.entries[i].1 = value,
            None => self.entries.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<&RouteValue> {
        self.position(name).map(|i| &self.entries[i].1)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RouteValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries
            .iter()
            .position(|(k, _)| k.eq_ignore_ascii_case(name))
    }
}

impl<K, V> FromIterator<(K, V)> for RouteValues
where
    K: Into<String>,
    V: Into<RouteValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut values = RouteValues::new();
        for (k, v) in iter {
            values.insert(k, v);
        }
        values
    }
}

/// The routing result for one request.
///
/// Can be inserted into request extensions by an embedding application, in
/// which case it takes precedence over the configured route table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteData {
    pub values: RouteValues,
    pub data_tokens: RouteValues,
}

impl RouteData {
    /// Route data for a controller/action pair.
    pub fn new(controller: impl Into<String>, action: impl Into<String>) -> Self {
        let mut values = RouteValues::new();
        values.insert(CONTROLLER, controller.into());
        values.insert(ACTION, action.into());
        Self {
            values,
            data_tokens: RouteValues::new(),
        }
    }

    /// Builder-style helper to add an extra route value.
    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<RouteValue>) -> Self {
        self.values.insert(name, value);
        self
    }

    /// Builder-style helper to set the area data token.
    pub fn with_area(mut self, area: impl Into<String>) -> Self {
        self.data_tokens.insert(AREA, area.into());
        self
    }

    pub fn controller(&self) -> Option<&str> {
        self.values.get(CONTROLLER).and_then(RouteValue::as_text)
    }

    pub fn action(&self) -> Option<&str> {
        self.values.get(ACTION).and_then(RouteValue::as_text)
    }

    pub fn area(&self) -> Option<&str> {
        self.data_tokens.get(AREA).and_then(RouteValue::as_text)
    }
}
