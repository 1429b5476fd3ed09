//! Route lookup.
//!
//! # Responsibilities
//! - Store compiled routes
//! - Resolve a request to its `RouteData`
//! - Return explicit no-match
//!
//! # Design Decisions
//! - Immutable after construction (thread-safe without locks)
//! - O(n) scan in priority order, first match wins
//! - The path remainder after the prefix becomes the `path` route value

use crate::config::RouteConfig;
use crate::routing::matcher::{AndMatcher, HostMatcher, Matcher, PathPrefixMatcher, RequestTarget};
use crate::routing::route_data::RouteData;

/// Route value name holding the path remainder.
pub const PATH: &str = "path";

/// A compiled route.
#[derive(Debug)]
pub struct Route {
    pub name: String,
    pub controller: String,
    pub action: String,
    pub area: Option<String>,
    pub priority: u32,
    prefix: Option<String>,
    matcher: AndMatcher,
}

impl Route {
    /// Compile a route from its configuration.
    pub fn from_config(config: &RouteConfig) -> Self {
        let mut matchers: Vec<Box<dyn Matcher>> = Vec::new();
        if let Some(host) = &config.host {
            matchers.push(Box::new(HostMatcher::new(host.clone())));
        }
        if let Some(prefix) = &config.path_prefix {
            matchers.push(Box::new(PathPrefixMatcher::new(prefix.clone())));
        }

        Self {
            name: config.name.clone(),
            controller: config.controller.clone(),
            action: config.action.clone(),
            area: config.area.clone(),
            priority: config.priority,
            prefix: config.path_prefix.clone(),
            matcher: AndMatcher::new(matchers),
        }
    }

    fn route_data(&self, target: &RequestTarget<'_>) -> RouteData {
        let mut data = RouteData::new(self.controller.clone(), self.action.clone());

        let remainder = match &self.prefix {
            Some(prefix) => target.path.get(prefix.len()..).unwrap_or_default(),
            None => target.path,
        };
        let remainder = remainder.trim_matches('/');
        if !remainder.is_empty() {
            data.values.insert(PATH, remainder);
        }

        if let Some(area) = &self.area {
            data = data.with_area(area.clone());
        }
        data
    }
}

/// Immutable route table.
#[derive(Debug, Default)]
pub struct Router {
    routes: Vec<Route>,
}

impl Router {
    /// Compile routes, highest priority first. Ties keep configuration order.
    pub fn from_config(configs: &[RouteConfig]) -> Self {
        let mut routes: Vec<Route> = configs.iter().map(Route::from_config).collect();
        routes.sort_by(|a, b| b.priority.cmp(&a.priority));

        tracing::debug!(routes = routes.len(), "Route table compiled");
        Self { routes }
    }

    /// Find the first route matching the target.
    pub fn match_target(&self, target: &RequestTarget<'_>) -> Option<&Route> {
        self.routes.iter().find(|r| r.matcher.matches(target))
    }

    /// Resolve the target to route data, `None` if no route matches.
    pub fn resolve(&self, target: &RequestTarget<'_>) -> Option<RouteData> {
        let route = self.match_target(target)?;
        tracing::trace!(route = %route.name, path = %target.path, "Route matched");
        Some(route.route_data(target))
    }

    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }
}
