//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming Request (host, path, extensions)
//!     → RouteData extension set by an embedding app? use it
//!     → otherwise router.rs (route lookup)
//!     → matcher.rs (evaluate match conditions)
//!     → Return: RouteData (controller, action, path, area) or NoMatch
//!
//! Route Compilation (at startup):
//!     RouteConfig[]
//!     → Sort by priority
//!     → Compile matchers
//!     → Freeze as immutable Router
//! ```
//!
//! # Design Decisions
//! - Routes compiled at startup, immutable at runtime
//! - Deterministic: same input always resolves to the same RouteData
//! - A request without RouteData is not addressable and is never intercepted

pub mod matcher;
pub mod route_data;
pub mod router;

pub use matcher::RequestTarget;
pub use route_data::{RouteData, RouteValue, RouteValues};
pub use router::Router;
