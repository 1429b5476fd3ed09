//! Lazy-load rewriting proxy.
//!
//! Sits in front of an origin application and rewrites the `img`/`source`
//! elements of rendered HTML pages for client-side lazy loading, wrapping
//! media-library images in a `picture` that offers a WebP variant. Crawlers
//! and partial renders see the origin's markup untouched.

pub mod config;
pub mod html;
pub mod http;
pub mod interceptor;
pub mod keys;
pub mod lifecycle;
pub mod observability;
pub mod routing;

pub use config::schema::PageSpeedConfig;
pub use html::{HtmlRewriter, MarkupRewriter};
pub use http::HttpServer;
pub use interceptor::LazyLoadFilter;
pub use lifecycle::Shutdown;
