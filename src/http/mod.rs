//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID, tracing, timeout)
//!     → middleware/lazy_load.rs (route lookup, BEFORE, AFTER)
//!     → origin.rs (forward to the origin application)
//!     → rewritten or untouched response to the client
//! ```

pub mod middleware;
pub mod origin;
pub mod server;

pub use middleware::{ChildRender, LazyLoadState};
pub use origin::{OriginClient, OriginError, OriginFailure};
pub use server::{HttpServer, ServerError};
