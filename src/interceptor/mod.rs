//! Response interception.
//!
//! # Responsibilities
//! - Capture the page output of routed, non-child, non-crawler requests
//! - Hand the captured markup to the rewriter once the pipeline completes
//! - Restore the host's output sink on every path, including failures
//!
//! # Design Decisions
//! - The host is abstracted behind [`ActionContext`]; the HTTP middleware is
//!   one implementation, unit tests use an in-memory one
//! - Pending records are request-scoped and keyed by the route key, so
//!   AFTER can find what BEFORE registered without shared state

pub mod bots;
pub mod filter;
pub mod pending;
pub mod sink;

pub use bots::CrawlerBots;
pub use filter::{ActionContext, After, Before, LazyLoadFilter, SkipReason};
pub use pending::{FinalizeRecord, PendingFinalize};
pub use sink::{CaptureBuffer, OutputSink};
