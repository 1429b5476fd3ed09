//! HTML rewriting subsystem.
//!
//! # Data Flow
//! ```text
//! buffered page markup
//!     → parser.rs (lenient tokenize + tree build, never fails)
//!     → dom.rs (arena Document: elements, attributes, classes)
//!     → rewriter.rs (classify img/source, wrap or convert in place)
//!     → serialize.rs (pristine nodes verbatim, modified ones regenerated)
//!     → rewritten markup
//! ```
//!
//! # Design Decisions
//! - No HTML5 tree fixups: the tree mirrors the source so untouched markup
//!   survives byte-for-byte
//! - Attribute values are stored as written (no entity decoding)
//! - A Document never outlives one rewrite call

pub mod dom;
mod parser;
pub mod rewriter;
mod serialize;

pub use dom::{Attribute, Document, Element, NodeId, NodeKind};
pub use rewriter::{HtmlRewriter, MarkupRewriter, RewriteStats, LAZYLOAD_CLASS};
