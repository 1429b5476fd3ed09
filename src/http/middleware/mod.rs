//! Request/response middleware.

pub mod lazy_load;

pub use lazy_load::{lazy_load_middleware, ChildRender, HttpExchange, LazyLoadState};
