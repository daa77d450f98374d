//! Settings loading and validation for resindex
//!
//! Settings start from defaults, are merged with an optional JSON file, and
//! are finally overridden by `RESINDEX_*` environment variables. The result
//! is validated once and then treated as immutable.

pub mod config;
pub mod loader;

pub use config::*;
pub use loader::*;
