//! Core domain types, errors, and constants for `resindex`.
//!
//! ## Key Components
//!
//! - **`errors`**: Defines the primary `Error` enum and `Result` type alias,
//!   centralizing every failure mode the indexing pipeline can observe.
//! - **`types`**: Shared enums that several crates agree on, such as
//!   `DegradationLevel` and `UnavailablePolicy`.
//! - **`constants`**: Default values and environment variable names.

pub mod constants;
pub mod errors;
pub mod types;

pub use self::{
    constants::*,
    errors::{Error, Result, ResultExt},
    types::*,
};
