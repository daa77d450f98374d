//! Shared utilities for resindex
//!
//! This crate provides the building blocks the pipeline crates share: atomic
//! file writes for durable state, tracing setup, and the resilience
//! primitives that guard calls to the LLM dependency.

pub mod atomic_file;
pub mod resilience;
pub mod tracing;

pub use atomic_file::*;
pub use resilience::*;
