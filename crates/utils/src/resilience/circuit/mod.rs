//! Circuit breaker guarding calls to the LLM dependency
//!
//! ## Architecture
//!
//! - [`types`] - Circuit states and the statistics snapshot
//! - [`config`] - Thresholds and timeouts
//! - [`metrics`] - Counters and timestamps behind the breaker's lock
//! - [`transitions`] - State transition logic
//! - [`state`] - The `CircuitBreaker` itself
//!
//! Availability has two entry points on purpose. [`CircuitBreaker::is_available`]
//! is a passive read and never changes state, so status polling cannot reset
//! an expired breaker. [`CircuitBreaker::attempt_call`] is the only place
//! where an open breaker moves to half-open.
//!
//! ## Example
//!
//! ```rust
//! use resindex_utils::resilience::circuit::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
//!
//! let cb = CircuitBreaker::new(CircuitBreakerConfig {
//!     failure_threshold: 2,
//!     ..Default::default()
//! });
//!
//! if cb.attempt_call() {
//!     // call the dependency, then report the outcome
//!     cb.record_failure();
//!     cb.record_failure();
//! }
//! assert_eq!(cb.state(), CircuitState::Open);
//! assert!(!cb.is_available());
//! ```

pub mod config;
pub mod metrics;
pub mod state;
#[cfg(test)]
pub mod tests;
pub mod transitions;
pub mod types;

pub use config::CircuitBreakerConfig;
pub use state::CircuitBreaker;
pub use types::{CircuitBreakerStats, CircuitState};
