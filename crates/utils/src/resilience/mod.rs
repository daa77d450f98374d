//! Resilience patterns guarding calls to the LLM dependency.
//!
//! ## Key Components
//!
//! - **`classifier`**: Maps a failure to permanent, transient or unknown.
//! - **`circuit`**: Circuit breaker that sheds load from a failing dependency.
//! - **`health`**: On-demand health checks with a rolling success rate.
//! - **`availability`**: Facade combining the breaker and the monitor.

pub mod availability;
pub mod circuit;
pub mod classifier;
pub mod health;

pub use availability::{AvailabilityManager, AvailabilityStatus, HealthStatus};
pub use circuit::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStats, CircuitState};
pub use classifier::{classify, ErrorCategory, ErrorClassification};
pub use health::{HealthCheckFn, HealthCheckResult, HealthMonitor};
