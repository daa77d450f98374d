//! Configuration for circuit breaker behavior.

use resindex_core::{
    Error, Result, DEFAULT_FAILURE_THRESHOLD, DEFAULT_HALF_OPEN_MAX_CALLS,
    DEFAULT_RECOVERY_TIMEOUT_SECS,
};
use std::time::Duration;

/// Configuration for circuit breaker behavior
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures before opening the circuit
    pub failure_threshold: u32,
    /// How long the circuit stays open before a trial call is allowed
    pub recovery_timeout: Duration,
    /// Trial calls admitted in half-open state; the same number of
    /// successes closes the circuit
    pub half_open_max_calls: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            recovery_timeout: Duration::from_secs(DEFAULT_RECOVERY_TIMEOUT_SECS),
            half_open_max_calls: DEFAULT_HALF_OPEN_MAX_CALLS,
        }
    }
}

impl CircuitBreakerConfig {
    /// Reject settings the state machine cannot honour
    pub fn validate(&self) -> Result<()> {
        if self.failure_threshold == 0 {
            return Err(Error::configuration(
                "circuit breaker failure_threshold must be at least 1",
            ));
        }
        if self.half_open_max_calls == 0 {
            return Err(Error::configuration(
                "circuit breaker half_open_max_calls must be at least 1",
            ));
        }
        Ok(())
    }
}
