//! Core types for circuit breaker functionality.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Circuit breaker states
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CircuitState {
    /// Circuit is closed - requests pass through normally
    Closed,
    /// Circuit is open - requests are rejected
    Open,
    /// Circuit is half-open - limited trial requests test recovery
    HalfOpen,
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CircuitState::Closed => "CLOSED",
            CircuitState::Open => "OPEN",
            CircuitState::HalfOpen => "HALF_OPEN",
        };
        f.write_str(name)
    }
}

/// Statistics about circuit breaker state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitBreakerStats {
    pub state: CircuitState,
    pub failure_count: u32,
    pub half_open_calls: u32,
    pub half_open_successes: u32,
    /// Milliseconds since the last state change
    pub since_state_change_ms: u64,
    /// Milliseconds since the last recorded failure
    pub since_last_failure_ms: Option<u64>,
}
