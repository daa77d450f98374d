//! Counters and timestamps tracked by the circuit breaker.

use super::types::{CircuitBreakerStats, CircuitState};
use std::time::Instant;

/// Internal bookkeeping for the circuit breaker, guarded by its lock
#[derive(Debug)]
pub struct MetricsState {
    pub state: CircuitState,
    pub failure_count: u32,
    pub half_open_calls: u32,
    pub half_open_successes: u32,
    pub last_failure_time: Option<Instant>,
    pub last_state_change: Instant,
}

impl MetricsState {
    /// Create new metrics state
    pub fn new() -> Self {
        Self {
            state: CircuitState::Closed,
            failure_count: 0,
            half_open_calls: 0,
            half_open_successes: 0,
            last_failure_time: None,
            last_state_change: Instant::now(),
        }
    }

    /// Reset per-state counters
    pub fn reset_counters(&mut self) {
        self.failure_count = 0;
        self.half_open_calls = 0;
        self.half_open_successes = 0;
    }

    /// Snapshot of the current statistics
    pub fn stats(&self) -> CircuitBreakerStats {
        CircuitBreakerStats {
            state: self.state,
            failure_count: self.failure_count,
            half_open_calls: self.half_open_calls,
            half_open_successes: self.half_open_successes,
            since_state_change_ms: self.last_state_change.elapsed().as_millis() as u64,
            since_last_failure_ms: self
                .last_failure_time
                .map(|t| t.elapsed().as_millis() as u64),
        }
    }
}

impl Default for MetricsState {
    fn default() -> Self {
        Self::new()
    }
}
