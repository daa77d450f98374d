//! Circuit breaker state management.

use super::config::CircuitBreakerConfig;
use super::metrics::MetricsState;
use super::transitions::StateTransitions;
use super::types::{CircuitBreakerStats, CircuitState};
use parking_lot::Mutex;

/// Circuit breaker implementation
///
/// All operations are bookkeeping on in-memory counters and never fail.
pub struct CircuitBreaker {
    metrics: Mutex<MetricsState>,
    transitions: StateTransitions,
}

impl CircuitBreaker {
    /// Create a new circuit breaker with the given configuration
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            metrics: Mutex::new(MetricsState::new()),
            transitions: StateTransitions::new(config),
        }
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        self.transitions.config()
    }

    /// Current state, without triggering any transition
    pub fn state(&self) -> CircuitState {
        self.metrics.lock().state
    }

    /// Passive availability read: true when closed or half-open.
    ///
    /// An open breaker whose recovery timeout has elapsed still reports
    /// unavailable here; only [`CircuitBreaker::attempt_call`] moves it on.
    pub fn is_available(&self) -> bool {
        matches!(
            self.metrics.lock().state,
            CircuitState::Closed | CircuitState::HalfOpen
        )
    }

    /// Ask to make a call through the breaker.
    ///
    /// Returns false while open and before the recovery timeout, or when the
    /// half-open trial budget is spent.
    pub fn attempt_call(&self) -> bool {
        let mut metrics = self.metrics.lock();
        self.transitions.admit_call(&mut metrics)
    }

    /// Record a successful call
    pub fn record_success(&self) {
        let mut metrics = self.metrics.lock();
        self.transitions.record_success(&mut metrics);
    }

    /// Record a failed call
    pub fn record_failure(&self) {
        let mut metrics = self.metrics.lock();
        self.transitions.record_failure(&mut metrics);
    }

    /// Get current circuit breaker statistics
    pub fn stats(&self) -> CircuitBreakerStats {
        self.metrics.lock().stats()
    }
}

impl Default for CircuitBreaker {
    fn default() -> Self {
        Self::new(CircuitBreakerConfig::default())
    }
}
