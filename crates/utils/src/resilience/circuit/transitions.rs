//! State transition logic for circuit breaker.

use super::config::CircuitBreakerConfig;
use super::metrics::MetricsState;
use super::types::CircuitState;
use std::time::Instant;

/// Handles state transitions for circuit breaker
pub struct StateTransitions {
    config: CircuitBreakerConfig,
}

impl StateTransitions {
    /// Create new state transitions handler
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CircuitBreakerConfig {
        &self.config
    }

    /// Transition to open state
    pub fn transition_to_open(&self, metrics: &mut MetricsState) {
        if metrics.state != CircuitState::Open {
            log::warn!(
                "Circuit breaker opening after {} consecutive failures",
                metrics.failure_count
            );
            metrics.state = CircuitState::Open;
            metrics.last_state_change = Instant::now();
            metrics.reset_counters();
        }
    }

    /// Trial calls were admitted but never reported back; start a new
    /// recovery window
    fn reopen_stale_trial(&self, metrics: &mut MetricsState) {
        log::warn!(
            "Circuit breaker trial calls unreported after {:?}, reopening",
            self.config.recovery_timeout
        );
        metrics.state = CircuitState::Open;
        metrics.last_state_change = Instant::now();
        metrics.reset_counters();
    }

    /// Transition to half-open state
    pub fn transition_to_half_open(&self, metrics: &mut MetricsState) {
        if metrics.state != CircuitState::HalfOpen {
            log::info!("Circuit breaker entering half-open state");
            metrics.state = CircuitState::HalfOpen;
            metrics.last_state_change = Instant::now();
            metrics.reset_counters();
        }
    }

    /// Transition to closed state
    pub fn transition_to_closed(&self, metrics: &mut MetricsState) {
        if metrics.state != CircuitState::Closed {
            log::info!("Circuit breaker closing");
            metrics.state = CircuitState::Closed;
            metrics.last_state_change = Instant::now();
            metrics.reset_counters();
        }
    }

    /// Record a successful call and handle state transitions
    pub fn record_success(&self, metrics: &mut MetricsState) {
        metrics.failure_count = 0;

        if metrics.state == CircuitState::HalfOpen {
            metrics.half_open_successes += 1;
            if metrics.half_open_successes >= self.config.half_open_max_calls {
                self.transition_to_closed(metrics);
            }
        }
    }

    /// Record a failed call and handle state transitions
    pub fn record_failure(&self, metrics: &mut MetricsState) {
        metrics.last_failure_time = Some(Instant::now());

        match metrics.state {
            CircuitState::Closed => {
                metrics.failure_count += 1;
                if metrics.failure_count >= self.config.failure_threshold {
                    self.transition_to_open(metrics);
                }
            }
            // No tolerance during probation
            CircuitState::HalfOpen => self.transition_to_open(metrics),
            CircuitState::Open => {
                metrics.failure_count += 1;
            }
        }
    }

    /// Decide whether a call may proceed, moving Open to HalfOpen once the
    /// recovery timeout has elapsed. A HalfOpen breaker with its trial budget
    /// spent for longer than the recovery timeout goes back to Open.
    pub fn admit_call(&self, metrics: &mut MetricsState) -> bool {
        match metrics.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                if metrics.last_state_change.elapsed() >= self.config.recovery_timeout {
                    self.transition_to_half_open(metrics);
                    metrics.half_open_calls = 1;
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => {
                if metrics.half_open_calls < self.config.half_open_max_calls {
                    metrics.half_open_calls += 1;
                    true
                } else {
                    if metrics.last_state_change.elapsed() >= self.config.recovery_timeout {
                        self.reopen_stale_trial(metrics);
                    }
                    false
                }
            }
        }
    }
}
