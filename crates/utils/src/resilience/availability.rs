//! Availability facade over the circuit breaker and the health monitor.

use super::circuit::{CircuitBreaker, CircuitBreakerConfig, CircuitBreakerStats, CircuitState};
use super::classifier::{classify, ErrorClassification};
use super::health::{HealthCheckResult, HealthMonitor};
use parking_lot::Mutex;
use resindex_core::{Error, Result};
use serde::{Deserialize, Serialize};

/// Health monitor portion of the availability status
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthStatus {
    pub last_check: Option<HealthCheckResult>,
    pub success_rate: f64,
    pub consecutive_failures: usize,
}

/// Combined availability snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AvailabilityStatus {
    /// Passive read; does not advance an expired breaker
    pub available: bool,
    pub circuit_state: CircuitState,
    pub circuit: CircuitBreakerStats,
    pub health_status: HealthStatus,
    /// Classification of the most recent recorded failure
    pub last_failure: Option<ErrorClassification>,
}

/// Tracks whether the LLM dependency should be called
pub struct AvailabilityManager {
    breaker: CircuitBreaker,
    monitor: HealthMonitor,
    last_failure: Mutex<Option<ErrorClassification>>,
}

impl AvailabilityManager {
    /// Create a manager, validating the breaker configuration
    pub fn new(config: CircuitBreakerConfig, monitor: HealthMonitor) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            breaker: CircuitBreaker::new(config),
            monitor,
            last_failure: Mutex::new(None),
        })
    }

    /// Whether a call to the dependency should be attempted now.
    ///
    /// This is the active check: an open breaker past its recovery timeout
    /// moves to half-open and admits a trial call.
    pub fn is_available(&self) -> bool {
        self.breaker.attempt_call()
    }

    /// Passive check for reporting; never changes breaker state
    pub fn peek_available(&self) -> bool {
        self.breaker.is_available()
    }

    pub fn record_success(&self) {
        self.breaker.record_success();
    }

    /// Classify and record a failure. Every failure counts the same for the
    /// breaker; the classification is kept for diagnostics.
    pub fn record_failure(&self, error: &Error) -> ErrorClassification {
        let classification = classify(error);
        tracing::debug!(
            kind = error.kind_name(),
            error_type = %classification.error_type,
            retryable = classification.retryable,
            "recording LLM failure"
        );
        self.breaker.record_failure();
        *self.last_failure.lock() = Some(classification.clone());
        classification
    }

    /// Run the configured health check
    pub async fn check_health(&self) -> HealthCheckResult {
        self.monitor.check_health().await
    }

    pub fn circuit_state(&self) -> CircuitState {
        self.breaker.state()
    }

    pub fn get_status(&self) -> AvailabilityStatus {
        let circuit = self.breaker.stats();
        AvailabilityStatus {
            available: self.breaker.is_available(),
            circuit_state: circuit.state,
            circuit,
            health_status: HealthStatus {
                last_check: self.monitor.last_check(),
                success_rate: self.monitor.success_rate(),
                consecutive_failures: self.monitor.consecutive_failures(),
            },
            last_failure: self.last_failure.lock().clone(),
        }
    }
}

impl Default for AvailabilityManager {
    fn default() -> Self {
        Self {
            breaker: CircuitBreaker::default(),
            monitor: HealthMonitor::default(),
            last_failure: Mutex::new(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::classifier::ErrorCategory;
    use std::time::Duration;

    fn manager(threshold: u32) -> AvailabilityManager {
        AvailabilityManager::new(
            CircuitBreakerConfig {
                failure_threshold: threshold,
                recovery_timeout: Duration::from_secs(60),
                half_open_max_calls: 1,
            },
            HealthMonitor::new(5),
        )
        .unwrap()
    }

    #[test]
    fn test_permanent_and_transient_failures_count_alike() {
        let mgr = manager(2);
        let c = mgr.record_failure(&Error::http("llm", 401, "bad key"));
        assert_eq!(c.error_type, ErrorCategory::Permanent);
        assert!(mgr.is_available());

        let c = mgr.record_failure(&Error::network("llm", "refused"));
        assert_eq!(c.error_type, ErrorCategory::Transient);
        assert!(!mgr.is_available());
        assert_eq!(mgr.circuit_state(), CircuitState::Open);
    }

    #[test]
    fn test_status_reports_last_failure() {
        let mgr = manager(5);
        assert!(mgr.get_status().last_failure.is_none());

        mgr.record_failure(&Error::http("llm", 503, "overloaded"));
        let status = mgr.get_status();
        assert!(status.available);
        assert_eq!(status.circuit_state, CircuitState::Closed);
        assert_eq!(status.circuit.failure_count, 1);
        let last = status.last_failure.unwrap();
        assert_eq!(last.status_code, Some(503));
        assert_eq!(last.error_type, ErrorCategory::Transient);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let result = AvailabilityManager::new(
            CircuitBreakerConfig {
                failure_threshold: 0,
                ..Default::default()
            },
            HealthMonitor::default(),
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_status_includes_health_history() {
        let mgr = manager(5);
        mgr.check_health().await;
        let status = mgr.get_status();
        assert!(status.health_status.last_check.unwrap().healthy);
        assert_eq!(status.health_status.success_rate, 1.0);
    }
}
