//! Integration tests for circuit breaker functionality.
//!
//! These tests exercise whole lifecycles rather than single transitions.

#[cfg(test)]
mod integration_tests {
    use super::super::{
        config::CircuitBreakerConfig, state::CircuitBreaker, types::CircuitState,
    };
    use std::thread::sleep;
    use std::time::Duration;

    fn fast_config() -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: 2,
            recovery_timeout: Duration::from_millis(100),
            half_open_max_calls: 2,
        }
    }

    #[test]
    fn test_full_circuit_breaker_lifecycle() {
        let cb = CircuitBreaker::new(fast_config());

        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(cb.attempt_call());

        cb.record_failure();
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);
        assert!(!cb.attempt_call());

        sleep(Duration::from_millis(150));

        // First trial call moves to half-open
        assert!(cb.attempt_call());
        assert_eq!(cb.state(), CircuitState::HalfOpen);
        cb.record_success();
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        assert!(cb.attempt_call());
        cb.record_success();
        assert_eq!(cb.state(), CircuitState::Closed);
        assert!(cb.is_available());
    }

    #[test]
    fn test_half_open_trial_budget() {
        let cb = CircuitBreaker::new(fast_config());
        cb.record_failure();
        cb.record_failure();
        sleep(Duration::from_millis(150));

        assert!(cb.attempt_call());
        assert!(cb.attempt_call());
        // Budget of two trial calls is spent until outcomes come back
        assert!(!cb.attempt_call());
        assert_eq!(cb.stats().half_open_calls, 2);
        // Still passively available while probing
        assert!(cb.is_available());
    }

    #[test]
    fn test_unreported_trials_reopen_after_recovery_timeout() {
        let cb = CircuitBreaker::new(fast_config());
        cb.record_failure();
        cb.record_failure();
        sleep(Duration::from_millis(150));

        // Trials admitted but their outcomes never recorded
        assert!(cb.attempt_call());
        assert!(cb.attempt_call());
        assert!(!cb.attempt_call());
        assert_eq!(cb.state(), CircuitState::HalfOpen);

        sleep(Duration::from_millis(150));
        assert!(!cb.attempt_call());
        assert_eq!(cb.state(), CircuitState::Open);

        sleep(Duration::from_millis(150));
        assert!(cb.attempt_call());
        cb.record_success();
        assert!(cb.attempt_call());
        cb.record_success();
        assert_eq!(cb.state(), CircuitState::Closed);
    }

    #[test]
    fn test_reopen_restarts_recovery_timer() {
        let cb = CircuitBreaker::new(fast_config());
        cb.record_failure();
        cb.record_failure();
        sleep(Duration::from_millis(150));

        assert!(cb.attempt_call());
        cb.record_failure();
        assert_eq!(cb.state(), CircuitState::Open);

        // The timer restarted on reopen
        assert!(!cb.attempt_call());
        sleep(Duration::from_millis(150));
        assert!(cb.attempt_call());
    }

    #[test]
    fn test_circuit_breaker_stats() {
        let cb = CircuitBreaker::new(CircuitBreakerConfig {
            failure_threshold: 3,
            ..Default::default()
        });

        let stats = cb.stats();
        assert_eq!(stats.state, CircuitState::Closed);
        assert_eq!(stats.failure_count, 0);
        assert!(stats.since_last_failure_ms.is_none());

        cb.record_failure();
        cb.record_failure();
        let stats = cb.stats();
        assert_eq!(stats.failure_count, 2);
        assert_eq!(stats.state, CircuitState::Closed);

        cb.record_failure();
        let stats = cb.stats();
        assert_eq!(stats.state, CircuitState::Open);
        assert!(stats.since_last_failure_ms.is_some());
    }

    #[test]
    fn test_state_serializes_in_upper_snake_case() {
        let json = serde_json::to_string(&CircuitState::HalfOpen).unwrap();
        assert_eq!(json, "\"HALF_OPEN\"");
        assert_eq!(CircuitState::HalfOpen.to_string(), "HALF_OPEN");
    }
}
