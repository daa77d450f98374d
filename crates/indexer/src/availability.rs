//! LLM availability as seen by the indexer.

use async_trait::async_trait;
use resindex_core::Error;
use resindex_queue::AvailabilityFn;
use resindex_utils::resilience::{AvailabilityManager, AvailabilityStatus};

/// Source of truth for whether the LLM dependency may be called
#[async_trait]
pub trait LlmAvailability: Send + Sync {
    /// Active check made right before a call; may admit a recovery trial
    async fn is_available(&self) -> bool;

    /// Read-only check for reporting. Defaults to the active check for
    /// sources without state.
    async fn peek_available(&self) -> bool {
        self.is_available().await
    }

    fn record_success(&self) {}

    fn record_failure(&self, _error: &Error) {}

    /// Detailed status, when the source tracks one
    fn status(&self) -> Option<AvailabilityStatus> {
        None
    }
}

#[async_trait]
impl LlmAvailability for AvailabilityManager {
    async fn is_available(&self) -> bool {
        AvailabilityManager::is_available(self)
    }

    async fn peek_available(&self) -> bool {
        AvailabilityManager::peek_available(self)
    }

    fn record_success(&self) {
        AvailabilityManager::record_success(self);
    }

    fn record_failure(&self, error: &Error) {
        AvailabilityManager::record_failure(self, error);
    }

    fn status(&self) -> Option<AvailabilityStatus> {
        Some(self.get_status())
    }
}

/// Adapter for a plain async probe
pub struct FnAvailability {
    probe: AvailabilityFn,
}

impl FnAvailability {
    pub fn new(probe: AvailabilityFn) -> Self {
        Self { probe }
    }
}

#[async_trait]
impl LlmAvailability for FnAvailability {
    async fn is_available(&self) -> bool {
        (self.probe)().await
    }
}

/// Treats the LLM as always reachable
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysAvailable;

#[async_trait]
impl LlmAvailability for AlwaysAvailable {
    async fn is_available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use resindex_utils::resilience::{CircuitBreakerConfig, CircuitState, HealthMonitor};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_manager_peek_does_not_consume_trial() {
        let manager = AvailabilityManager::new(
            CircuitBreakerConfig {
                failure_threshold: 1,
                recovery_timeout: Duration::ZERO,
                half_open_max_calls: 1,
            },
            HealthMonitor::new(3),
        )
        .unwrap();
        let source: &dyn LlmAvailability = &manager;

        source.record_failure(&Error::network("llm", "refused"));
        assert!(!source.peek_available().await);
        assert_eq!(manager.circuit_state(), CircuitState::Open);

        assert!(source.is_available().await);
        assert_eq!(manager.circuit_state(), CircuitState::HalfOpen);
        source.record_success();
        assert_eq!(manager.circuit_state(), CircuitState::Closed);
        assert!(source.status().is_some());
    }

    #[tokio::test]
    async fn test_fn_availability_follows_probe() {
        let up = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&up);
        let source = FnAvailability::new(Arc::new(move || {
            let value = flag.load(Ordering::SeqCst);
            async move { value }.boxed()
        }));

        assert!(!source.is_available().await);
        assert!(!source.peek_available().await);
        up.store(true, Ordering::SeqCst);
        assert!(source.is_available().await);
        assert!(source.status().is_none());
    }

    #[tokio::test]
    async fn test_always_available() {
        assert!(AlwaysAvailable.is_available().await);
    }
}
