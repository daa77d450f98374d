//! On-demand health checks with a bounded history.
//!
//! The monitor never schedules itself; callers decide the cadence.

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use parking_lot::Mutex;
use resindex_core::{Result, DEFAULT_HEALTH_HISTORY_SIZE};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

/// Async health probe. `Ok(false)` and `Err(_)` both count as unhealthy.
pub type HealthCheckFn = Arc<dyn Fn() -> BoxFuture<'static, Result<bool>> + Send + Sync>;

/// Outcome of one health check
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthCheckResult {
    pub healthy: bool,
    pub latency_ms: f64,
    pub error: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Runs health checks and keeps the most recent results
pub struct HealthMonitor {
    check_fn: Option<HealthCheckFn>,
    history: Mutex<VecDeque<HealthCheckResult>>,
    history_size: usize,
}

impl HealthMonitor {
    /// Monitor without a probe; every check reports healthy
    pub fn new(history_size: usize) -> Self {
        let history_size = history_size.max(1);
        Self {
            check_fn: None,
            history: Mutex::new(VecDeque::with_capacity(history_size)),
            history_size,
        }
    }

    /// Monitor that calls `check_fn` on every check
    pub fn with_check(history_size: usize, check_fn: HealthCheckFn) -> Self {
        Self {
            check_fn: Some(check_fn),
            ..Self::new(history_size)
        }
    }

    /// Run one health check and record it
    pub async fn check_health(&self) -> HealthCheckResult {
        let started = Instant::now();
        let (healthy, error) = match &self.check_fn {
            None => (true, None),
            Some(check) => match check().await {
                Ok(healthy) => (healthy, None),
                Err(e) => (false, Some(e.to_string())),
            },
        };

        let result = HealthCheckResult {
            healthy,
            latency_ms: started.elapsed().as_secs_f64() * 1000.0,
            error,
            timestamp: Utc::now(),
        };

        if !result.healthy {
            tracing::debug!(
                latency_ms = result.latency_ms,
                error = result.error.as_deref().unwrap_or(""),
                "health check failed"
            );
        }

        let mut history = self.history.lock();
        if history.len() >= self.history_size {
            history.pop_front();
        }
        history.push_back(result.clone());

        result
    }

    /// Fraction of healthy checks in the history; 1.0 before the first check
    pub fn success_rate(&self) -> f64 {
        let history = self.history.lock();
        if history.is_empty() {
            return 1.0;
        }
        let healthy = history.iter().filter(|r| r.healthy).count();
        healthy as f64 / history.len() as f64
    }

    /// Most recent check, if any
    pub fn last_check(&self) -> Option<HealthCheckResult> {
        self.history.lock().back().cloned()
    }

    /// Unhealthy checks in a row at the end of the history
    pub fn consecutive_failures(&self) -> usize {
        self.history
            .lock()
            .iter()
            .rev()
            .take_while(|r| !r.healthy)
            .count()
    }

    pub fn history_len(&self) -> usize {
        self.history.lock().len()
    }
}

impl Default for HealthMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_HEALTH_HISTORY_SIZE)
    }
}
