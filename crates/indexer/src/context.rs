//! Application context owning every long-lived component.

use crate::availability::LlmAvailability;
use crate::config::IndexerConfig;
use crate::indexer::ResilientIndexer;
use crate::status::{HealthSnapshot, SessionActivitySource, StatusAggregator};
use crate::store::EpisodeStore;
use resindex_config::Settings;
use resindex_core::Result;
use resindex_queue::PermanentFailureCallback;
use resindex_utils::resilience::{AvailabilityManager, HealthCheckFn, HealthMonitor};
use std::sync::Arc;

/// Builder for [`AppContext`]
pub struct AppContextBuilder {
    store: Arc<dyn EpisodeStore>,
    settings: Settings,
    health_check: Option<HealthCheckFn>,
    sessions: Option<Arc<dyn SessionActivitySource>>,
    on_permanent_failure: Option<PermanentFailureCallback>,
}

impl AppContextBuilder {
    pub fn settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    /// Probe used by the health monitor
    pub fn health_check(mut self, check: HealthCheckFn) -> Self {
        self.health_check = Some(check);
        self
    }

    pub fn sessions(mut self, sessions: Arc<dyn SessionActivitySource>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    pub fn on_permanent_failure(mut self, callback: PermanentFailureCallback) -> Self {
        self.on_permanent_failure = Some(callback);
        self
    }

    pub fn build(self) -> Result<AppContext> {
        self.settings.validate()?;

        let history = self.settings.llm.health_history_size;
        let monitor = match self.health_check {
            Some(check) => HealthMonitor::with_check(history, check),
            None => HealthMonitor::new(history),
        };
        let availability = Arc::new(AvailabilityManager::new(
            self.settings.llm.circuit_breaker_config(),
            monitor,
        )?);

        let mut builder = ResilientIndexer::builder(self.store)
            .availability(Arc::clone(&availability) as Arc<dyn LlmAvailability>)
            .config(IndexerConfig::from(&self.settings.indexer));
        if let Some(callback) = self.on_permanent_failure {
            builder = builder.on_permanent_failure(callback);
        }
        let indexer = Arc::new(builder.build()?);

        let mut status = StatusAggregator::new()
            .with_availability(Arc::clone(&availability) as Arc<dyn LlmAvailability>)
            .with_indexer(Arc::clone(&indexer))
            .with_recent_failure_limit(self.settings.indexer.recent_failure_limit);
        if let Some(sessions) = self.sessions {
            status = status.with_sessions(sessions);
        }

        Ok(AppContext {
            settings: self.settings,
            availability,
            indexer,
            status,
        })
    }
}

/// Explicitly constructed owner of the pipeline, passed to request handlers
pub struct AppContext {
    settings: Settings,
    availability: Arc<AvailabilityManager>,
    indexer: Arc<ResilientIndexer>,
    status: StatusAggregator,
}

impl AppContext {
    pub fn builder(store: Arc<dyn EpisodeStore>) -> AppContextBuilder {
        AppContextBuilder {
            store,
            settings: Settings::default(),
            health_check: None,
            sessions: None,
            on_permanent_failure: None,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn availability(&self) -> &Arc<AvailabilityManager> {
        &self.availability
    }

    pub fn indexer(&self) -> &Arc<ResilientIndexer> {
        &self.indexer
    }

    pub fn status(&self) -> &StatusAggregator {
        &self.status
    }

    /// Run one health check, then aggregate the snapshot
    pub async fn get_health(&self) -> HealthSnapshot {
        let check = self.availability.check_health().await;
        if !check.healthy {
            tracing::warn!(
                latency_ms = check.latency_ms,
                error = check.error.as_deref().unwrap_or(""),
                "LLM health check failed"
            );
        }
        self.status.get_health().await
    }

    pub async fn start(&self) {
        self.indexer.start().await;
    }

    pub async fn shutdown(&self) {
        self.indexer.stop().await;
    }
}
