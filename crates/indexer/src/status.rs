//! Health reporting across the session source, LLM availability and the
//! retry queue.

use crate::availability::LlmAvailability;
use crate::indexer::ResilientIndexer;
use chrono::{DateTime, Utc};
use resindex_core::{DegradationLevel, DEFAULT_RECENT_FAILURE_LIMIT};
use resindex_queue::{FailedEpisode, QueueStats, RetryQueue};
use resindex_utils::resilience::AvailabilityStatus;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Session activity counts reported by whatever manages sessions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionActivity {
    pub running: bool,
    pub active_sessions: usize,
    pub total_sessions: usize,
}

pub trait SessionActivitySource: Send + Sync {
    fn activity(&self) -> SessionActivity;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceHealth {
    pub running: bool,
    pub active_sessions: usize,
    pub total_sessions: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LlmHealth {
    pub available: bool,
    pub status: Option<AvailabilityStatus>,
}

/// Condensed view of a queued failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecentFailure {
    pub episode_id: String,
    pub session_id: String,
    pub error_type: String,
    pub error_message: String,
    pub failed_at: DateTime<Utc>,
    pub retry_count: u32,
    pub permanent_failure: bool,
}

impl From<FailedEpisode> for RecentFailure {
    fn from(episode: FailedEpisode) -> Self {
        Self {
            episode_id: episode.episode_id,
            session_id: episode.session_id,
            error_type: episode.error_type,
            error_message: episode.error_message,
            failed_at: episode.failed_at,
            retry_count: episode.retry_count,
            permanent_failure: episode.permanent_failure,
        }
    }
}

/// Externally reportable health document, computed on demand
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub service: ServiceHealth,
    pub llm: LlmHealth,
    pub queue: Option<QueueStats>,
    /// Most recent first
    pub recent_failures: Vec<RecentFailure>,
    /// Estimate from the merged inputs
    pub degradation_level: DegradationLevel,
    /// Level assigned by the indexer, when one is wired in
    pub indexer_degradation_level: Option<DegradationLevel>,
    pub started_at: DateTime<Utc>,
    pub uptime_secs: f64,
    pub generated_at: DateTime<Utc>,
}

/// Level estimate used when no indexer is wired in
pub fn estimate_level(
    service_running: bool,
    llm_available: bool,
    pending_retries: usize,
) -> DegradationLevel {
    if !service_running || !llm_available {
        DegradationLevel::RawOnly
    } else if pending_retries > 0 {
        DegradationLevel::Partial
    } else {
        DegradationLevel::Full
    }
}

/// Read-side composition of every health input
pub struct StatusAggregator {
    sessions: Option<Arc<dyn SessionActivitySource>>,
    availability: Option<Arc<dyn LlmAvailability>>,
    queue: Option<Arc<RetryQueue>>,
    indexer: Option<Arc<ResilientIndexer>>,
    recent_failure_limit: usize,
    started_at: DateTime<Utc>,
    started: Instant,
}

impl StatusAggregator {
    pub fn new() -> Self {
        Self {
            sessions: None,
            availability: None,
            queue: None,
            indexer: None,
            recent_failure_limit: DEFAULT_RECENT_FAILURE_LIMIT,
            started_at: Utc::now(),
            started: Instant::now(),
        }
    }

    pub fn with_sessions(mut self, sessions: Arc<dyn SessionActivitySource>) -> Self {
        self.sessions = Some(sessions);
        self
    }

    pub fn with_availability(mut self, availability: Arc<dyn LlmAvailability>) -> Self {
        self.availability = Some(availability);
        self
    }

    pub fn with_queue(mut self, queue: Arc<RetryQueue>) -> Self {
        self.queue = Some(queue);
        self
    }

    /// Also wires in the indexer's queue when none was set
    pub fn with_indexer(mut self, indexer: Arc<ResilientIndexer>) -> Self {
        if self.queue.is_none() {
            self.queue = Some(Arc::clone(indexer.queue()));
        }
        self.indexer = Some(indexer);
        self
    }

    pub fn with_recent_failure_limit(mut self, limit: usize) -> Self {
        self.recent_failure_limit = limit;
        self
    }

    pub async fn get_health(&self) -> HealthSnapshot {
        let activity = self.sessions.as_ref().map(|source| source.activity());
        let service_running = activity
            .map(|a| a.running)
            .or_else(|| self.indexer.as_ref().map(|indexer| indexer.is_running()))
            .unwrap_or(true);
        let service = ServiceHealth {
            running: service_running,
            active_sessions: activity.map_or(0, |a| a.active_sessions),
            total_sessions: activity.map_or(0, |a| a.total_sessions),
        };

        let llm = match &self.availability {
            Some(availability) => LlmHealth {
                available: availability.peek_available().await,
                status: availability.status(),
            },
            None => LlmHealth {
                available: true,
                status: None,
            },
        };

        let (queue, recent_failures) = match &self.queue {
            Some(queue) => {
                let stats = queue.get_stats().await;
                let recent = queue
                    .list(true, self.recent_failure_limit)
                    .await
                    .into_iter()
                    .map(RecentFailure::from)
                    .collect();
                (Some(stats), recent)
            }
            None => (None, Vec::new()),
        };

        let pending = queue.as_ref().map_or(0, |stats| stats.pending_retries);
        let degradation_level = estimate_level(service.running, llm.available, pending);
        let indexer_degradation_level = match &self.indexer {
            Some(indexer) => Some(indexer.degradation_level().await),
            None => None,
        };

        HealthSnapshot {
            service,
            llm,
            queue,
            recent_failures,
            degradation_level,
            indexer_degradation_level,
            started_at: self.started_at,
            uptime_secs: self.started.elapsed().as_secs_f64(),
            generated_at: Utc::now(),
        }
    }
}

impl Default for StatusAggregator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::availability::FnAvailability;
    use futures::FutureExt;
    use resindex_queue::{NewFailedEpisode, RetryQueueConfig};
    use std::time::Duration;

    struct FixedActivity(SessionActivity);

    impl SessionActivitySource for FixedActivity {
        fn activity(&self) -> SessionActivity {
            self.0
        }
    }

    fn down() -> Arc<dyn LlmAvailability> {
        Arc::new(FnAvailability::new(Arc::new(|| async { false }.boxed())))
    }

    async fn queue_with(count: usize) -> Arc<RetryQueue> {
        let queue = RetryQueue::new(RetryQueueConfig {
            retry_delays: vec![Duration::from_secs(60)],
            ..Default::default()
        })
        .unwrap();
        for n in 0..count {
            queue
                .add(NewFailedEpisode::new(format!("ep-{n}"), "s", "g", "raw"))
                .await;
        }
        Arc::new(queue)
    }

    #[test]
    fn test_estimate_level() {
        assert_eq!(estimate_level(false, true, 0), DegradationLevel::RawOnly);
        assert_eq!(estimate_level(true, false, 0), DegradationLevel::RawOnly);
        assert_eq!(estimate_level(true, true, 3), DegradationLevel::Partial);
        assert_eq!(estimate_level(true, true, 0), DegradationLevel::Full);
    }

    #[tokio::test]
    async fn test_empty_aggregator_reports_full() {
        let snapshot = StatusAggregator::new().get_health().await;
        assert!(snapshot.service.running);
        assert!(snapshot.llm.available);
        assert!(snapshot.queue.is_none());
        assert_eq!(snapshot.degradation_level, DegradationLevel::Full);
        assert!(snapshot.indexer_degradation_level.is_none());
    }

    #[tokio::test]
    async fn test_pending_retries_mean_partial() {
        let aggregator = StatusAggregator::new()
            .with_sessions(Arc::new(FixedActivity(SessionActivity {
                running: true,
                active_sessions: 2,
                total_sessions: 7,
            })))
            .with_queue(queue_with(3).await)
            .with_recent_failure_limit(2);

        let snapshot = aggregator.get_health().await;
        assert_eq!(snapshot.service.active_sessions, 2);
        assert_eq!(snapshot.service.total_sessions, 7);
        assert_eq!(snapshot.queue.unwrap().pending_retries, 3);
        assert_eq!(snapshot.recent_failures.len(), 2);
        assert_eq!(snapshot.degradation_level, DegradationLevel::Partial);
    }

    #[tokio::test]
    async fn test_stopped_service_or_llm_down_is_raw_only() {
        let stopped = StatusAggregator::new().with_sessions(Arc::new(FixedActivity(
            SessionActivity::default(),
        )));
        assert_eq!(
            stopped.get_health().await.degradation_level,
            DegradationLevel::RawOnly
        );

        let llm_down = StatusAggregator::new().with_availability(down());
        let snapshot = llm_down.get_health().await;
        assert!(!snapshot.llm.available);
        assert_eq!(snapshot.degradation_level, DegradationLevel::RawOnly);
    }

    #[tokio::test]
    async fn test_snapshot_serializes() {
        let snapshot = StatusAggregator::new()
            .with_queue(queue_with(1).await)
            .get_health()
            .await;
        let value = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(value["degradation_level"], "PARTIAL");
        assert_eq!(value["recent_failures"][0]["episode_id"], "ep-0");
        assert!(value["uptime_secs"].as_f64().unwrap() >= 0.0);
    }
}
