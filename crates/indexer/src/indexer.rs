//! Resilient episode indexer.
//!
//! Every request is tried with full extraction while the LLM is available.
//! Anything else, including a failed full attempt, goes through the
//! configured [`UnavailablePolicy`]; store errors never reach the caller.

use crate::availability::{AlwaysAvailable, LlmAvailability};
use crate::config::IndexerConfig;
use crate::session::SessionEpisode;
use crate::store::{EpisodeReceipt, EpisodeRequest, EpisodeStore, ExtractionMode};
use chrono::Utc;
use futures::FutureExt;
use resindex_core::{DegradationLevel, Error, Result, UnavailablePolicy};
use resindex_queue::{
    FailedEpisode, PermanentFailureCallback, ProcessFn, QueueStats, RetryQueue,
    RetryQueueProcessor,
};
use resindex_utils::resilience::{classify, AvailabilityStatus};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::Instrument;
use uuid::Uuid;

/// `error_type` recorded when the LLM was unavailable before any attempt
pub const LLM_UNAVAILABLE_ERROR_TYPE: &str = "LLM_UNAVAILABLE";

/// Outcome of one `index_session` call
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexResult {
    pub success: bool,
    pub episode_id: String,
    pub episode_uuid: Option<String>,
    pub degraded: bool,
    pub queued_for_retry: bool,
    /// Level the request was served at
    pub degradation_level: DegradationLevel,
    pub error: Option<String>,
}

/// Indexer view of its own health
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexerHealth {
    pub running: bool,
    pub degradation_level: DegradationLevel,
    pub on_llm_unavailable: UnavailablePolicy,
    pub llm_available: bool,
    pub llm_status: Option<AvailabilityStatus>,
    pub queue: QueueStats,
}

/// Builder for [`ResilientIndexer`]
pub struct IndexerBuilder {
    store: Arc<dyn EpisodeStore>,
    availability: Arc<dyn LlmAvailability>,
    config: IndexerConfig,
    on_permanent_failure: Option<PermanentFailureCallback>,
}

impl IndexerBuilder {
    pub fn availability(mut self, availability: Arc<dyn LlmAvailability>) -> Self {
        self.availability = availability;
        self
    }

    pub fn config(mut self, config: IndexerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn on_permanent_failure(mut self, callback: PermanentFailureCallback) -> Self {
        self.on_permanent_failure = Some(callback);
        self
    }

    /// Validate the configuration and wire the queue and processor
    pub fn build(self) -> Result<ResilientIndexer> {
        self.config.validate()?;

        let mut queue = RetryQueue::new(self.config.queue.clone())?;
        if let Some(callback) = self.on_permanent_failure {
            queue = queue.with_permanent_failure_callback(callback);
        }
        let queue = Arc::new(queue);

        // Active check: the processor asks only right before a replay, whose
        // outcome is then recorded
        let gate = Arc::clone(&self.availability);
        let processor = RetryQueueProcessor::gated(
            Arc::clone(&queue),
            replay_fn(Arc::clone(&self.store), Arc::clone(&self.availability)),
            Arc::new(move || {
                let gate = Arc::clone(&gate);
                async move { gate.is_available().await }.boxed()
            }),
            self.config.processor,
        );

        Ok(ResilientIndexer {
            store: self.store,
            availability: self.availability,
            policy: self.config.on_llm_unavailable,
            queue,
            processor,
            running: AtomicBool::new(false),
            lifecycle: tokio::sync::Mutex::new(()),
        })
    }
}

/// Orchestrates full indexing, degradation and retries
pub struct ResilientIndexer {
    store: Arc<dyn EpisodeStore>,
    availability: Arc<dyn LlmAvailability>,
    policy: UnavailablePolicy,
    queue: Arc<RetryQueue>,
    processor: RetryQueueProcessor,
    running: AtomicBool,
    lifecycle: tokio::sync::Mutex<()>,
}

impl ResilientIndexer {
    /// Start building an indexer over `store`; the LLM is assumed available
    /// unless an availability source is set
    pub fn builder(store: Arc<dyn EpisodeStore>) -> IndexerBuilder {
        IndexerBuilder {
            store,
            availability: Arc::new(AlwaysAvailable),
            config: IndexerConfig::default(),
            on_permanent_failure: None,
        }
    }

    /// Load the persisted queue and start background retries
    pub async fn start(&self) {
        let _guard = self.lifecycle.lock().await;
        if self.running.load(Ordering::SeqCst) {
            return;
        }
        self.queue.start().await;
        self.processor.start();
        self.running.store(true, Ordering::SeqCst);
        tracing::info!(policy = %self.policy, "resilient indexer started");
    }

    /// Stop background retries and persist the queue
    pub async fn stop(&self) {
        let _guard = self.lifecycle.lock().await;
        if !self.running.load(Ordering::SeqCst) {
            return;
        }
        self.processor.stop().await;
        self.queue.stop().await;
        self.running.store(false, Ordering::SeqCst);
        tracing::info!("resilient indexer stopped");
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    pub fn policy(&self) -> UnavailablePolicy {
        self.policy
    }

    pub fn queue(&self) -> &Arc<RetryQueue> {
        &self.queue
    }

    /// Index one session, degrading instead of failing when the LLM is down
    pub async fn index_session(&self, session: SessionEpisode) -> IndexResult {
        let span = resindex_utils::tracing::index_span(&session.session_id, &session.group_id);
        self.index_inner(session).instrument(span).await
    }

    async fn index_inner(&self, session: SessionEpisode) -> IndexResult {
        let episode_id = session
            .episode_id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        let request = session.to_request(Utc::now());

        let available = self.availability.is_available().await;
        let mut failure = None;

        if available {
            match self.store.add_episode(&request, ExtractionMode::Full).await {
                Ok(receipt) => {
                    self.availability.record_success();
                    tracing::info!(
                        episode_id = %episode_id,
                        episode_uuid = %receipt.episode_uuid,
                        nodes = receipt.nodes_count,
                        edges = receipt.edges_count,
                        "indexed session"
                    );
                    return IndexResult {
                        success: true,
                        episode_id,
                        episode_uuid: Some(receipt.episode_uuid),
                        degraded: false,
                        queued_for_retry: false,
                        degradation_level: DegradationLevel::Full,
                        error: None,
                    };
                }
                Err(e) => {
                    self.availability.record_failure(&e);
                    tracing::warn!(
                        episode_id = %episode_id,
                        error = %e,
                        "full indexing failed, falling back to degraded handling"
                    );
                    failure = Some(e);
                }
            }
        }

        self.index_degraded(&session, &request, episode_id, failure)
            .await
    }

    async fn index_degraded(
        &self,
        session: &SessionEpisode,
        request: &EpisodeRequest,
        episode_id: String,
        failure: Option<Error>,
    ) -> IndexResult {
        let level = DegradationLevel::derive(false, self.policy);
        resindex_utils::tracing::degraded_index(
            &session.session_id,
            &level.to_string(),
            &self.policy.to_string(),
        );

        let reason = failure
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_else(|| {
                Error::unavailable("llm", "full extraction skipped").to_string()
            });
        let mut result = IndexResult {
            success: false,
            episode_id,
            episode_uuid: None,
            degraded: true,
            queued_for_retry: false,
            degradation_level: level,
            error: None,
        };

        match self.policy {
            UnavailablePolicy::Fail => {
                result.degraded = false;
                result.error = Some(reason);
            }
            UnavailablePolicy::StoreRaw => match self.store_raw(request).await {
                Ok(receipt) => {
                    result.success = true;
                    result.episode_uuid = Some(receipt.episode_uuid);
                }
                Err(e) => result.error = Some(format!("raw storage failed: {e}")),
            },
            UnavailablePolicy::StoreRawAndRetry => {
                let raw = self.store_raw(request).await;

                let (error_type, error_message) = match &failure {
                    Some(e) => (classify(e).error_type.to_string(), e.to_string()),
                    None => (LLM_UNAVAILABLE_ERROR_TYPE.to_string(), reason),
                };
                let queued = self
                    .queue
                    .add(
                        session
                            .to_failed(&result.episode_id)
                            .error(error_type, error_message),
                    )
                    .await;
                result.queued_for_retry = queued.is_some();

                match raw {
                    Ok(receipt) => {
                        result.success = true;
                        result.episode_uuid = Some(receipt.episode_uuid);
                    }
                    Err(e) => {
                        // Still a success when the queue holds the content
                        result.success = result.queued_for_retry;
                        result.error = Some(format!("raw storage failed: {e}"));
                    }
                }
                if !result.queued_for_retry {
                    tracing::error!(
                        episode_id = %result.episode_id,
                        "retry queue full, episode will not be retried"
                    );
                }
            }
        }
        result
    }

    async fn store_raw(&self, request: &EpisodeRequest) -> Result<EpisodeReceipt> {
        self.store
            .add_episode(request, ExtractionMode::Raw)
            .await
            .inspect_err(|e| tracing::error!(error = %e, "raw storage failed"))
    }

    /// Level derived from a passive availability read and the policy
    pub async fn degradation_level(&self) -> DegradationLevel {
        DegradationLevel::derive(self.availability.peek_available().await, self.policy)
    }

    pub async fn get_health(&self) -> IndexerHealth {
        let llm_available = self.availability.peek_available().await;
        IndexerHealth {
            running: self.is_running(),
            degradation_level: DegradationLevel::derive(llm_available, self.policy),
            on_llm_unavailable: self.policy,
            llm_available,
            llm_status: self.availability.status(),
            queue: self.queue.get_stats().await,
        }
    }

    /// Queued episodes, most recent failure first
    pub async fn get_failed_episodes(
        &self,
        include_permanent: bool,
        limit: usize,
    ) -> Vec<FailedEpisode> {
        self.queue.list(include_permanent, limit).await
    }

    pub async fn clear_permanent_failures(&self) -> usize {
        self.queue.clear_permanent_failures().await
    }

    /// Run a retry pass immediately, returning how many episodes succeeded
    pub async fn retry_now(&self) -> usize {
        self.processor.process_now().await
    }
}

/// Replays a queued episode with full extraction, whatever the current level
fn replay_fn(store: Arc<dyn EpisodeStore>, availability: Arc<dyn LlmAvailability>) -> ProcessFn {
    Arc::new(move |episode: FailedEpisode| {
        let store = Arc::clone(&store);
        let availability = Arc::clone(&availability);
        async move {
            let request = SessionEpisode::from_failed(&episode).to_request(episode.failed_at);
            match store.add_episode(&request, ExtractionMode::Full).await {
                Ok(receipt) => {
                    availability.record_success();
                    tracing::debug!(
                        episode_id = %episode.episode_id,
                        episode_uuid = %receipt.episode_uuid,
                        "replayed episode"
                    );
                    Ok(true)
                }
                Err(e) => {
                    availability.record_failure(&e);
                    Err(e)
                }
            }
        }
        .boxed()
    })
}
