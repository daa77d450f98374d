//! Persistent, capacity-bounded retry queue.
//!
//! Every operation runs under one async mutex that is held across
//! persistence, so the file on disk always reflects a complete map. Disk
//! failures are logged; the in-memory map stays authoritative.

use crate::config::RetryQueueConfig;
use crate::episode::{FailedEpisode, NewFailedEpisode};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use resindex_core::Result;
use resindex_utils::atomic_file::write_atomic_json;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, MutexGuard};

/// Called once when an episode exhausts its retries. Errors are logged.
pub type PermanentFailureCallback = Arc<dyn Fn(&FailedEpisode) -> Result<()> + Send + Sync>;

/// Lifetime counters; never reset by removing episodes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueueCounters {
    pub total_added: u64,
    pub total_retried: u64,
    pub total_succeeded: u64,
    pub total_failed_permanently: u64,
    /// Adds shed because the queue was full
    pub total_dropped: u64,
}

/// Point-in-time queue statistics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueueStats {
    pub queue_size: usize,
    /// Episodes still scheduled for a retry
    pub pending_retries: usize,
    pub permanent_failures: usize,
    /// Earliest scheduled retry
    pub next_retry_at: Option<DateTime<Utc>>,
    pub oldest_failure: Option<DateTime<Utc>>,
    pub max_queue_size: usize,
    #[serde(flatten)]
    pub counters: QueueCounters,
}

#[derive(Default)]
struct QueueState {
    episodes: IndexMap<String, FailedEpisode>,
    counters: QueueCounters,
    loaded: bool,
}

#[derive(Serialize)]
struct PersistedQueueRef<'a> {
    queue: &'a IndexMap<String, FailedEpisode>,
    stats: &'a QueueCounters,
    last_updated: DateTime<Utc>,
}

#[derive(Deserialize)]
struct PersistedQueue {
    queue: IndexMap<String, FailedEpisode>,
    #[serde(default)]
    stats: QueueCounters,
}

/// Durable map of failed episodes keyed by episode ID
pub struct RetryQueue {
    config: RetryQueueConfig,
    state: Mutex<QueueState>,
    on_permanent_failure: Option<PermanentFailureCallback>,
}

impl RetryQueue {
    /// Create a queue; persisted state is loaded on first use
    pub fn new(config: RetryQueueConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            state: Mutex::new(QueueState::default()),
            on_permanent_failure: None,
        })
    }

    pub fn with_permanent_failure_callback(mut self, callback: PermanentFailureCallback) -> Self {
        self.on_permanent_failure = Some(callback);
        self
    }

    pub fn config(&self) -> &RetryQueueConfig {
        &self.config
    }

    /// Load persisted state. Every other operation loads it on first use
    /// too, so calling this early only moves the disk read.
    pub async fn start(&self) {
        drop(self.lock().await);
    }

    /// Persist current state
    pub async fn stop(&self) {
        let state = self.lock().await;
        self.persist(&state);
    }

    /// Queue an episode for retry.
    ///
    /// Returns the existing record unchanged when the ID is already queued,
    /// and `None` when the queue is full.
    pub async fn add(&self, episode: NewFailedEpisode) -> Option<FailedEpisode> {
        self.add_at(episode, Utc::now()).await
    }

    /// [`RetryQueue::add`] with an explicit clock
    pub async fn add_at(&self, episode: NewFailedEpisode, now: DateTime<Utc>) -> Option<FailedEpisode> {
        let mut state = self.lock().await;

        if let Some(existing) = state.episodes.get(&episode.episode_id) {
            return Some(existing.clone());
        }

        if state.episodes.len() >= self.config.max_queue_size {
            state.counters.total_dropped += 1;
            tracing::warn!(
                episode_id = %episode.episode_id,
                max_queue_size = self.config.max_queue_size,
                "retry queue full, dropping episode"
            );
            return None;
        }

        let record = FailedEpisode {
            episode_id: episode.episode_id,
            session_id: episode.session_id,
            session_file: episode.session_file,
            group_id: episode.group_id,
            raw_content: episode.raw_content,
            error_type: episode.error_type,
            error_message: episode.error_message,
            failed_at: now,
            retry_count: 0,
            next_retry_at: Some(now + to_chrono(self.config.delay_for(0))),
            permanent_failure: false,
            last_retry_at: None,
            metadata: episode.metadata,
        };

        state
            .episodes
            .insert(record.episode_id.clone(), record.clone());
        state.counters.total_added += 1;
        self.persist(&state);

        resindex_utils::tracing::episode_queued(
            &record.episode_id,
            &record.session_id,
            &record.error_type,
        );
        Some(record)
    }

    pub async fn get(&self, episode_id: &str) -> Option<FailedEpisode> {
        self.lock().await.episodes.get(episode_id).cloned()
    }

    /// Episodes due for retry now
    pub async fn get_pending(&self) -> Vec<FailedEpisode> {
        self.get_pending_at(Utc::now()).await
    }

    /// Episodes due for retry at `now`, earliest schedule first
    pub async fn get_pending_at(&self, now: DateTime<Utc>) -> Vec<FailedEpisode> {
        let state = self.lock().await;
        let mut due: Vec<FailedEpisode> = state
            .episodes
            .values()
            .filter(|episode| episode.is_due(now))
            .cloned()
            .collect();
        due.sort_by_key(|episode| episode.next_retry_at);
        due
    }

    /// Remove an episode after a successful retry
    pub async fn mark_success(&self, episode_id: &str) -> bool {
        let mut state = self.lock().await;
        let Some(episode) = state.episodes.shift_remove(episode_id) else {
            return false;
        };
        state.counters.total_retried += 1;
        state.counters.total_succeeded += 1;
        self.persist(&state);

        resindex_utils::tracing::episode_retried(episode_id, episode.retry_count + 1, true);
        true
    }

    /// Record a failed retry. Returns true when another retry is scheduled,
    /// false when the episode is now permanently failed or unknown.
    pub async fn mark_retry_failed(&self, episode_id: &str, error_message: &str) -> bool {
        self.mark_retry_failed_at(episode_id, error_message, Utc::now())
            .await
    }

    /// [`RetryQueue::mark_retry_failed`] with an explicit clock
    pub async fn mark_retry_failed_at(
        &self,
        episode_id: &str,
        error_message: &str,
        now: DateTime<Utc>,
    ) -> bool {
        let mut state = self.lock().await;

        let Some(episode) = state.episodes.get_mut(episode_id) else {
            tracing::warn!(episode_id = %episode_id, "retry failure for unknown episode");
            return false;
        };

        episode.retry_count += 1;
        episode.last_retry_at = Some(now);
        episode.error_message = error_message.to_string();

        let retry_count = episode.retry_count;
        let newly_permanent = if retry_count >= self.config.max_retries {
            episode.permanent_failure = true;
            episode.next_retry_at = None;
            Some(episode.clone())
        } else {
            episode.next_retry_at = Some(now + to_chrono(self.config.delay_for(retry_count)));
            None
        };

        state.counters.total_retried += 1;
        if newly_permanent.is_some() {
            state.counters.total_failed_permanently += 1;
        }
        self.persist(&state);
        drop(state);

        resindex_utils::tracing::episode_retried(episode_id, retry_count, false);

        match newly_permanent {
            Some(episode) => {
                tracing::error!(
                    episode_id = %episode_id,
                    retry_count,
                    error = %error_message,
                    "episode permanently failed"
                );
                self.notify_permanent_failure(&episode);
                false
            }
            None => true,
        }
    }

    /// Remove an episode regardless of its state
    pub async fn remove(&self, episode_id: &str) -> bool {
        let mut state = self.lock().await;
        let removed = state.episodes.shift_remove(episode_id).is_some();
        if removed {
            self.persist(&state);
        }
        removed
    }

    /// Purge permanently failed episodes, returning how many were removed
    pub async fn clear_permanent_failures(&self) -> usize {
        let mut state = self.lock().await;
        let before = state.episodes.len();
        state.episodes.retain(|_, episode| !episode.permanent_failure);
        let removed = before - state.episodes.len();
        if removed > 0 {
            self.persist(&state);
            tracing::info!(removed, "cleared permanently failed episodes");
        }
        removed
    }

    /// Queued episodes, most recent failure first
    pub async fn list(&self, include_permanent: bool, limit: usize) -> Vec<FailedEpisode> {
        let state = self.lock().await;
        let mut episodes: Vec<FailedEpisode> = state
            .episodes
            .values()
            .filter(|episode| include_permanent || !episode.permanent_failure)
            .cloned()
            .collect();
        episodes.sort_by(|a, b| b.failed_at.cmp(&a.failed_at));
        episodes.truncate(limit);
        episodes
    }

    pub async fn len(&self) -> usize {
        self.lock().await.episodes.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    pub async fn get_stats(&self) -> QueueStats {
        let state = self.lock().await;
        let episodes = state.episodes.values();

        let mut stats = QueueStats {
            queue_size: state.episodes.len(),
            pending_retries: 0,
            permanent_failures: 0,
            next_retry_at: None,
            oldest_failure: None,
            max_queue_size: self.config.max_queue_size,
            counters: state.counters,
        };

        for episode in episodes {
            if episode.permanent_failure {
                stats.permanent_failures += 1;
            } else {
                stats.pending_retries += 1;
                stats.next_retry_at = min_time(stats.next_retry_at, episode.next_retry_at);
            }
            stats.oldest_failure = min_time(stats.oldest_failure, Some(episode.failed_at));
        }
        stats
    }

    /// Lock the state, merging the persisted file the first time
    async fn lock(&self) -> MutexGuard<'_, QueueState> {
        let mut state = self.state.lock().await;
        if !state.loaded {
            state.loaded = true;
            self.load_into(&mut state);
        }
        state
    }

    /// A missing file is normal; a corrupt file is logged and the queue
    /// starts empty.
    fn load_into(&self, state: &mut QueueState) {
        let Some(path) = self.config.persist_path.as_deref() else {
            return;
        };
        let Some(persisted) = load_persisted(path) else {
            return;
        };

        let loaded = persisted.queue.len();
        for (id, episode) in persisted.queue {
            state.episodes.entry(id).or_insert(episode);
        }
        state.counters = persisted.stats;
        tracing::info!(
            path = %path.display(),
            episodes = loaded,
            "loaded retry queue"
        );
    }

    fn notify_permanent_failure(&self, episode: &FailedEpisode) {
        let Some(callback) = &self.on_permanent_failure else {
            return;
        };
        if let Err(e) = callback(episode) {
            tracing::warn!(
                episode_id = %episode.episode_id,
                error = %e,
                "permanent failure callback failed"
            );
        }
    }

    fn persist(&self, state: &QueueState) {
        let Some(path) = self.config.persist_path.as_deref() else {
            return;
        };
        let snapshot = PersistedQueueRef {
            queue: &state.episodes,
            stats: &state.counters,
            last_updated: Utc::now(),
        };
        if let Err(e) = write_atomic_json(path, &snapshot) {
            tracing::error!(path = %path.display(), error = %e, "failed to persist retry queue");
        }
    }
}

fn load_persisted(path: &Path) -> Option<PersistedQueue> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::error!(path = %path.display(), error = %e, "failed to read retry queue");
            return None;
        }
    };
    match serde_json::from_str(&content) {
        Ok(persisted) => Some(persisted),
        Err(e) => {
            tracing::error!(
                path = %path.display(),
                error = %e,
                "corrupt retry queue file, starting empty"
            );
            None
        }
    }
}

fn to_chrono(delay: Duration) -> chrono::Duration {
    chrono::Duration::from_std(delay).unwrap_or_else(|_| chrono::Duration::days(36_500))
}

fn min_time(
    current: Option<DateTime<Utc>>,
    candidate: Option<DateTime<Utc>>,
) -> Option<DateTime<Utc>> {
    match (current, candidate) {
        (Some(a), Some(b)) => Some(a.min(b)),
        (a, b) => a.or(b),
    }
}
