//! Settings value objects for resindex
//!
//! `Settings` is the single source of truth for tunables. It is validated at
//! construction (see [`crate::SettingsLoader`]) and not mutated afterwards.

use resindex_core::{
    Error, Result, UnavailablePolicy, APP_DIR_NAME, DEFAULT_AUTO_RECOVERY_INTERVAL_SECS,
    DEFAULT_FAILURE_THRESHOLD, DEFAULT_HALF_OPEN_MAX_CALLS, DEFAULT_HEALTH_HISTORY_SIZE,
    DEFAULT_MAX_QUEUE_SIZE, DEFAULT_MAX_RETRIES, DEFAULT_RECENT_FAILURE_LIMIT,
    DEFAULT_RECOVERY_TIMEOUT_SECS, DEFAULT_RETRY_DELAYS_SECS, RETRY_QUEUE_FILENAME,
};
use resindex_utils::resilience::CircuitBreakerConfig;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Complete settings for the indexing pipeline
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub llm: LlmSettings,
    pub indexer: IndexerSettings,
}

impl Settings {
    /// Check every section
    pub fn validate(&self) -> Result<()> {
        self.llm.validate()?;
        self.indexer.validate()
    }
}

/// LLM availability tracking
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmSettings {
    /// Consecutive failures before the circuit opens
    pub failure_threshold: u32,
    /// Seconds the circuit stays open before a trial call
    pub recovery_timeout_secs: u64,
    /// Trial calls allowed while half-open
    pub half_open_max_calls: u32,
    /// Health checks kept for the rolling success rate
    pub health_history_size: usize,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            failure_threshold: DEFAULT_FAILURE_THRESHOLD,
            recovery_timeout_secs: DEFAULT_RECOVERY_TIMEOUT_SECS,
            half_open_max_calls: DEFAULT_HALF_OPEN_MAX_CALLS,
            health_history_size: DEFAULT_HEALTH_HISTORY_SIZE,
        }
    }
}

impl LlmSettings {
    pub fn circuit_breaker_config(&self) -> CircuitBreakerConfig {
        CircuitBreakerConfig {
            failure_threshold: self.failure_threshold,
            recovery_timeout: Duration::from_secs(self.recovery_timeout_secs),
            half_open_max_calls: self.half_open_max_calls,
        }
    }

    pub fn validate(&self) -> Result<()> {
        self.circuit_breaker_config().validate()?;
        if self.health_history_size == 0 {
            return Err(Error::configuration(
                "llm.health_history_size must be at least 1",
            ));
        }
        Ok(())
    }
}

/// Indexer degradation policy and retry queue
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexerSettings {
    /// What to do with an episode while the LLM is unavailable
    pub on_llm_unavailable: UnavailablePolicy,
    /// Failed retries before an episode is marked permanently failed
    pub max_retries: u32,
    /// Backoff schedule; the last entry repeats once exhausted
    pub retry_delays_secs: Vec<u64>,
    /// Queue capacity; further failures are shed
    pub max_queue_size: usize,
    /// Persisted queue location; `None` keeps the queue in memory only
    pub retry_queue_path: Option<PathBuf>,
    /// Seconds between background retry passes
    pub auto_recovery_interval_secs: u64,
    /// Upper bound for one retry attempt; unbounded when unset
    pub process_timeout_secs: Option<u64>,
    /// Entries in the recent-failures list of health reports
    pub recent_failure_limit: usize,
}

impl Default for IndexerSettings {
    fn default() -> Self {
        Self {
            on_llm_unavailable: UnavailablePolicy::default(),
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delays_secs: DEFAULT_RETRY_DELAYS_SECS.to_vec(),
            max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
            retry_queue_path: default_retry_queue_path(),
            auto_recovery_interval_secs: DEFAULT_AUTO_RECOVERY_INTERVAL_SECS,
            process_timeout_secs: None,
            recent_failure_limit: DEFAULT_RECENT_FAILURE_LIMIT,
        }
    }
}

impl IndexerSettings {
    pub fn retry_delays(&self) -> Vec<Duration> {
        self.retry_delays_secs
            .iter()
            .map(|secs| Duration::from_secs(*secs))
            .collect()
    }

    pub fn auto_recovery_interval(&self) -> Duration {
        Duration::from_secs(self.auto_recovery_interval_secs)
    }

    pub fn process_timeout(&self) -> Option<Duration> {
        self.process_timeout_secs.map(Duration::from_secs)
    }

    pub fn validate(&self) -> Result<()> {
        if self.max_retries == 0 {
            return Err(Error::configuration("indexer.max_retries must be at least 1"));
        }
        if self.retry_delays_secs.is_empty() {
            return Err(Error::configuration(
                "indexer.retry_delays_secs must contain at least one delay",
            ));
        }
        if self.max_queue_size == 0 {
            return Err(Error::configuration(
                "indexer.max_queue_size must be at least 1",
            ));
        }
        if self.auto_recovery_interval_secs == 0 {
            return Err(Error::configuration(
                "indexer.auto_recovery_interval_secs must be greater than zero",
            ));
        }
        if self.process_timeout_secs == Some(0) {
            return Err(Error::configuration(
                "indexer.process_timeout_secs must be greater than zero when set",
            ));
        }
        Ok(())
    }
}

/// `<data dir>/resindex/retry_queue.json`, when a data directory exists
pub fn default_retry_queue_path() -> Option<PathBuf> {
    dirs::data_dir().map(|dir| dir.join(APP_DIR_NAME).join(RETRY_QUEUE_FILENAME))
}
