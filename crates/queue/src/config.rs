//! Retry queue configuration.

use resindex_config::IndexerSettings;
use resindex_core::{
    Error, Result, DEFAULT_MAX_QUEUE_SIZE, DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAYS_SECS,
};
use std::path::PathBuf;
use std::time::Duration;

/// Capacity, backoff schedule and persistence for a [`crate::RetryQueue`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryQueueConfig {
    /// Failed retries before an episode is permanently failed
    pub max_retries: u32,
    /// Delay before retry N is `retry_delays[min(N, len - 1)]`
    pub retry_delays: Vec<Duration>,
    /// Adds beyond this size are dropped
    pub max_queue_size: usize,
    /// JSON file backing the queue; `None` means memory only
    pub persist_path: Option<PathBuf>,
}

impl Default for RetryQueueConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            retry_delays: DEFAULT_RETRY_DELAYS_SECS
                .iter()
                .map(|secs| Duration::from_secs(*secs))
                .collect(),
            max_queue_size: DEFAULT_MAX_QUEUE_SIZE,
            persist_path: None,
        }
    }
}

impl RetryQueueConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_retries == 0 {
            return Err(Error::configuration("retry queue max_retries must be at least 1"));
        }
        if self.retry_delays.is_empty() {
            return Err(Error::configuration(
                "retry queue needs at least one retry delay",
            ));
        }
        if self.max_queue_size == 0 {
            return Err(Error::configuration(
                "retry queue max_queue_size must be at least 1",
            ));
        }
        Ok(())
    }

    /// Delay applied after `retry_count` failed attempts; clamps to the last entry
    pub fn delay_for(&self, retry_count: u32) -> Duration {
        let last = self.retry_delays.len().saturating_sub(1);
        let index = (retry_count as usize).min(last);
        self.retry_delays.get(index).copied().unwrap_or_default()
    }
}

impl From<&IndexerSettings> for RetryQueueConfig {
    fn from(settings: &IndexerSettings) -> Self {
        Self {
            max_retries: settings.max_retries,
            retry_delays: settings.retry_delays(),
            max_queue_size: settings.max_queue_size,
            persist_path: settings.retry_queue_path.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_validation() {
        assert!(RetryQueueConfig::default().validate().is_ok());
        let config = RetryQueueConfig {
            retry_delays: vec![],
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_from_settings() {
        let settings = IndexerSettings {
            max_retries: 3,
            retry_delays_secs: vec![1, 2, 4],
            retry_queue_path: None,
            ..Default::default()
        };
        let config = RetryQueueConfig::from(&settings);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_delays[2], Duration::from_secs(4));
        assert!(config.persist_path.is_none());
    }

    proptest! {
        #[test]
        fn delay_clamps_to_last_entry(
            delays in proptest::collection::vec(1u64..10_000, 1..8),
            retry_count in 0u32..100,
        ) {
            let config = RetryQueueConfig {
                retry_delays: delays.iter().map(|s| Duration::from_secs(*s)).collect(),
                ..Default::default()
            };
            let expected = delays[(retry_count as usize).min(delays.len() - 1)];
            prop_assert_eq!(config.delay_for(retry_count), Duration::from_secs(expected));
        }
    }
}
