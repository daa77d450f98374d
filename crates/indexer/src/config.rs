//! Indexer configuration.

use resindex_config::IndexerSettings;
use resindex_core::{Result, UnavailablePolicy};
use resindex_queue::{ProcessorConfig, RetryQueueConfig};

/// Degradation policy plus the retry queue and processor it drives
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct IndexerConfig {
    pub on_llm_unavailable: UnavailablePolicy,
    pub queue: RetryQueueConfig,
    pub processor: ProcessorConfig,
}

impl IndexerConfig {
    pub fn validate(&self) -> Result<()> {
        self.queue.validate()
    }
}

impl From<&IndexerSettings> for IndexerConfig {
    fn from(settings: &IndexerSettings) -> Self {
        Self {
            on_llm_unavailable: settings.on_llm_unavailable,
            queue: RetryQueueConfig::from(settings),
            processor: ProcessorConfig {
                check_interval: settings.auto_recovery_interval(),
                process_timeout: settings.process_timeout(),
            },
        }
    }
}
