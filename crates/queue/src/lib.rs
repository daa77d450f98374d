//! Durable retry queue for episodes that could not be fully indexed.
//!
//! - [`episode`] - The `FailedEpisode` record and its persisted form
//! - [`config`] - Queue capacity, backoff schedule and persistence path
//! - [`queue`] - The `RetryQueue` itself
//! - [`processor`] - Background loop that replays due episodes

pub mod config;
pub mod episode;
pub mod processor;
pub mod queue;

pub use config::RetryQueueConfig;
pub use episode::{FailedEpisode, NewFailedEpisode};
pub use processor::{AvailabilityFn, ProcessFn, ProcessorConfig, RetryQueueProcessor};
pub use queue::{PermanentFailureCallback, QueueCounters, QueueStats, RetryQueue};
