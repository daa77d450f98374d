//! Resilient episode indexing.
//!
//! [`ResilientIndexer`] sends episodes to an [`EpisodeStore`] with full
//! extraction while the LLM is available, and otherwise applies the
//! configured degradation policy, queueing episodes for later replay.
//! [`StatusAggregator`] reports the combined health of the pipeline and
//! [`AppContext`] wires everything together from [`resindex_config::Settings`].

pub mod availability;
pub mod config;
pub mod context;
pub mod indexer;
pub mod session;
pub mod status;
pub mod store;

pub use availability::{AlwaysAvailable, FnAvailability, LlmAvailability};
pub use config::IndexerConfig;
pub use context::{AppContext, AppContextBuilder};
pub use indexer::{
    IndexResult, IndexerBuilder, IndexerHealth, ResilientIndexer, LLM_UNAVAILABLE_ERROR_TYPE,
};
pub use session::SessionEpisode;
pub use status::{
    estimate_level, HealthSnapshot, LlmHealth, RecentFailure, ServiceHealth, SessionActivity,
    SessionActivitySource, StatusAggregator,
};
pub use store::{EpisodeReceipt, EpisodeRequest, EpisodeStore, ExtractionMode};
