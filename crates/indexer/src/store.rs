//! Seam to the knowledge-graph store that performs extraction and storage.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use resindex_core::Result;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// How the store should treat an episode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionMode {
    /// Normal LLM-assisted entity extraction
    Full,
    /// Store the content as-is; must not touch the LLM
    Raw,
}

/// One episode as submitted to the store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodeRequest {
    pub name: String,
    pub content: String,
    pub group_id: String,
    pub source_description: String,
    pub reference_time: DateTime<Utc>,
    pub previous_episode_uuid: Option<String>,
    pub metadata: Map<String, Value>,
}

/// What the store reports after accepting an episode
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EpisodeReceipt {
    pub episode_uuid: String,
    pub nodes_count: usize,
    pub edges_count: usize,
}

/// Knowledge-graph store accepting episodes
#[async_trait]
pub trait EpisodeStore: Send + Sync {
    /// Add an episode. In [`ExtractionMode::Raw`] the implementation must not
    /// depend on the LLM.
    async fn add_episode(&self, request: &EpisodeRequest, mode: ExtractionMode)
        -> Result<EpisodeReceipt>;
}
