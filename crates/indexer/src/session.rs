//! Session indexing requests and their queued form.

use crate::store::EpisodeRequest;
use chrono::{DateTime, Utc};
use resindex_queue::{FailedEpisode, NewFailedEpisode};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const SESSION_NUMBER_KEY: &str = "session_number";
const REFERENCE_TIME_KEY: &str = "reference_time";
const PREVIOUS_EPISODE_KEY: &str = "previous_episode_uuid";

/// Filtered session content to be indexed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionEpisode {
    pub session_id: String,
    pub filtered_content: String,
    pub group_id: String,
    pub session_file: Option<String>,
    pub session_number: Option<u64>,
    pub reference_time: Option<DateTime<Utc>>,
    pub previous_episode_uuid: Option<String>,
    /// Stable ID for retries; generated when absent
    pub episode_id: Option<String>,
    pub metadata: Map<String, Value>,
}

impl SessionEpisode {
    pub fn new(
        session_id: impl Into<String>,
        filtered_content: impl Into<String>,
        group_id: impl Into<String>,
    ) -> Self {
        Self {
            session_id: session_id.into(),
            filtered_content: filtered_content.into(),
            group_id: group_id.into(),
            session_file: None,
            session_number: None,
            reference_time: None,
            previous_episode_uuid: None,
            episode_id: None,
            metadata: Map::new(),
        }
    }

    pub fn session_file(mut self, session_file: impl Into<String>) -> Self {
        self.session_file = Some(session_file.into());
        self
    }

    pub fn session_number(mut self, session_number: u64) -> Self {
        self.session_number = Some(session_number);
        self
    }

    pub fn reference_time(mut self, reference_time: DateTime<Utc>) -> Self {
        self.reference_time = Some(reference_time);
        self
    }

    pub fn previous_episode_uuid(mut self, uuid: impl Into<String>) -> Self {
        self.previous_episode_uuid = Some(uuid.into());
        self
    }

    pub fn episode_id(mut self, episode_id: impl Into<String>) -> Self {
        self.episode_id = Some(episode_id.into());
        self
    }

    pub fn metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }

    /// Build the store request. `now` fills a missing reference time.
    pub fn to_request(&self, now: DateTime<Utc>) -> EpisodeRequest {
        let name = match self.session_number {
            Some(number) => format!("Session {number}"),
            None => format!("Session {}", self.session_id),
        };
        let source_description = match &self.session_file {
            Some(file) => format!("session {} ({file})", self.session_id),
            None => format!("session {}", self.session_id),
        };
        EpisodeRequest {
            name,
            content: self.filtered_content.clone(),
            group_id: self.group_id.clone(),
            source_description,
            reference_time: self.reference_time.unwrap_or(now),
            previous_episode_uuid: self.previous_episode_uuid.clone(),
            metadata: self.metadata.clone(),
        }
    }

    /// Queue entry carrying everything needed to rebuild this request
    pub fn to_failed(&self, episode_id: &str) -> NewFailedEpisode {
        let mut metadata = self.metadata.clone();
        if let Some(number) = self.session_number {
            metadata.insert(SESSION_NUMBER_KEY.into(), Value::from(number));
        }
        if let Some(time) = self.reference_time {
            metadata.insert(REFERENCE_TIME_KEY.into(), Value::from(time.to_rfc3339()));
        }
        if let Some(uuid) = &self.previous_episode_uuid {
            metadata.insert(PREVIOUS_EPISODE_KEY.into(), Value::from(uuid.clone()));
        }

        let mut failed = NewFailedEpisode::new(
            episode_id,
            &self.session_id,
            &self.group_id,
            &self.filtered_content,
        )
        .metadata(metadata);
        if let Some(file) = &self.session_file {
            failed = failed.session_file(file);
        }
        failed
    }

    /// Rebuild the original request from a queued episode
    pub fn from_failed(episode: &FailedEpisode) -> Self {
        let mut metadata = episode.metadata.clone();
        let session_number = metadata
            .remove(SESSION_NUMBER_KEY)
            .and_then(|v| v.as_u64());
        let reference_time = metadata
            .remove(REFERENCE_TIME_KEY)
            .and_then(|v| v.as_str().map(str::to_owned))
            .and_then(|s| DateTime::parse_from_rfc3339(&s).ok())
            .map(|t| t.with_timezone(&Utc));
        let previous_episode_uuid = metadata
            .remove(PREVIOUS_EPISODE_KEY)
            .and_then(|v| v.as_str().map(str::to_owned));

        Self {
            session_id: episode.session_id.clone(),
            filtered_content: episode.raw_content.clone(),
            group_id: episode.group_id.clone(),
            session_file: episode.session_file.clone(),
            session_number,
            reference_time,
            previous_episode_uuid,
            episode_id: Some(episode.episode_id.clone()),
            metadata,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_queued_form_rebuilds_request() {
        let reference = Utc.with_ymd_and_hms(2025, 6, 1, 8, 30, 0).unwrap();
        let mut extra = Map::new();
        extra.insert("source".into(), Value::from("cli"));
        let session = SessionEpisode::new("sess-9", "did the thing", "proj")
            .session_file("/logs/sess-9.jsonl")
            .session_number(9)
            .reference_time(reference)
            .previous_episode_uuid("uuid-8")
            .metadata(extra);

        let queued = session.to_failed("ep-9");
        assert_eq!(queued.metadata["session_number"], 9);
        assert_eq!(queued.metadata["previous_episode_uuid"], "uuid-8");

        let episode = FailedEpisode {
            episode_id: queued.episode_id,
            session_id: queued.session_id,
            session_file: queued.session_file,
            group_id: queued.group_id,
            raw_content: queued.raw_content,
            error_type: queued.error_type,
            error_message: queued.error_message,
            failed_at: reference,
            retry_count: 0,
            next_retry_at: Some(reference),
            permanent_failure: false,
            last_retry_at: None,
            metadata: queued.metadata,
        };

        let rebuilt = SessionEpisode::from_failed(&episode);
        assert_eq!(rebuilt, session.clone().episode_id("ep-9"));
        assert_eq!(rebuilt.to_request(Utc::now()), session.to_request(Utc::now()));
    }

    #[test]
    fn test_request_defaults() {
        let now = Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap();
        let request = SessionEpisode::new("abc", "content", "g").to_request(now);
        assert_eq!(request.name, "Session abc");
        assert_eq!(request.source_description, "session abc");
        assert_eq!(request.reference_time, now);
        assert!(request.previous_episode_uuid.is_none());
    }
}
