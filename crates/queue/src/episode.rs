//! Failed episode records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A unit of work that could not be fully processed.
///
/// `failed_at` is fixed at creation; retry bookkeeping mutates the rest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FailedEpisode {
    pub episode_id: String,
    pub session_id: String,
    pub session_file: Option<String>,
    pub group_id: String,
    /// Exact payload to replay
    pub raw_content: String,
    pub error_type: String,
    pub error_message: String,
    pub failed_at: DateTime<Utc>,
    pub retry_count: u32,
    /// `None` once permanently failed
    pub next_retry_at: Option<DateTime<Utc>>,
    pub permanent_failure: bool,
    pub last_retry_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl FailedEpisode {
    /// Whether the episode should be retried at `now`
    pub fn is_due(&self, now: DateTime<Utc>) -> bool {
        !self.permanent_failure && self.next_retry_at.is_some_and(|at| at <= now)
    }
}

/// Input to [`crate::RetryQueue::add`]
#[derive(Debug, Clone, PartialEq)]
pub struct NewFailedEpisode {
    pub episode_id: String,
    pub session_id: String,
    pub session_file: Option<String>,
    pub group_id: String,
    pub raw_content: String,
    pub error_type: String,
    pub error_message: String,
    pub metadata: Map<String, Value>,
}

impl NewFailedEpisode {
    pub fn new(
        episode_id: impl Into<String>,
        session_id: impl Into<String>,
        group_id: impl Into<String>,
        raw_content: impl Into<String>,
    ) -> Self {
        Self {
            episode_id: episode_id.into(),
            session_id: session_id.into(),
            session_file: None,
            group_id: group_id.into(),
            raw_content: raw_content.into(),
            error_type: String::new(),
            error_message: String::new(),
            metadata: Map::new(),
        }
    }

    pub fn session_file(mut self, session_file: impl Into<String>) -> Self {
        self.session_file = Some(session_file.into());
        self
    }

    pub fn error(mut self, error_type: impl Into<String>, message: impl Into<String>) -> Self {
        self.error_type = error_type.into();
        self.error_message = message.into();
        self
    }

    pub fn metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.metadata = metadata;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn sample() -> FailedEpisode {
        let failed_at = Utc.with_ymd_and_hms(2025, 3, 14, 9, 26, 53).unwrap();
        let mut metadata = Map::new();
        metadata.insert("session_number".into(), Value::from(4));
        FailedEpisode {
            episode_id: "ep-1".into(),
            session_id: "sess-1".into(),
            session_file: Some("/logs/sess-1.jsonl".into()),
            group_id: "project-a".into(),
            raw_content: "line one\n  \u{1F600} tabs\there".into(),
            error_type: "TRANSIENT".into(),
            error_message: "HTTP 503".into(),
            failed_at,
            retry_count: 2,
            next_retry_at: Some(failed_at + Duration::seconds(900)),
            permanent_failure: false,
            last_retry_at: Some(failed_at + Duration::seconds(300)),
            metadata,
        }
    }

    #[test]
    fn test_json_round_trip_preserves_fields() {
        let episode = sample();
        let value = serde_json::to_value(&episode).unwrap();
        assert_eq!(value["failed_at"], "2025-03-14T09:26:53Z");
        assert_eq!(value["next_retry_at"], "2025-03-14T09:41:53Z");

        let back: FailedEpisode = serde_json::from_value(value).unwrap();
        assert_eq!(back, episode);
    }

    #[test]
    fn test_missing_metadata_defaults_to_empty() {
        let mut value = serde_json::to_value(sample()).unwrap();
        value.as_object_mut().unwrap().remove("metadata");
        let back: FailedEpisode = serde_json::from_value(value).unwrap();
        assert!(back.metadata.is_empty());
    }

    #[test]
    fn test_is_due() {
        let episode = sample();
        let at = episode.next_retry_at.unwrap();
        assert!(!episode.is_due(at - Duration::seconds(1)));
        assert!(episode.is_due(at));

        let mut permanent = episode;
        permanent.permanent_failure = true;
        permanent.next_retry_at = None;
        assert!(!permanent.is_due(at));
    }
}
