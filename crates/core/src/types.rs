//! Shared enums used across the pipeline crates.

use crate::errors::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// How much of the normal indexing pipeline is currently operable.
///
/// The numeric value is stable and reported in health documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DegradationLevel {
    /// Dependency healthy, full extraction
    Full,
    /// Raw storage with retries queued
    Partial,
    /// Dependency unavailable and no retry path
    RawOnly,
}

impl DegradationLevel {
    pub fn as_u8(self) -> u8 {
        match self {
            DegradationLevel::Full => 0,
            DegradationLevel::Partial => 1,
            DegradationLevel::RawOnly => 2,
        }
    }

    /// Level derived from dependency availability and the configured policy.
    ///
    /// This is the authoritative mapping; nothing else assigns the level an
    /// indexer reports.
    pub fn derive(llm_available: bool, policy: UnavailablePolicy) -> Self {
        if llm_available {
            return DegradationLevel::Full;
        }
        match policy {
            UnavailablePolicy::Fail | UnavailablePolicy::StoreRaw => DegradationLevel::RawOnly,
            UnavailablePolicy::StoreRawAndRetry => DegradationLevel::Partial,
        }
    }
}

impl fmt::Display for DegradationLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DegradationLevel::Full => "FULL",
            DegradationLevel::Partial => "PARTIAL",
            DegradationLevel::RawOnly => "RAW_ONLY",
        };
        f.write_str(name)
    }
}

/// What the indexer does with an episode when the LLM cannot be used.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnavailablePolicy {
    /// Report failure, store nothing
    Fail,
    /// Store raw content only
    StoreRaw,
    /// Store raw content and queue a full retry
    #[default]
    StoreRawAndRetry,
}

impl fmt::Display for UnavailablePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UnavailablePolicy::Fail => "fail",
            UnavailablePolicy::StoreRaw => "store_raw",
            UnavailablePolicy::StoreRawAndRetry => "store_raw_and_retry",
        };
        f.write_str(name)
    }
}

impl FromStr for UnavailablePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "fail" => Ok(UnavailablePolicy::Fail),
            "store_raw" => Ok(UnavailablePolicy::StoreRaw),
            "store_raw_and_retry" => Ok(UnavailablePolicy::StoreRawAndRetry),
            other => Err(Error::configuration(format!(
                "unknown on_llm_unavailable policy '{other}' \
                 (expected fail, store_raw or store_raw_and_retry)"
            ))),
        }
    }
}
