//! Failure classification for retry decisions.
//!
//! Classification is a pure function of the error. Unknown failures are
//! retryable: work is retried rather than silently dropped.

use resindex_core::Error;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io::ErrorKind;

/// Phrases that identify credential problems regardless of transport
const AUTH_FAILURE_PHRASES: &[&str] = &[
    "invalid api key",
    "invalid_api_key",
    "incorrect api key",
    "api key not valid",
    "authentication failed",
    "authentication error",
    "unauthorized",
];

/// Broad failure category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCategory {
    /// Retrying cannot help (credentials, configuration)
    Permanent,
    /// Likely to succeed later (network, rate limit, server error)
    Transient,
    /// Not recognised
    Unknown,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorCategory::Permanent => "PERMANENT",
            ErrorCategory::Transient => "TRANSIENT",
            ErrorCategory::Unknown => "UNKNOWN",
        };
        f.write_str(name)
    }
}

/// Result of classifying one failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorClassification {
    pub error_type: ErrorCategory,
    pub message: String,
    pub status_code: Option<u16>,
    pub retryable: bool,
}

impl ErrorClassification {
    fn new(error_type: ErrorCategory, error: &Error) -> Self {
        Self {
            error_type,
            message: error.to_string(),
            status_code: error.status_code(),
            retryable: error_type != ErrorCategory::Permanent,
        }
    }
}

/// Classify an error as permanent, transient or unknown
pub fn classify(error: &Error) -> ErrorClassification {
    if let Some(status) = error.status_code() {
        match status {
            401 | 403 => return ErrorClassification::new(ErrorCategory::Permanent, error),
            429 | 500..=599 => return ErrorClassification::new(ErrorCategory::Transient, error),
            _ => {}
        }
    }

    let message = error.to_string().to_lowercase();
    if AUTH_FAILURE_PHRASES
        .iter()
        .any(|phrase| message.contains(phrase))
    {
        return ErrorClassification::new(ErrorCategory::Permanent, error);
    }

    let category = match error {
        Error::Network { .. } | Error::Timeout { .. } | Error::Unavailable { .. } => {
            ErrorCategory::Transient
        }
        Error::FileSystem { source, .. } if is_transient_io(source.kind()) => {
            ErrorCategory::Transient
        }
        _ => ErrorCategory::Unknown,
    };
    ErrorClassification::new(category, error)
}

fn is_transient_io(kind: ErrorKind) -> bool {
    matches!(
        kind,
        ErrorKind::Interrupted
            | ErrorKind::WouldBlock
            | ErrorKind::TimedOut
            | ErrorKind::ConnectionRefused
            | ErrorKind::ConnectionReset
            | ErrorKind::ConnectionAborted
            | ErrorKind::BrokenPipe
    )
}
