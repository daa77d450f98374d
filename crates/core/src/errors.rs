use std::path::PathBuf;

/// Result type alias for resindex operations
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for resindex operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Configuration errors
    #[error("configuration error: {message}")]
    Configuration { message: String },

    /// File system operations
    #[error("file system {operation} operation failed for '{path}': {source}")]
    FileSystem {
        path: PathBuf,
        operation: String,
        #[source]
        source: std::io::Error,
    },

    /// JSON serialization/deserialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// Connection-level failures talking to a dependency
    #[error("network error for '{endpoint}': {message}")]
    Network { endpoint: String, message: String },

    /// Operation timeout errors
    #[error("operation '{operation}' timed out after {duration:?}")]
    Timeout {
        operation: String,
        duration: std::time::Duration,
    },

    /// A dependency answered with an HTTP error status
    #[error("HTTP {status} from '{endpoint}': {message}")]
    Http {
        endpoint: String,
        status: u16,
        message: String,
    },

    /// Failure reported by an external collaborator without more structure
    #[error("{operation} failed: {message}")]
    Delegate { operation: String, message: String },

    /// A dependency is known to be down and was not called
    #[error("service '{service}' unavailable: {message}")]
    Unavailable { service: String, message: String },
}

impl From<std::io::Error> for Error {
    fn from(error: std::io::Error) -> Self {
        Error::FileSystem {
            path: PathBuf::new(),
            operation: "unknown".to_string(),
            source: error,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(error: serde_json::Error) -> Self {
        Error::Json {
            message: error.to_string(),
            source: error,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(error: anyhow::Error) -> Self {
        Error::Delegate {
            operation: "external call".to_string(),
            message: format!("{error:#}"),
        }
    }
}

impl Error {
    /// Create a configuration error
    #[must_use]
    pub fn configuration(message: impl Into<String>) -> Self {
        Error::Configuration {
            message: message.into(),
        }
    }

    /// Create a file system error with context
    #[must_use]
    pub fn file_system(
        path: impl Into<PathBuf>,
        operation: impl Into<String>,
        source: std::io::Error,
    ) -> Self {
        Error::FileSystem {
            path: path.into(),
            operation: operation.into(),
            source,
        }
    }

    /// Create a network error
    #[must_use]
    pub fn network(endpoint: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Network {
            endpoint: endpoint.into(),
            message: message.into(),
        }
    }

    /// Create a timeout error
    #[must_use]
    pub fn timeout(operation: impl Into<String>, duration: std::time::Duration) -> Self {
        Error::Timeout {
            operation: operation.into(),
            duration,
        }
    }

    /// Create an HTTP status error
    #[must_use]
    pub fn http(endpoint: impl Into<String>, status: u16, message: impl Into<String>) -> Self {
        Error::Http {
            endpoint: endpoint.into(),
            status,
            message: message.into(),
        }
    }

    /// Create a delegate failure
    #[must_use]
    pub fn delegate(operation: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Delegate {
            operation: operation.into(),
            message: message.into(),
        }
    }

    /// Create an unavailable-dependency error
    #[must_use]
    pub fn unavailable(service: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Unavailable {
            service: service.into(),
            message: message.into(),
        }
    }

    /// HTTP status attached to this error, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Http { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Short machine-friendly name of the variant
    pub fn kind_name(&self) -> &'static str {
        match self {
            Error::Configuration { .. } => "configuration",
            Error::FileSystem { .. } => "file_system",
            Error::Json { .. } => "json",
            Error::Network { .. } => "network",
            Error::Timeout { .. } => "timeout",
            Error::Http { .. } => "http",
            Error::Delegate { .. } => "delegate",
            Error::Unavailable { .. } => "unavailable",
        }
    }
}

// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to a Result
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a lazy message
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<Error>,
{
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let base_error = e.into();
            Error::Configuration {
                message: format!("{}: {}", message.into(), base_error),
            }
        })
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| {
            let base_error = e.into();
            Error::Configuration {
                message: format!("{}: {}", f(), base_error),
            }
        })
    }
}
