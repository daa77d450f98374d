/// Constants used throughout the resindex codebase
// Environment variable names
pub const RESINDEX_LOG_VAR: &str = "RESINDEX_LOG";
pub const RESINDEX_CONFIG_VAR: &str = "RESINDEX_CONFIG";
pub const RESINDEX_ON_LLM_UNAVAILABLE_VAR: &str = "RESINDEX_ON_LLM_UNAVAILABLE";
pub const RESINDEX_MAX_RETRIES_VAR: &str = "RESINDEX_MAX_RETRIES";
pub const RESINDEX_RETRY_DELAYS_VAR: &str = "RESINDEX_RETRY_DELAYS";
pub const RESINDEX_MAX_QUEUE_SIZE_VAR: &str = "RESINDEX_MAX_QUEUE_SIZE";
pub const RESINDEX_RETRY_QUEUE_PATH_VAR: &str = "RESINDEX_RETRY_QUEUE_PATH";

// Application directory and file names
pub const APP_DIR_NAME: &str = "resindex";
pub const RETRY_QUEUE_FILENAME: &str = "retry_queue.json";

// Retry queue defaults
pub const DEFAULT_MAX_RETRIES: u32 = 5;
/// 5 minutes, 15 minutes, 1 hour, 2 hours, 4 hours
pub const DEFAULT_RETRY_DELAYS_SECS: &[u64] = &[300, 900, 3600, 7200, 14400];
pub const DEFAULT_MAX_QUEUE_SIZE: usize = 1000;
pub const DEFAULT_AUTO_RECOVERY_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_RECENT_FAILURE_LIMIT: usize = 10;

// Circuit breaker and health monitor defaults
pub const DEFAULT_FAILURE_THRESHOLD: u32 = 5;
pub const DEFAULT_RECOVERY_TIMEOUT_SECS: u64 = 60;
pub const DEFAULT_HALF_OPEN_MAX_CALLS: u32 = 3;
pub const DEFAULT_HEALTH_HISTORY_SIZE: usize = 10;

/// Message recorded when a retry handler reports failure without an error
pub const PROCESSING_RETURNED_FALSE: &str = "Processing returned False";
