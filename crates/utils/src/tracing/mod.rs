use resindex_core::RESINDEX_LOG_VAR;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

// Re-export tracing macros for convenience
pub use tracing::{debug, error, info, instrument, span, trace, warn, Level, Span};

/// Initialize the tracing system
///
/// The filter comes from `RESINDEX_LOG`, then `RUST_LOG`, then defaults to
/// `info`. Output goes to stderr so stdout stays free for command output.
/// `log` records emitted by dependencies are forwarded into the same
/// subscriber.
pub fn init() -> Result<(), Box<dyn std::error::Error + Send + Sync + 'static>> {
    let filter = EnvFilter::try_from_env(RESINDEX_LOG_VAR)
        .or_else(|_| EnvFilter::try_from_default_env())
        .or_else(|_| EnvFilter::try_new("info"))?;

    let fmt_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(is_tty())
        .compact()
        .with_target(false)
        .with_thread_ids(false)
        .with_level(true);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init()?;

    Ok(())
}

/// Check if we're running in a TTY environment
fn is_tty() -> bool {
    std::io::IsTerminal::is_terminal(&std::io::stderr())
}

/// Create a span covering one indexing request
pub fn index_span(session_id: &str, group_id: &str) -> Span {
    span!(Level::INFO, "index_session", session_id = %session_id, group_id = %group_id)
}

/// Emit a structured event for an episode entering the retry queue
pub fn episode_queued(episode_id: &str, session_id: &str, error_type: &str) {
    info!(
        episode_id = %episode_id,
        session_id = %session_id,
        error_type = %error_type,
        "episode_queued"
    );
}

/// Emit a structured event for a retry attempt outcome
pub fn episode_retried(episode_id: &str, retry_count: u32, success: bool) {
    if success {
        info!(
            episode_id = %episode_id,
            retry_count = %retry_count,
            "episode_retry_succeeded"
        );
    } else {
        warn!(
            episode_id = %episode_id,
            retry_count = %retry_count,
            "episode_retry_failed"
        );
    }
}

/// Emit a structured event for a request served in degraded mode
pub fn degraded_index(session_id: &str, level: &str, policy: &str) {
    warn!(
        session_id = %session_id,
        level = %level,
        policy = %policy,
        "degraded_index"
    );
}
