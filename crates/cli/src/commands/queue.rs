use clap::Subcommand;
use resindex_config::Settings;
use resindex_core::{Error, Result};
use resindex_queue::{FailedEpisode, QueueStats, RetryQueue, RetryQueueConfig};
use std::fmt::Write;

#[derive(Subcommand, Debug)]
pub enum QueueCommands {
    /// Show queue statistics
    Stats {
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// List queued episodes, most recent failure first
    List {
        /// Include permanently failed episodes
        #[arg(long)]
        include_permanent: bool,
        /// Maximum number of episodes to show
        #[arg(long, default_value = "20")]
        limit: usize,
        /// Print JSON instead of text
        #[arg(long)]
        json: bool,
    },
    /// Remove one episode from the queue
    Remove {
        /// Episode ID
        episode_id: String,
    },
    /// Remove all permanently failed episodes
    Purge,
}

impl QueueCommands {
    pub async fn execute(self, settings: &Settings) -> Result<String> {
        let queue = open_queue(settings).await?;
        let output = match self {
            QueueCommands::Stats { json } => {
                let stats = queue.get_stats().await;
                if json {
                    serde_json::to_string_pretty(&stats)?
                } else {
                    render_stats(&stats)
                }
            }
            QueueCommands::List {
                include_permanent,
                limit,
                json,
            } => {
                let episodes = queue.list(include_permanent, limit).await;
                if json {
                    serde_json::to_string_pretty(&episodes)?
                } else {
                    render_episodes(&episodes)
                }
            }
            QueueCommands::Remove { episode_id } => {
                if !queue.remove(&episode_id).await {
                    return Err(Error::configuration(format!(
                        "episode '{episode_id}' is not in the retry queue"
                    )));
                }
                format!("Removed {episode_id}")
            }
            QueueCommands::Purge => {
                let removed = queue.clear_permanent_failures().await;
                format!("Removed {removed} permanently failed episode(s)")
            }
        };
        Ok(output)
    }
}

async fn open_queue(settings: &Settings) -> Result<RetryQueue> {
    let config = RetryQueueConfig::from(&settings.indexer);
    let Some(path) = config.persist_path.as_deref() else {
        return Err(Error::configuration(
            "retry queue persistence is disabled; pass --queue-file",
        ));
    };
    tracing::debug!(path = %path.display(), "opening retry queue");
    let queue = RetryQueue::new(config)?;
    queue.start().await;
    Ok(queue)
}

fn render_stats(stats: &QueueStats) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Retry queue:");
    let _ = writeln!(out, "  Size: {}/{}", stats.queue_size, stats.max_queue_size);
    let _ = writeln!(out, "  Pending retries: {}", stats.pending_retries);
    let _ = writeln!(out, "  Permanent failures: {}", stats.permanent_failures);
    if let Some(next) = stats.next_retry_at {
        let _ = writeln!(out, "  Next retry: {}", next.to_rfc3339());
    }
    if let Some(oldest) = stats.oldest_failure {
        let _ = writeln!(out, "  Oldest failure: {}", oldest.to_rfc3339());
    }
    let counters = &stats.counters;
    let _ = writeln!(out, "  Added: {}", counters.total_added);
    let _ = writeln!(out, "  Retried: {}", counters.total_retried);
    let _ = writeln!(out, "  Succeeded: {}", counters.total_succeeded);
    let _ = writeln!(out, "  Failed permanently: {}", counters.total_failed_permanently);
    let _ = write!(out, "  Dropped: {}", counters.total_dropped);
    out
}

fn render_episodes(episodes: &[FailedEpisode]) -> String {
    if episodes.is_empty() {
        return "No queued episodes".to_string();
    }
    let mut out = String::new();
    for episode in episodes {
        let status = if episode.permanent_failure {
            "permanent".to_string()
        } else {
            match episode.next_retry_at {
                Some(at) => format!("next {}", at.to_rfc3339()),
                None => "unscheduled".to_string(),
            }
        };
        let _ = writeln!(
            out,
            "{}  session={}  retries={}  {}  [{}] {}",
            episode.episode_id,
            episode.session_id,
            episode.retry_count,
            status,
            episode.error_type,
            episode.error_message
        );
    }
    out.truncate(out.trim_end().len());
    out
}
