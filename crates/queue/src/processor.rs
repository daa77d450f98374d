//! Background task that replays due episodes from a [`RetryQueue`].

use crate::episode::FailedEpisode;
use crate::queue::RetryQueue;
use futures::future::BoxFuture;
use parking_lot::Mutex;
use resindex_core::{Error, Result, DEFAULT_AUTO_RECOVERY_INTERVAL_SECS, PROCESSING_RETURNED_FALSE};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Replays one episode. `Ok(true)` removes it from the queue; `Ok(false)`
/// and `Err(_)` count as a failed retry.
pub type ProcessFn = Arc<dyn Fn(FailedEpisode) -> BoxFuture<'static, Result<bool>> + Send + Sync>;

/// Gate consulted right before each replay. A true answer may admit a
/// recovery trial, so it is only asked when a replay will follow.
pub type AvailabilityFn = Arc<dyn Fn() -> BoxFuture<'static, bool> + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProcessorConfig {
    /// Pause between passes
    pub check_interval: Duration,
    /// Upper bound for a single replay; `None` waits indefinitely
    pub process_timeout: Option<Duration>,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            check_interval: Duration::from_secs(DEFAULT_AUTO_RECOVERY_INTERVAL_SECS),
            process_timeout: None,
        }
    }
}

struct ProcessorInner {
    queue: Arc<RetryQueue>,
    process_fn: ProcessFn,
    availability: Option<AvailabilityFn>,
    config: ProcessorConfig,
    pass: tokio::sync::Mutex<()>,
}

/// Periodically drains due episodes through a process function
pub struct RetryQueueProcessor {
    inner: Arc<ProcessorInner>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl RetryQueueProcessor {
    pub fn new(queue: Arc<RetryQueue>, process_fn: ProcessFn, config: ProcessorConfig) -> Self {
        Self::build(queue, process_fn, None, config)
    }

    /// Processor that replays only while `availability` reports the
    /// dependency as up
    pub fn gated(
        queue: Arc<RetryQueue>,
        process_fn: ProcessFn,
        availability: AvailabilityFn,
        config: ProcessorConfig,
    ) -> Self {
        Self::build(queue, process_fn, Some(availability), config)
    }

    fn build(
        queue: Arc<RetryQueue>,
        process_fn: ProcessFn,
        availability: Option<AvailabilityFn>,
        config: ProcessorConfig,
    ) -> Self {
        Self {
            inner: Arc::new(ProcessorInner {
                queue,
                process_fn,
                availability,
                config,
                pass: tokio::sync::Mutex::new(()),
            }),
            handle: Mutex::new(None),
        }
    }

    /// Spawn the background loop. Calling it while running is a no-op.
    pub fn start(&self) {
        let mut handle = self.handle.lock();
        if handle.as_ref().is_some_and(|h| !h.is_finished()) {
            return;
        }

        let inner = Arc::clone(&self.inner);
        let check_interval = inner.config.check_interval;
        *handle = Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(check_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            // The first tick completes immediately
            interval.tick().await;

            loop {
                interval.tick().await;
                let processed = inner.process_due().await;
                if processed > 0 {
                    tracing::info!(processed, "retry pass complete");
                }
            }
        }));
        tracing::info!(
            check_interval_secs = check_interval.as_secs_f64(),
            "retry processor started"
        );
    }

    /// Cancel the loop and wait for it to exit. An in-flight replay is
    /// abandoned; its episode stays queued with unchanged bookkeeping.
    pub async fn stop(&self) {
        let handle = self.handle.lock().take();
        let Some(handle) = handle else {
            return;
        };
        handle.abort();
        match handle.await {
            Ok(()) => {}
            Err(e) if e.is_cancelled() => {}
            Err(e) => tracing::warn!(error = %e, "retry processor exited abnormally"),
        }
        tracing::info!("retry processor stopped");
    }

    pub fn is_running(&self) -> bool {
        self.handle
            .lock()
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Run one pass immediately, returning how many episodes succeeded
    pub async fn process_now(&self) -> usize {
        self.inner.process_due().await
    }
}

impl Drop for RetryQueueProcessor {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.get_mut().take() {
            handle.abort();
        }
    }
}

impl ProcessorInner {
    async fn process_due(&self) -> usize {
        // Serializes the timer loop and manual triggers
        let _pass = self.pass.lock().await;

        let due = self.queue.get_pending().await;
        if due.is_empty() {
            return 0;
        }
        tracing::debug!(due = due.len(), "processing due episodes");

        let mut succeeded = 0;
        for episode in due {
            if !self.admitted().await {
                tracing::debug!("dependency unavailable, ending retry pass");
                break;
            }
            let episode_id = episode.episode_id.clone();
            match self.replay(episode).await {
                Ok(true) => {
                    if self.queue.mark_success(&episode_id).await {
                        succeeded += 1;
                    }
                }
                Ok(false) => {
                    self.queue
                        .mark_retry_failed(&episode_id, PROCESSING_RETURNED_FALSE)
                        .await;
                }
                Err(e) => {
                    self.queue
                        .mark_retry_failed(&episode_id, &e.to_string())
                        .await;
                }
            }
        }
        succeeded
    }

    async fn admitted(&self) -> bool {
        match &self.availability {
            Some(availability) => availability().await,
            None => true,
        }
    }

    async fn replay(&self, episode: FailedEpisode) -> Result<bool> {
        let future = (self.process_fn)(episode);
        match self.config.process_timeout {
            None => future.await,
            Some(limit) => tokio::time::timeout(limit, future)
                .await
                .map_err(|_| Error::timeout("episode replay", limit))?,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetryQueueConfig;
    use crate::episode::NewFailedEpisode;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

    async fn queue_with(ids: &[&str]) -> Arc<RetryQueue> {
        let queue = RetryQueue::new(RetryQueueConfig {
            max_retries: 3,
            retry_delays: vec![Duration::ZERO],
            max_queue_size: 10,
            persist_path: None,
        })
        .unwrap();
        for id in ids {
            queue
                .add(NewFailedEpisode::new(*id, "sess", "group", format!("raw {id}")))
                .await;
        }
        Arc::new(queue)
    }

    fn process_fn<F>(f: F) -> ProcessFn
    where
        F: Fn(FailedEpisode) -> Result<bool> + Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Arc::new(move |episode: FailedEpisode| {
            let f = Arc::clone(&f);
            async move { f(episode) }.boxed()
        })
    }

    #[tokio::test]
    async fn test_successful_pass_drains_queue() {
        let queue = queue_with(&["ep-1"]).await;
        let processor = RetryQueueProcessor::new(
            Arc::clone(&queue),
            process_fn(|_| Ok(true)),
            ProcessorConfig::default(),
        );

        assert_eq!(processor.process_now().await, 1);
        assert!(queue.is_empty().await);
        assert_eq!(processor.process_now().await, 0);
    }

    #[tokio::test]
    async fn test_failures_are_isolated_per_episode() {
        let queue = queue_with(&["ok", "false", "err"]).await;
        let processor = RetryQueueProcessor::new(
            Arc::clone(&queue),
            process_fn(|episode| match episode.episode_id.as_str() {
                "ok" => Ok(true),
                "false" => Ok(false),
                _ => Err(Error::network("llm", "connection reset")),
            }),
            ProcessorConfig::default(),
        );

        assert_eq!(processor.process_now().await, 1);
        assert!(queue.get("ok").await.is_none());

        let returned_false = queue.get("false").await.unwrap();
        assert_eq!(returned_false.retry_count, 1);
        assert_eq!(returned_false.error_message, PROCESSING_RETURNED_FALSE);

        let errored = queue.get("err").await.unwrap();
        assert_eq!(errored.retry_count, 1);
        assert!(errored.error_message.contains("connection reset"));
    }

    #[tokio::test]
    async fn test_pass_skipped_while_unavailable() {
        let queue = queue_with(&["ep-1"]).await;
        let available = Arc::new(AtomicBool::new(false));
        let calls = Arc::new(AtomicUsize::new(0));

        let gate = Arc::clone(&available);
        let counter = Arc::clone(&calls);
        let processor = RetryQueueProcessor::gated(
            Arc::clone(&queue),
            process_fn(move |_| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(true)
            }),
            Arc::new(move || {
                let up = gate.load(Ordering::SeqCst);
                async move { up }.boxed()
            }),
            ProcessorConfig::default(),
        );

        assert_eq!(processor.process_now().await, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        assert_eq!(queue.get("ep-1").await.unwrap().retry_count, 0);

        available.store(true, Ordering::SeqCst);
        assert_eq!(processor.process_now().await, 1);
    }

    #[tokio::test]
    async fn test_gate_asked_only_before_a_replay() {
        let queue = queue_with(&[]).await;
        let asked = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&asked);
        // Admits exactly one call, like a half-open breaker with one trial
        let processor = RetryQueueProcessor::gated(
            Arc::clone(&queue),
            process_fn(|_| Ok(false)),
            Arc::new(move || {
                let n = counter.fetch_add(1, Ordering::SeqCst);
                async move { n == 0 }.boxed()
            }),
            ProcessorConfig::default(),
        );

        assert_eq!(processor.process_now().await, 0);
        assert_eq!(asked.load(Ordering::SeqCst), 0);

        for id in ["a", "b", "c"] {
            queue
                .add(NewFailedEpisode::new(id, "sess", "group", "raw"))
                .await;
        }
        processor.process_now().await;

        // First replay admitted, second refused, third never reached
        assert_eq!(asked.load(Ordering::SeqCst), 2);
        let retried: u32 = queue
            .list(true, 10)
            .await
            .iter()
            .map(|episode| episode.retry_count)
            .sum();
        assert_eq!(retried, 1);
    }

    #[tokio::test]
    async fn test_overlapping_passes_replay_once() {
        let queue = RetryQueue::new(RetryQueueConfig {
            max_retries: 5,
            retry_delays: vec![Duration::from_secs(60)],
            max_queue_size: 10,
            persist_path: None,
        })
        .unwrap();
        queue
            .add_at(
                NewFailedEpisode::new("ep-1", "sess", "group", "raw"),
                chrono::Utc::now() - chrono::Duration::hours(1),
            )
            .await;
        let queue = Arc::new(queue);

        let processor = RetryQueueProcessor::new(
            Arc::clone(&queue),
            Arc::new(|_: FailedEpisode| {
                async {
                    tokio::time::sleep(Duration::from_millis(50)).await;
                    Ok(false)
                }
                .boxed()
            }),
            ProcessorConfig::default(),
        );

        let (first, second) = tokio::join!(processor.process_now(), processor.process_now());
        assert_eq!(first + second, 0);
        assert_eq!(queue.get("ep-1").await.unwrap().retry_count, 1);
    }

    #[tokio::test]
    async fn test_timeout_counts_as_failed_retry() {
        let queue = queue_with(&["slow"]).await;
        let processor = RetryQueueProcessor::new(
            Arc::clone(&queue),
            Arc::new(|_: FailedEpisode| {
                async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    Ok(true)
                }
                .boxed()
            }),
            ProcessorConfig {
                check_interval: Duration::from_secs(60),
                process_timeout: Some(Duration::from_millis(20)),
            },
        );

        assert_eq!(processor.process_now().await, 0);
        let episode = queue.get("slow").await.unwrap();
        assert_eq!(episode.retry_count, 1);
        assert!(episode.error_message.contains("timed out"));
    }

    #[tokio::test]
    async fn test_background_loop_start_and_stop() {
        let queue = queue_with(&["ep-1"]).await;
        let processor = RetryQueueProcessor::new(
            Arc::clone(&queue),
            process_fn(|_| Ok(true)),
            ProcessorConfig {
                check_interval: Duration::from_millis(10),
                process_timeout: None,
            },
        );

        assert!(!processor.is_running());
        processor.start();
        processor.start();
        assert!(processor.is_running());

        for _ in 0..100 {
            if queue.is_empty().await {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert!(queue.is_empty().await);

        processor.stop().await;
        assert!(!processor.is_running());
        processor.stop().await;
    }
}
