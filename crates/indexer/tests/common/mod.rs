#![allow(dead_code)]

use async_trait::async_trait;
use futures::FutureExt;
use parking_lot::Mutex;
use resindex_core::{Error, Result};
use resindex_indexer::{
    EpisodeReceipt, EpisodeRequest, EpisodeStore, ExtractionMode, FnAvailability, LlmAvailability,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// In-memory store that records every call and fails on demand
#[derive(Default)]
pub struct RecordingStore {
    calls: Mutex<Vec<(ExtractionMode, EpisodeRequest)>>,
    fail_full: AtomicBool,
    fail_raw: AtomicBool,
}

impl RecordingStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn fail_full(&self, fail: bool) {
        self.fail_full.store(fail, Ordering::SeqCst);
    }

    pub fn fail_raw(&self, fail: bool) {
        self.fail_raw.store(fail, Ordering::SeqCst);
    }

    pub fn calls(&self) -> Vec<(ExtractionMode, EpisodeRequest)> {
        self.calls.lock().clone()
    }

    pub fn modes(&self) -> Vec<ExtractionMode> {
        self.calls.lock().iter().map(|(mode, _)| *mode).collect()
    }
}

#[async_trait]
impl EpisodeStore for RecordingStore {
    async fn add_episode(
        &self,
        request: &EpisodeRequest,
        mode: ExtractionMode,
    ) -> Result<EpisodeReceipt> {
        let n = {
            let mut calls = self.calls.lock();
            calls.push((mode, request.clone()));
            calls.len()
        };
        let failing = match mode {
            ExtractionMode::Full => self.fail_full.load(Ordering::SeqCst),
            ExtractionMode::Raw => self.fail_raw.load(Ordering::SeqCst),
        };
        if failing {
            return Err(Error::http("llm", 503, "service overloaded"));
        }
        Ok(EpisodeReceipt {
            episode_uuid: format!("uuid-{n}"),
            nodes_count: if mode == ExtractionMode::Full { 3 } else { 0 },
            edges_count: if mode == ExtractionMode::Full { 2 } else { 0 },
        })
    }
}

/// Availability switch shared between a test and the indexer
pub fn switch(initial: bool) -> (Arc<AtomicBool>, Arc<dyn LlmAvailability>) {
    let flag = Arc::new(AtomicBool::new(initial));
    let probe = Arc::clone(&flag);
    let availability = FnAvailability::new(Arc::new(move || {
        let up = probe.load(Ordering::SeqCst);
        async move { up }.boxed()
    }));
    (flag, Arc::new(availability))
}
