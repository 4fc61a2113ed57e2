//! Build pipeline: fetch and encode every catalog entry
//!
//! Entries run on a bounded worker pool. Each clip is fully independent (it
//! owns its intermediate files), so failures are isolated per clip and
//! aggregated into one report instead of aborting on the first error.
//!
//! Per-entry decision tree, keyed on what already exists in the working
//! directory:
//! - final OGG present: skip entirely
//! - WAV present, OGG missing: encode only
//! - neither: fetch then encode

use std::sync::Arc;

use futures::StreamExt;
use futures::stream;

use crate::catalog::{Catalog, SoundEntry};
use crate::encode::Transcoder;
use crate::fetch::VoiceSource;
use crate::store::ClipStore;
use crate::{Error, Result};

/// How a single clip was handled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClipStatus {
    /// Fetched and/or encoded
    Done,
    /// Final OGG already present, nothing to do
    Skipped,
}

/// A clip that could not be produced
#[derive(Debug, Clone)]
pub struct ClipFailure {
    /// Firmware clip index
    pub index: u32,
    /// What went wrong
    pub error: String,
}

/// Summary of a build run
#[derive(Debug, Default)]
pub struct BuildReport {
    /// Clips fetched and/or encoded this run
    pub done: usize,
    /// Clips skipped because their final OGG already existed
    pub skipped: usize,
    /// Clips that failed, sorted by index
    pub failed: Vec<ClipFailure>,
}

impl BuildReport {
    /// Whether every clip was produced or already present
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Runs fetch and encode across a catalog
pub struct Pipeline {
    source: Arc<dyn VoiceSource>,
    transcoder: Arc<dyn Transcoder>,
    store: ClipStore,
    workers: usize,
}

impl Pipeline {
    /// Create a pipeline over the given source, transcoder, and store
    #[must_use]
    pub fn new(
        source: Arc<dyn VoiceSource>,
        transcoder: Arc<dyn Transcoder>,
        store: ClipStore,
        workers: usize,
    ) -> Self {
        Self {
            source,
            transcoder,
            store,
            workers: workers.max(1),
        }
    }

    /// Process every catalog entry, bounded by the worker count.
    ///
    /// Always returns a report; per-clip failures are collected in it rather
    /// than aborting the run, so one unreachable clip still surfaces the
    /// status of every other clip.
    ///
    /// # Errors
    ///
    /// Returns error only for setup failures (working directories cannot be
    /// created) or an empty catalog.
    pub async fn run(&self, catalog: &Catalog) -> Result<BuildReport> {
        if catalog.is_empty() {
            return Err(Error::Catalog("catalog has no entries".to_string()));
        }
        self.store.ensure_dirs()?;

        tracing::info!(
            total = catalog.len(),
            workers = self.workers,
            source = self.source.name(),
            transcoder = self.transcoder.name(),
            "starting build"
        );

        let outcomes: Vec<(u32, Result<ClipStatus>)> =
            stream::iter(catalog.entries().iter().cloned())
                .map(|entry| async move { (entry.index, self.process_entry(&entry).await) })
                .buffer_unordered(self.workers)
                .collect()
                .await;

        let mut report = BuildReport::default();
        for (index, outcome) in outcomes {
            match outcome {
                Ok(ClipStatus::Done) => {
                    report.done += 1;
                    tracing::info!(index, "clip ready");
                }
                Ok(ClipStatus::Skipped) => {
                    report.skipped += 1;
                    tracing::debug!(index, "clip already present, skipped");
                }
                Err(e) => {
                    tracing::error!(index, error = %e, "clip failed");
                    report.failed.push(ClipFailure {
                        index,
                        error: e.to_string(),
                    });
                }
            }
        }
        report.failed.sort_by_key(|f| f.index);

        tracing::info!(
            done = report.done,
            skipped = report.skipped,
            failed = report.failed.len(),
            "build finished"
        );
        Ok(report)
    }

    /// Fetch and/or encode a single entry
    async fn process_entry(&self, entry: &SoundEntry) -> Result<ClipStatus> {
        // Stale outputs from older text revisions get moved aside first;
        // failure here degrades to a warning, it never fails the clip
        if let Err(e) = self.store.archive_stale(entry) {
            tracing::warn!(index = entry.index, error = %e, "failed to archive stale outputs");
        }

        let wav_path = self.store.wav_path(entry);
        let ogg_path = self.store.ogg_path(entry);

        if ogg_path.exists() {
            return Ok(ClipStatus::Skipped);
        }

        if !wav_path.exists() {
            tracing::debug!(index = entry.index, "fetching clip");
            self.source.fetch_wav(&entry.text, &wav_path).await?;
        }

        tracing::debug!(index = entry.index, "encoding clip");
        self.transcoder.transcode(&wav_path, &ogg_path).await?;

        if let Err(e) = tokio::fs::remove_file(&wav_path).await {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(index = entry.index, error = %e, "failed to remove intermediate wav");
            }
        }

        Ok(ClipStatus::Done)
    }
}
