//! Rebuild progress reporting.
//!
//! A rebuild walks every record in the store, so long passes report progress
//! through a [`ProgressCallback`] every [`PROGRESS_INTERVAL`] records and
//! once more on completion.

use serde::Serialize;
use tracing::info;

/// Records processed between progress reports.
pub const PROGRESS_INTERVAL: u64 = 100;

/// Progress tracking for rebuild operations.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RebuildProgress {
    /// Total records appended to the index.
    pub total_processed: u64,
    /// Records whose stored embedding was reused.
    pub reused: u64,
    /// Records embedded during the rebuild and written back.
    pub embedded: u64,
    /// Whether the rebuild ran to the end.
    pub completed: bool,
}

impl RebuildProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_reused(&mut self) {
        self.reused += 1;
        self.total_processed += 1;
    }

    pub fn record_embedded(&mut self) {
        self.embedded += 1;
        self.total_processed += 1;
    }

    pub fn mark_completed(&mut self) {
        self.completed = true;
    }

    /// Whether a report is due after the latest record.
    pub fn at_interval(&self) -> bool {
        self.total_processed > 0 && self.total_processed % PROGRESS_INTERVAL == 0
    }
}

/// Result of a rebuild operation.
#[derive(Debug, Clone, Serialize)]
pub struct RebuildResult {
    /// Progress statistics.
    pub progress: RebuildProgress,
    /// Time taken in milliseconds.
    pub elapsed_ms: u64,
}

/// Trait for receiving rebuild progress updates.
pub trait ProgressCallback: Send + Sync {
    fn on_progress(&self, progress: &RebuildProgress);
}

/// Ignores every update.
pub struct NoOpProgressCallback;

impl ProgressCallback for NoOpProgressCallback {
    fn on_progress(&self, _progress: &RebuildProgress) {}
}

/// Logs each update at info level.
pub struct LoggingProgressCallback;

impl ProgressCallback for LoggingProgressCallback {
    fn on_progress(&self, progress: &RebuildProgress) {
        info!(
            processed = progress.total_processed,
            reused = progress.reused,
            embedded = progress.embedded,
            completed = progress.completed,
            "Rebuild progress"
        );
    }
}
