//! Progress reporting.
//!
//! Scanning a long video takes a while. This module provides
//! [`ProgressCallback`] for observing both passes of contact-sheet
//! generation, and [`ProgressInfo`] for the snapshots it receives.
//!
//! Totals come from [`DecodeSource::total_frame_count`](crate::DecodeSource::total_frame_count),
//! which is only an estimate for video files, so `current` may overrun
//! `total`. Percentages are clamped to 100.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use vidthumb::{ContactSheet, ProgressCallback, ProgressInfo, SheetOptions};
//!
//! struct PrintProgress;
//!
//! impl ProgressCallback for PrintProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         if let Some(pct) = info.percentage {
//!             println!("[{:?}] {pct:.1}% complete", info.operation);
//!         }
//!     }
//! }
//!
//! let options = SheetOptions::new().with_progress(Arc::new(PrintProgress));
//! let sheet = ContactSheet::generate("input.mp4", &options)?;
//! # Ok::<(), vidthumb::VidthumbError>(())
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};

/// The pass currently in progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[non_exhaustive]
pub enum OperationType {
    /// Scanning every frame for difference and contrast scores.
    FrameAnalysis,
    /// Decoding the selected frames for the sheet.
    FrameExtraction,
}

/// A snapshot of pass progress.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Which pass is running.
    pub operation: OperationType,
    /// Frames processed so far in this pass.
    pub current: u64,
    /// Frames expected, if known.
    pub total: Option<u64>,
    /// Completion percentage (0.0 – 100.0), if `total` is known.
    pub percentage: Option<f32>,
    /// Wall-clock time since the pass started.
    pub elapsed: Duration,
    /// Estimated time remaining, based on current throughput.
    pub estimated_remaining: Option<Duration>,
    /// Index of the frame just processed.
    pub current_frame: Option<u64>,
}

/// Trait for receiving progress updates.
///
/// Callbacks observe but cannot halt a pass.
pub trait ProgressCallback: Send + Sync {
    /// Called at regular intervals during a pass.
    fn on_progress(&self, info: &ProgressInfo);
}

/// Discards all progress notifications. The default.
pub(crate) struct NoOpProgress;

impl ProgressCallback for NoOpProgress {
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Tracks timing for one pass and emits callbacks.
pub(crate) struct ProgressTracker {
    callback: Arc<dyn ProgressCallback>,
    operation: OperationType,
    total: Option<u64>,
    current: u64,
    batch_size: u64,
    start_time: Instant,
    items_since_last_report: u64,
}

impl ProgressTracker {
    pub(crate) fn new(
        callback: Arc<dyn ProgressCallback>,
        operation: OperationType,
        total: Option<u64>,
        batch_size: u64,
    ) -> Self {
        Self {
            callback,
            operation,
            total: total.filter(|&t| t > 0),
            current: 0,
            batch_size: batch_size.max(1),
            start_time: Instant::now(),
            items_since_last_report: 0,
        }
    }

    /// Record one processed frame and report if the batch is full.
    pub(crate) fn advance(&mut self, frame_number: Option<u64>) {
        self.current += 1;
        self.items_since_last_report += 1;

        if self.items_since_last_report >= self.batch_size {
            self.report(frame_number);
            self.items_since_last_report = 0;
        }
    }

    /// Unconditionally emit a final report.
    pub(crate) fn finish(&mut self) {
        self.report(None);
    }

    fn report(&self, frame_number: Option<u64>) {
        let elapsed = self.start_time.elapsed();

        let percentage = self
            .total
            .map(|t| ((self.current as f32 / t as f32) * 100.0).min(100.0));

        let estimated_remaining = if self.current > 0 {
            self.total.and_then(|t| {
                let remaining = t.saturating_sub(self.current);
                let ratio = remaining as f64 / self.current as f64;
                Duration::try_from_secs_f64(elapsed.as_secs_f64() * ratio).ok()
            })
        } else {
            None
        };

        let info = ProgressInfo {
            operation: self.operation,
            current: self.current,
            total: self.total,
            percentage,
            elapsed,
            estimated_remaining,
            current_frame: frame_number,
        };

        self.callback.on_progress(&info);
    }
}
