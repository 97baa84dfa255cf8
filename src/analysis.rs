//! The metrics pass.
//!
//! [`analyze`] scans a [`DecodeSource`] once from its first frame to
//! exhaustion using cheap scaling, scoring each frame by its
//! [difference](FrameBuffer::difference) from the previous frame and its
//! [contrast](FrameBuffer::contrast). The resulting [`FrameStatistics`] are
//! read-only input to the candidate filter.
//!
//! A decode failure part-way through ends the scan early. Statistics then
//! cover only the frames scanned before the failure.

use std::sync::Arc;

use crate::error::VidthumbError;
use crate::frame::FrameBuffer;
use crate::progress::{OperationType, ProgressCallback, ProgressTracker};
use crate::source::{DecodeSource, ScaleQuality, SourceState};

/// Upper bound on score storage reserved before the scan starts.
const PREALLOCATED_FRAMES: u64 = 1 << 16;

/// Per-frame scores and their distribution.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameStatistics {
    difference: Vec<f64>,
    contrast: Vec<f64>,
    any_difference_invalid: bool,
    mean_difference: f64,
    mean_contrast: f64,
    median_difference: f64,
    median_contrast: f64,
    max_frame_size: Option<(u32, u32)>,
    ended_early: bool,
}

impl FrameStatistics {
    /// Build statistics from parallel per-frame score sequences.
    ///
    /// `difference[i]` is frame `i`'s distance from frame `i - 1` (0 for the
    /// first frame, negative when incomparable) and `contrast[i]` its
    /// contrast.
    ///
    /// # Errors
    ///
    /// Returns [`VidthumbError::ScoreLengthMismatch`] if the two sequences
    /// differ in length.
    pub fn from_scores(difference: Vec<f64>, contrast: Vec<f64>) -> Result<Self, VidthumbError> {
        if difference.len() != contrast.len() {
            return Err(VidthumbError::ScoreLengthMismatch {
                difference: difference.len(),
                contrast: contrast.len(),
            });
        }

        let any_difference_invalid = difference.iter().any(|&value| value < 0.0);
        Ok(Self {
            mean_difference: mean(&difference),
            mean_contrast: mean(&contrast),
            median_difference: upper_median(&difference).unwrap_or(0.0),
            median_contrast: upper_median(&contrast).unwrap_or(0.0),
            difference,
            contrast,
            any_difference_invalid,
            max_frame_size: None,
            ended_early: false,
        })
    }

    /// Number of frames scanned.
    pub fn frame_count(&self) -> usize {
        self.difference.len()
    }

    /// Whether no frames were scanned.
    pub fn is_empty(&self) -> bool {
        self.difference.is_empty()
    }

    /// Difference score per frame.
    pub fn difference(&self) -> &[f64] {
        &self.difference
    }

    /// Contrast score per frame.
    pub fn contrast(&self) -> &[f64] {
        &self.contrast
    }

    /// Whether any frame's difference was [`INCOMPARABLE`](crate::frame::INCOMPARABLE).
    pub fn any_difference_invalid(&self) -> bool {
        self.any_difference_invalid
    }

    /// Arithmetic mean of all difference scores.
    pub fn mean_difference(&self) -> f64 {
        self.mean_difference
    }

    /// Arithmetic mean of all contrast scores.
    pub fn mean_contrast(&self) -> f64 {
        self.mean_contrast
    }

    /// Upper median of the difference scores; see [`upper_median`].
    pub fn median_difference(&self) -> f64 {
        self.median_difference
    }

    /// Upper median of the contrast scores; see [`upper_median`].
    pub fn median_contrast(&self) -> f64 {
        self.median_contrast
    }

    /// Largest frame width and height seen during the scan.
    pub fn max_frame_size(&self) -> Option<(u32, u32)> {
        self.max_frame_size
    }

    /// Whether the scan stopped on a decode error rather than end of stream.
    pub fn ended_early(&self) -> bool {
        self.ended_early
    }
}

/// The element at index `n / 2` of `values` sorted ascending.
///
/// For even lengths this is the upper of the two middle elements, not their
/// average. Returns `None` for an empty slice.
pub fn upper_median(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    Some(sorted[sorted.len() / 2])
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Scan `source` from its current position to exhaustion.
///
/// The source should be freshly opened or rewound; frame indices in the
/// result count from wherever the scan starts.
///
/// # Errors
///
/// Returns [`VidthumbError::InvalidState`] if the source is closed. Decode
/// errors during the scan are logged and end it early instead.
pub fn analyze(
    source: &mut dyn DecodeSource,
    progress: Arc<dyn ProgressCallback>,
    batch_size: u64,
) -> Result<FrameStatistics, VidthumbError> {
    if source.state() == SourceState::Closed {
        return Err(VidthumbError::InvalidState {
            operation: "analyze frames",
            state: SourceState::Closed,
        });
    }

    let total = source.total_frame_count();
    log::info!("Reading {total} frame differences");

    let mut tracker = ProgressTracker::new(
        progress,
        OperationType::FrameAnalysis,
        Some(total),
        batch_size,
    );

    // `total` is only an estimate.
    let capacity = total.min(PREALLOCATED_FRAMES) as usize;
    let mut difference = Vec::with_capacity(capacity);
    let mut contrast = Vec::with_capacity(capacity);
    let mut previous: Option<FrameBuffer> = None;
    let mut max_frame_size: Option<(u32, u32)> = None;
    let mut ended_early = false;

    loop {
        let frame = match source.next_frame(ScaleQuality::Fast) {
            Ok(Some(frame)) => frame,
            Ok(None) => break,
            Err(error) => {
                log::warn!(
                    "Frame analysis stopped after {} frames: {error}",
                    difference.len()
                );
                ended_early = true;
                break;
            }
        };

        let frame_difference = match &previous {
            Some(previous) => frame.difference(previous),
            None => 0.0,
        };
        if frame_difference < 0.0 {
            log::debug!(
                "Frame {} is incomparable with its predecessor",
                difference.len()
            );
        }
        difference.push(frame_difference);
        contrast.push(frame.contrast());

        max_frame_size = Some(match max_frame_size {
            Some((width, height)) => (width.max(frame.width()), height.max(frame.height())),
            None => (frame.width(), frame.height()),
        });

        tracker.advance(Some(difference.len() as u64 - 1));
        previous = Some(frame);
    }
    tracker.finish();

    let mut statistics = FrameStatistics::from_scores(difference, contrast)?;
    statistics.max_frame_size = max_frame_size;
    statistics.ended_early = ended_early;

    log::debug!(
        "mean diff: {:.6} mean contrast: {:.6} median contrast: {:.6} median diff: {:.6}",
        statistics.mean_difference,
        statistics.mean_contrast,
        statistics.median_contrast,
        statistics.median_difference
    );
    log::info!("Analysed {} frames", statistics.frame_count());

    Ok(statistics)
}
