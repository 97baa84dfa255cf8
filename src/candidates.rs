//! The candidate filter.
//!
//! Frames that are too flat to be informative (fades, black frames, title
//! cards) or that differ sharply from their predecessor (cuts, flashes,
//! decode glitches) make poor thumbnails. [`filter_candidates`] drops them
//! using thresholds relative to the medians in [`FrameStatistics`].

use crate::analysis::FrameStatistics;

/// Frames below this fraction of the median contrast are dropped.
pub const CONTRAST_FLOOR: f64 = 0.5;

/// Frames above this multiple of the median difference are dropped.
pub const DIFFERENCE_CEILING: f64 = 2.0;

/// Frame indices still eligible for selection, in ascending scan order.
///
/// A candidate set only ever shrinks: it starts as every scanned frame and
/// filtering removes indices without reordering the rest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateSet {
    frames: Vec<u64>,
}

impl CandidateSet {
    /// Every frame in `0..frame_count`.
    pub fn all(frame_count: usize) -> Self {
        Self {
            frames: (0..frame_count as u64).collect(),
        }
    }

    /// Surviving frame indices.
    pub fn frames(&self) -> &[u64] {
        &self.frames
    }

    /// Number of candidates.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether no candidates remain.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Whether `frame` is still a candidate.
    pub fn contains(&self, frame: u64) -> bool {
        self.frames.binary_search(&frame).is_ok()
    }

    fn retain<F: FnMut(u64) -> bool>(&mut self, mut keep: F) {
        self.frames.retain(|&frame| keep(frame));
    }
}

/// Whether frame `index` should be dropped.
///
/// A frame is dropped when its contrast is below half the median contrast,
/// or, provided every difference score in the run was valid, when its
/// difference exceeds twice the median difference. A single incomparable
/// frame anywhere disables the difference test for every frame.
pub fn is_uninformative(statistics: &FrameStatistics, index: usize) -> bool {
    let too_flat = statistics.contrast()[index] < statistics.median_contrast() * CONTRAST_FLOOR;
    let too_different = !statistics.any_difference_invalid()
        && statistics.difference()[index] > statistics.median_difference() * DIFFERENCE_CEILING;
    too_flat || too_different
}

/// Build the candidate set for a sheet of `thumbnail_count` cells.
///
/// Filtering is skipped entirely when there are already fewer frames than
/// cells, so that scarce frames stay available to the sampler.
pub fn filter_candidates(statistics: &FrameStatistics, thumbnail_count: usize) -> CandidateSet {
    let mut candidates = CandidateSet::all(statistics.frame_count());

    if candidates.len() < thumbnail_count {
        log::debug!(
            "Only {} frames for {thumbnail_count} thumbnails, keeping all",
            candidates.len()
        );
        return candidates;
    }

    if statistics.any_difference_invalid() {
        log::debug!("Incomparable frames found, difference filtering disabled");
    }

    candidates.retain(|frame| !is_uninformative(statistics, frame as usize));
    log::debug!(
        "{} of {} frames remain after filtering",
        candidates.len(),
        statistics.frame_count()
    );
    candidates
}
