//! The extraction pass.
//!
//! [`extract_selected`] rewinds the source and walks it forward once more,
//! skipping unselected frames cheaply and decoding selected ones at high
//! quality. Each decoded frame is handed to a callback together with its
//! grid cell.
//!
//! If decoding fails or the stream ends before every selected frame was
//! reached, the pass stops and reports how many frames it delivered; the
//! frames already handed out stay valid.

use std::sync::Arc;

use crate::error::VidthumbError;
use crate::frame::FrameBuffer;
use crate::progress::{OperationType, ProgressCallback, ProgressTracker};
use crate::selection::{GridCell, SelectionPlan};
use crate::source::{DecodeSource, ScaleQuality};

/// Outcome of an extraction pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionReport {
    /// Frames delivered to the callback.
    pub placed: usize,
    /// Frames the plan asked for.
    pub requested: usize,
}

impl ExtractionReport {
    /// Whether every selected frame was delivered.
    pub fn is_complete(&self) -> bool {
        self.placed == self.requested
    }
}

/// Decode the frames in `plan` and pass each to `handler`.
///
/// # Errors
///
/// Returns an error if the source cannot be rewound or if `handler` fails.
/// Decode errors end the pass early and are reflected in the report.
pub fn extract_selected<F>(
    source: &mut dyn DecodeSource,
    plan: &SelectionPlan,
    progress: Arc<dyn ProgressCallback>,
    mut handler: F,
) -> Result<ExtractionReport, VidthumbError>
where
    F: FnMut(GridCell, &FrameBuffer) -> Result<(), VidthumbError>,
{
    source.rewind()?;

    let selected = plan.frames();
    let mut tracker = ProgressTracker::new(
        progress,
        OperationType::FrameExtraction,
        Some(selected.len() as u64),
        1,
    );

    let mut position = 0;
    let mut frame_index: u64 = 0;

    while let Some(&target) = selected.get(position) {
        if frame_index < target {
            match source.skip_frame() {
                Ok(true) => {}
                Ok(false) => {
                    log::warn!("Source ended at frame {frame_index}, before frame {target}");
                    break;
                }
                Err(error) => {
                    log::warn!("Extraction stopped at frame {frame_index}: {error}");
                    break;
                }
            }
        } else {
            let frame = match source.next_frame(ScaleQuality::High) {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    log::warn!("Source ended before selected frame {target}");
                    break;
                }
                Err(error) => {
                    log::warn!("Failed to decode selected frame {target}: {error}");
                    break;
                }
            };

            let cell = plan.cell(position);
            log::debug!(
                "{position}: frame {target} -> cell ({}, {})",
                cell.column,
                cell.row
            );
            handler(cell, &frame)?;
            tracker.advance(Some(target));
            position += 1;
        }
        frame_index += 1;
    }
    tracker.finish();

    Ok(ExtractionReport {
        placed: position,
        requested: selected.len(),
    })
}
