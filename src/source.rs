//! The decode-source capability shared by every backend.
//!
//! A [`DecodeSource`] turns a media file into a forward-only sequence of
//! [`FrameBuffer`]s, each scaled to fit the source's [`TargetBox`]. Two
//! backends implement it: [`ArchiveSource`](crate::ArchiveSource) for ZIP
//! archives of still images and [`VideoSource`](crate::VideoSource) for
//! anything FFmpeg can demux. [`open_source`](crate::open_source) picks one
//! by probing.
//!
//! Sources are stateful and non-reentrant. Their lifecycle is a small state
//! machine:
//!
//! ```text
//!            open            end of stream
//! Closed ──────────▶ Scanning ───────────▶ Exhausted
//!                      ▲                      │
//!                      └────── rewind ────────┘
//! ```
//!
//! There is no random access: [`rewind`](DecodeSource::rewind) is the only
//! way back to an earlier frame.

use std::path::Path;

use crate::configuration::TargetBox;
use crate::error::VidthumbError;
use crate::frame::FrameBuffer;
use crate::metadata::SourceMetadata;

/// Lifecycle state of a [`DecodeSource`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceState {
    /// Not open, or the last open failed.
    Closed,
    /// Open and positioned before the frame at `current_frame`.
    Scanning,
    /// Every decodable unit has been consumed.
    Exhausted,
}

/// Resampling filter used when scaling a decoded frame to the target box.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScaleQuality {
    /// Cheap nearest-neighbour scaling, for frames only measured.
    #[default]
    Fast,
    /// Expensive high-quality scaling, for frames that are displayed.
    High,
}

/// Which backend a source is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// ZIP archive of still images.
    Archive,
    /// FFmpeg container/codec stream.
    Video,
    /// Any other implementation (e.g. a test double).
    Custom,
}

/// A forward-only producer of scaled frames.
pub trait DecodeSource {
    /// Recognise and prepare the file at `path`.
    ///
    /// Any previously open file is closed first, so calling this repeatedly
    /// is safe. On failure the source is left [`SourceState::Closed`].
    ///
    /// # Errors
    ///
    /// Returns [`VidthumbError::FileOpen`] (or another error) if this backend
    /// cannot handle the file. This is the expected outcome while probing.
    fn open(&mut self, path: &Path) -> Result<(), VidthumbError>;

    /// Decode the next unit and scale it into the target box.
    ///
    /// Returns `Ok(None)` once the source is exhausted.
    ///
    /// # Errors
    ///
    /// Returns [`VidthumbError::InvalidState`] on a closed source, or a decode
    /// error if the unit could not be decoded.
    fn next_frame(&mut self, quality: ScaleQuality) -> Result<Option<FrameBuffer>, VidthumbError>;

    /// Advance past the next unit without producing pixels.
    ///
    /// Returns `Ok(false)` once the source is exhausted.
    fn skip_frame(&mut self) -> Result<bool, VidthumbError>;

    /// Return to the first unit and reset [`current_frame`](DecodeSource::current_frame).
    fn rewind(&mut self) -> Result<(), VidthumbError>;

    /// Best-effort estimate of the number of units; never exact for codecs.
    fn total_frame_count(&self) -> u64;

    /// Number of units consumed since the last open or rewind.
    fn current_frame(&self) -> u64;

    /// Current lifecycle state.
    fn state(&self) -> SourceState;

    /// The box frames are scaled to fit within.
    fn target_box(&self) -> TargetBox;

    /// A snapshot describing the open source.
    fn metadata(&self) -> SourceMetadata {
        SourceMetadata {
            backend: BackendKind::Custom,
            format: None,
            frame_count_estimate: self.total_frame_count(),
            frame_size: None,
            target_box: self.target_box(),
        }
    }
}

/// Fail with [`VidthumbError::InvalidState`] unless the source is open.
pub(crate) fn require_open(
    state: SourceState,
    operation: &'static str,
) -> Result<(), VidthumbError> {
    match state {
        SourceState::Closed => Err(VidthumbError::InvalidState { operation, state }),
        SourceState::Scanning | SourceState::Exhausted => Ok(()),
    }
}
