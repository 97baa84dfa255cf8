//! Error types for the `vidthumb` crate.
//!
//! This module defines [`VidthumbError`], the unified error type returned by
//! all fallible operations in the crate. Errors carry enough context (paths,
//! backend reasons, upstream messages) to diagnose a failure without extra
//! logging at the call site.
//!
//! Two failure kinds are not represented here: comparing
//! frames of different sizes yields the [`INCOMPARABLE`](crate::frame::INCOMPARABLE)
//! sentinel as data, and allocation failure aborts the process.

use std::{io::Error as IoError, path::PathBuf};

use ffmpeg_next::Error as FfmpegError;
use image::ImageError;
use thiserror::Error;

use crate::source::SourceState;

/// The unified error type for all `vidthumb` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum VidthumbError {
    /// No decode backend could open the input.
    #[error("Unsupported media format: no backend could open {path}")]
    UnsupportedFormat {
        /// Path that was probed.
        path: PathBuf,
    },

    /// A single backend rejected the input.
    ///
    /// Expected while probing; only surfaces to callers that open a backend
    /// directly.
    #[error("Failed to open {path}: {reason}")]
    FileOpen {
        /// Path passed to the backend.
        path: PathBuf,
        /// Why the backend rejected it.
        reason: String,
    },

    /// The container has no video stream.
    #[error("No video stream found in file")]
    NoVideoStream,

    /// A frame could not be decoded mid-stream.
    #[error("Failed to decode video frame: {0}")]
    VideoDecodeError(String),

    /// The archive structure is malformed or uses an unsupported feature.
    #[error("Archive error: {0}")]
    ArchiveError(String),

    /// A raw pixel buffer does not cover the dimensions it claims.
    #[error("Invalid frame buffer: {0}")]
    InvalidFrameBuffer(String),

    /// A grid with a zero dimension was requested.
    #[error("Invalid grid {columns}x{rows}: both dimensions must be non-zero")]
    InvalidGrid {
        /// Requested column count.
        columns: u32,
        /// Requested row count.
        rows: u32,
    },

    /// Per-frame score sequences of different lengths were combined.
    #[error("Score length mismatch: {difference} difference scores, {contrast} contrast scores")]
    ScoreLengthMismatch {
        /// Number of difference scores.
        difference: usize,
        /// Number of contrast scores.
        contrast: usize,
    },

    /// A decode operation was attempted in a state that does not allow it.
    #[error("Cannot {operation} while the source is {state:?}")]
    InvalidState {
        /// The attempted operation.
        operation: &'static str,
        /// The state the source was in.
        state: SourceState,
    },

    /// No frames were available to build an overview from.
    #[error("No usable frames found in source")]
    NoFrames,

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),

    /// An error from the `image` crate while decoding or encoding images.
    #[error("Image processing error: {0}")]
    ImageError(#[from] ImageError),
}

impl From<FfmpegError> for VidthumbError {
    fn from(error: FfmpegError) -> Self {
        VidthumbError::FfmpegError(error.to_string())
    }
}
