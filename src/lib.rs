//! # vidthumb
//!
//! Build contact sheets (grids of representative thumbnails) from video
//! files and ZIP archives of images.
//!
//! `vidthumb` scans a source once to score every frame, discards frames that
//! are flat or abruptly different from their neighbours, samples evenly
//! across what remains, and composites the chosen frames into one image.
//! Video decoding is powered by FFmpeg via the
//! [`ffmpeg-next`](https://crates.io/crates/ffmpeg-next) crate; archive
//! entries are decoded with [`image`].
//!
//! ## Quick Start
//!
//! ```no_run
//! use vidthumb::{ContactSheet, SheetOptions};
//!
//! let sheet = ContactSheet::generate("input.mp4", &SheetOptions::new()).unwrap();
//! sheet.save("contact_sheet.png").unwrap();
//! ```
//!
//! ### Driving the passes yourself
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use vidthumb::{GridShape, Orientation};
//!
//! # struct Quiet;
//! # impl vidthumb::ProgressCallback for Quiet {
//! #     fn on_progress(&self, _: &vidthumb::ProgressInfo) {}
//! # }
//! let mut source = vidthumb::open_source("pages.zip", Orientation::Portrait.target_box())?;
//! let statistics = vidthumb::analyze(source.as_mut(), Arc::new(Quiet), 10)?;
//! let grid = GridShape::new(4, 3);
//! let candidates = vidthumb::filter_candidates(&statistics, grid.cell_count());
//! let plan = vidthumb::plan_selection(&candidates, grid);
//! println!("{:?}", plan.frames());
//! # Ok::<(), vidthumb::VidthumbError>(())
//! ```
//!
//! ### Optional Features
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `rayon` | Row-parallel contrast computation (enabled by default) |
//!
//! ## Requirements
//!
//! FFmpeg development libraries must be installed on your system.

pub mod analysis;
pub mod archive;
pub mod candidates;
pub mod canvas;
pub mod configuration;
mod conversion;
pub mod error;
pub mod extraction;
pub mod ffmpeg;
pub mod frame;
pub mod metadata;
pub mod probe;
pub mod progress;
pub mod selection;
pub mod source;
pub mod thumbnail;
pub mod video;

pub use analysis::{FrameStatistics, analyze, upper_median};
pub use archive::ArchiveSource;
pub use candidates::{CandidateSet, filter_candidates};
pub use canvas::SheetCanvas;
pub use configuration::{GridShape, Orientation, SheetOptions, TargetBox};
pub use error::VidthumbError;
pub use extraction::{ExtractionReport, extract_selected};
pub use ffmpeg::{
    FfmpegLogLevel, get_ffmpeg_log_level, initialize as initialize_ffmpeg, set_ffmpeg_log_level,
};
pub use frame::{FrameBuffer, INCOMPARABLE};
pub use metadata::SourceMetadata;
pub use probe::open_source;
pub use progress::{OperationType, ProgressCallback, ProgressInfo};
pub use selection::{GridCell, SelectionPlan, plan_selection};
pub use source::{BackendKind, DecodeSource, ScaleQuality, SourceState};
pub use thumbnail::ContactSheet;
pub use video::VideoSource;
