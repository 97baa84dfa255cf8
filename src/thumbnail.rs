//! Contact-sheet generation.
//!
//! [`ContactSheet`] ties the pipeline together: probe the input, scan every
//! frame for statistics, filter out uninformative frames, sample evenly
//! across the survivors, decode those again at high quality, and composite
//! them into a grid.
//!
//! # Example
//!
//! ```no_run
//! use vidthumb::{ContactSheet, GridShape, SheetOptions};
//!
//! let options = SheetOptions::new().with_grid(GridShape::new(4, 4));
//! let sheet = ContactSheet::generate("input.mp4", &options)?;
//! println!("{} thumbnails", sheet.placed());
//! sheet.save("contact_sheet.png")?;
//! # Ok::<(), vidthumb::VidthumbError>(())
//! ```

use std::path::Path;

use image::RgbaImage;

use crate::analysis::{self, FrameStatistics};
use crate::candidates::filter_candidates;
use crate::canvas::SheetCanvas;
use crate::configuration::SheetOptions;
use crate::error::VidthumbError;
use crate::extraction::extract_selected;
use crate::metadata::SourceMetadata;
use crate::probe::open_source;
use crate::selection::{SelectionPlan, plan_selection};
use crate::source::DecodeSource;

/// A finished contact sheet and the decisions that produced it.
#[derive(Debug, Clone)]
pub struct ContactSheet {
    image: RgbaImage,
    plan: SelectionPlan,
    statistics: FrameStatistics,
    candidate_count: usize,
    placed: usize,
    metadata: SourceMetadata,
}

impl ContactSheet {
    /// Build a contact sheet for the file at `path`.
    ///
    /// # Errors
    ///
    /// - [`VidthumbError::InvalidGrid`] if the requested grid has a zero
    ///   dimension.
    /// - [`VidthumbError::UnsupportedFormat`] if no backend can open the file.
    /// - [`VidthumbError::NoFrames`] if no frame could be scanned.
    pub fn generate<P: AsRef<Path>>(path: P, options: &SheetOptions) -> Result<Self, VidthumbError> {
        let path = path.as_ref();
        options.grid.validate()?;

        log::info!("Building contact sheet for {}", path.display());
        let mut source = open_source(path, options.target)?;
        Self::generate_from_source(source.as_mut(), options)
    }

    /// Build a contact sheet from an already open source.
    ///
    /// The source is scanned from its current position, so it should be
    /// freshly opened or rewound. Its own target box applies; the one in
    /// `options` is only used by [`generate`](Self::generate) when opening.
    ///
    /// # Errors
    ///
    /// See [`generate`](Self::generate). Errors from the source's
    /// [`rewind`](DecodeSource::rewind) also propagate.
    pub fn generate_from_source(
        source: &mut dyn DecodeSource,
        options: &SheetOptions,
    ) -> Result<Self, VidthumbError> {
        options.grid.validate()?;
        let metadata = source.metadata();
        log::debug!(
            "Source: {:?} backend, format {}, ~{} frames",
            metadata.backend,
            metadata.format.as_deref().unwrap_or("unknown"),
            metadata.frame_count_estimate
        );

        let statistics = analysis::analyze(source, options.progress.clone(), options.batch_size)?;
        let Some((cell_width, cell_height)) = statistics.max_frame_size() else {
            return Err(VidthumbError::NoFrames);
        };

        let candidates = filter_candidates(&statistics, options.grid.cell_count());
        let plan = plan_selection(&candidates, options.grid);
        if plan.is_empty() {
            return Err(VidthumbError::NoFrames);
        }

        let mut canvas = SheetCanvas::new(cell_width, cell_height, plan.grid());
        let report = extract_selected(source, &plan, options.progress.clone(), |cell, frame| {
            canvas.place(frame, cell);
            Ok(())
        })?;
        if !report.is_complete() {
            log::warn!(
                "Only {} of {} selected frames could be extracted",
                report.placed,
                report.requested
            );
        }

        Ok(Self {
            image: canvas.into_image(),
            plan,
            statistics,
            candidate_count: candidates.len(),
            placed: report.placed,
            metadata,
        })
    }

    /// The composited sheet.
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Consume the sheet, returning the composited image.
    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// The selected frames and final grid.
    pub fn plan(&self) -> &SelectionPlan {
        &self.plan
    }

    /// Scores gathered during the scan.
    pub fn statistics(&self) -> &FrameStatistics {
        &self.statistics
    }

    /// Frames that survived filtering.
    pub fn candidate_count(&self) -> usize {
        self.candidate_count
    }

    /// Thumbnails actually drawn; less than `plan().len()` if extraction
    /// stopped early.
    pub fn placed(&self) -> usize {
        self.placed
    }

    /// What the source looked like when the sheet was built.
    pub fn metadata(&self) -> &SourceMetadata {
        &self.metadata
    }

    /// Write the sheet; the format follows the extension.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), VidthumbError> {
        let path = path.as_ref();
        self.image.save(path)?;
        log::info!("Wrote {}", path.display());
        Ok(())
    }
}
