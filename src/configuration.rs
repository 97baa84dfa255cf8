//! Contact-sheet configuration.
//!
//! [`SheetOptions`] is a builder that threads grid layout, target frame
//! size, and progress reporting through [`ContactSheet`](crate::ContactSheet)
//! generation without polluting every function signature.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use vidthumb::{GridShape, Orientation, ProgressCallback, ProgressInfo, SheetOptions};
//!
//! struct LogProgress;
//! impl ProgressCallback for LogProgress {
//!     fn on_progress(&self, info: &ProgressInfo) {
//!         println!("{:?}: {} done", info.operation, info.current);
//!     }
//! }
//!
//! let options = SheetOptions::new()
//!     .with_orientation(Orientation::Portrait)
//!     .with_grid(GridShape::new(4, 3))
//!     .with_progress(Arc::new(LogProgress))
//!     .with_batch_size(25);
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::sync::Arc;

use crate::error::VidthumbError;
use crate::progress::{NoOpProgress, ProgressCallback};

/// The maximum size every frame is scaled to fit within.
///
/// Scaling preserves the source aspect ratio, so the achieved frame size is
/// usually smaller than the box in one dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TargetBox {
    /// Maximum frame width in pixels.
    pub width: u32,
    /// Maximum frame height in pixels.
    pub height: u32,
}

impl TargetBox {
    /// Create a target box.
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Compute the size a `source_width`×`source_height` image scales to.
    ///
    /// Returns `(width, height)`, each at least 1.
    pub fn fit(&self, source_width: u32, source_height: u32) -> (u32, u32) {
        crate::conversion::fit_within(source_width, source_height, self.width, self.height)
    }
}

impl Default for TargetBox {
    fn default() -> Self {
        Orientation::Landscape.target_box()
    }
}

/// Fixed target-box presets for landscape and portrait material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Orientation {
    /// 320×200 cells. This is the default.
    #[default]
    Landscape,
    /// 890×1280 cells, for scanned pages and phone footage.
    Portrait,
}

impl Orientation {
    /// The target box associated with this preset.
    pub const fn target_box(self) -> TargetBox {
        match self {
            Orientation::Landscape => TargetBox::new(320, 200),
            Orientation::Portrait => TargetBox::new(890, 1280),
        }
    }
}

/// A grid of `columns` × `rows` thumbnail cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridShape {
    /// Number of cells per row.
    pub columns: u32,
    /// Number of rows.
    pub rows: u32,
}

impl GridShape {
    /// Create a grid shape.
    pub const fn new(columns: u32, rows: u32) -> Self {
        Self { columns, rows }
    }

    /// Total number of cells.
    pub fn cell_count(&self) -> usize {
        self.columns as usize * self.rows as usize
    }

    /// Fail with [`VidthumbError::InvalidGrid`] if either dimension is zero.
    pub(crate) fn validate(&self) -> Result<(), VidthumbError> {
        if self.columns == 0 || self.rows == 0 {
            return Err(VidthumbError::InvalidGrid {
                columns: self.columns,
                rows: self.rows,
            });
        }
        Ok(())
    }
}

impl Default for GridShape {
    fn default() -> Self {
        Self::new(6, 6)
    }
}

/// Configuration for contact-sheet generation.
///
/// All fields have sensible defaults: a 6×6 grid of landscape cells and no
/// progress reporting.
#[derive(Clone)]
pub struct SheetOptions {
    pub(crate) grid: GridShape,
    pub(crate) target: TargetBox,
    pub(crate) progress: Arc<dyn ProgressCallback>,
    /// How often to fire the progress callback (every N frames).
    pub(crate) batch_size: u64,
}

impl Debug for SheetOptions {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("SheetOptions")
            .field("grid", &self.grid)
            .field("target", &self.target)
            .field("has_progress", &true)
            .field("batch_size", &self.batch_size)
            .finish()
    }
}

impl Default for SheetOptions {
    fn default() -> Self {
        Self::new()
    }
}

impl SheetOptions {
    /// Create options with default settings.
    pub fn new() -> Self {
        Self {
            grid: GridShape::default(),
            target: TargetBox::default(),
            progress: Arc::new(NoOpProgress),
            batch_size: 1,
        }
    }

    /// Set the requested grid. The grid may shrink if the source has fewer
    /// usable frames than cells.
    #[must_use]
    pub fn with_grid(mut self, grid: GridShape) -> Self {
        self.grid = grid;
        self
    }

    /// Set an explicit target box.
    #[must_use]
    pub fn with_target_box(mut self, target: TargetBox) -> Self {
        self.target = target;
        self
    }

    /// Use the target box of an orientation preset.
    #[must_use]
    pub fn with_orientation(mut self, orientation: Orientation) -> Self {
        self.target = orientation.target_box();
        self
    }

    /// Attach a progress callback.
    #[must_use]
    pub fn with_progress(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress = callback;
        self
    }

    /// Set how often the progress callback fires. Clamped to a minimum of 1.
    #[must_use]
    pub fn with_batch_size(mut self, size: u64) -> Self {
        self.batch_size = size.max(1);
        self
    }

    /// The requested grid.
    pub fn grid(&self) -> GridShape {
        self.grid
    }

    /// The configured target box.
    pub fn target_box(&self) -> TargetBox {
        self.target
    }
}
