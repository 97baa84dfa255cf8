//! The selection sampler.
//!
//! [`plan_selection`] picks evenly spaced frames from a [`CandidateSet`] and
//! settles the final grid shape. Sampling strides over the candidate list,
//! not over the raw frame range, so filtered stretches of video do not leave
//! gaps in the sheet.

use crate::candidates::CandidateSet;
use crate::configuration::GridShape;

/// The frames to extract and the grid they fill.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectionPlan {
    frames: Vec<u64>,
    grid: GridShape,
}

/// A cell position within the sheet grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridCell {
    /// Zero-based column.
    pub column: u32,
    /// Zero-based row.
    pub row: u32,
}

impl SelectionPlan {
    /// Selected frame indices, strictly ascending.
    pub fn frames(&self) -> &[u64] {
        &self.frames
    }

    /// Final grid shape; `columns * rows == frames().len()` and
    /// `columns >= rows`.
    pub fn grid(&self) -> GridShape {
        self.grid
    }

    /// Number of thumbnails.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether nothing was selected.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// The cell the `position`-th selected frame is placed in (row-major).
    pub fn cell(&self, position: usize) -> GridCell {
        let columns = self.grid.columns.max(1) as usize;
        GridCell {
            column: (position % columns) as u32,
            row: (position / columns) as u32,
        }
    }
}

/// Shrink a grid to fit `available` thumbnails.
///
/// Columns become `floor(sqrt(available))` (at least 1), rows the whole
/// number of columns that fit, and any remainder is dropped so the grid
/// stays rectangular.
fn shrink_grid(available: usize) -> GridShape {
    let columns = ((available as f64).sqrt().floor() as u32).max(1);
    let rows = (available / columns as usize) as u32;
    GridShape::new(columns, rows)
}

/// Choose the frames for a `requested` grid from `candidates`.
///
/// With `C` candidates and `T` requested cells:
///
/// - if `C < T` the grid shrinks (see above) and `T` becomes its cell count;
/// - the `k`-th selected frame is `candidates[floor(k * C / T)]`;
/// - finally the grid is turned wider-than-tall if needed.
///
/// The result is strictly ascending with no duplicates.
pub fn plan_selection(candidates: &CandidateSet, requested: GridShape) -> SelectionPlan {
    let available = candidates.len();

    let mut grid = if available < requested.cell_count() {
        let shrunk = shrink_grid(available);
        log::debug!(
            "Shrinking {}x{} grid to {}x{} for {available} candidates",
            requested.columns,
            requested.rows,
            shrunk.columns,
            shrunk.rows
        );
        shrunk
    } else {
        requested
    };
    let thumbnail_count = grid.cell_count();

    let frames: Vec<u64> = (0..thumbnail_count)
        .map(|k| candidates.frames()[k * available / thumbnail_count])
        .collect();

    if grid.columns < grid.rows {
        grid = GridShape::new(grid.rows, grid.columns);
    }

    log::info!(
        "Selecting {} frames out of {available}",
        frames.len()
    );
    for (position, frame) in frames.iter().enumerate() {
        log::debug!("{position}: {frame}");
    }

    SelectionPlan { frames, grid }
}
