//! Sheet compositing.
//!
//! [`SheetCanvas`] is a grid of equally sized cells. Frames are blitted
//! centred into their cell, so a frame smaller than the cell is letterboxed
//! in black and a larger one is cropped.

use std::path::Path;

use image::{Rgba, RgbaImage, imageops};

use crate::configuration::GridShape;
use crate::error::VidthumbError;
use crate::frame::FrameBuffer;
use crate::selection::GridCell;

const BACKGROUND: Rgba<u8> = Rgba([0, 0, 0, 255]);

/// An RGBA canvas of `columns × cell_width` by `rows × cell_height` pixels.
#[derive(Debug, Clone)]
pub struct SheetCanvas {
    image: RgbaImage,
    cell_width: u32,
    cell_height: u32,
    grid: GridShape,
}

impl SheetCanvas {
    /// Allocate an opaque black canvas.
    pub fn new(cell_width: u32, cell_height: u32, grid: GridShape) -> Self {
        let image = RgbaImage::from_pixel(
            cell_width * grid.columns,
            cell_height * grid.rows,
            BACKGROUND,
        );
        Self {
            image,
            cell_width,
            cell_height,
            grid,
        }
    }

    /// Width of one cell in pixels.
    pub fn cell_width(&self) -> u32 {
        self.cell_width
    }

    /// Height of one cell in pixels.
    pub fn cell_height(&self) -> u32 {
        self.cell_height
    }

    /// The grid the canvas is divided into.
    pub fn grid(&self) -> GridShape {
        self.grid
    }

    /// Blit `frame` centred into `cell`.
    ///
    /// Cells outside the grid are ignored.
    pub fn place(&mut self, frame: &FrameBuffer, cell: GridCell) {
        if cell.column >= self.grid.columns || cell.row >= self.grid.rows {
            log::warn!(
                "Cell ({}, {}) is outside the {}x{} grid",
                cell.column,
                cell.row,
                self.grid.columns,
                self.grid.rows
            );
            return;
        }

        let thumbnail = frame.to_image();
        let visible_width = thumbnail.width().min(self.cell_width);
        let visible_height = thumbnail.height().min(self.cell_height);
        let source_x = (thumbnail.width() - visible_width) / 2;
        let source_y = (thumbnail.height() - visible_height) / 2;
        let visible =
            imageops::crop_imm(&thumbnail, source_x, source_y, visible_width, visible_height)
                .to_image();

        let x = cell.column * self.cell_width + (self.cell_width - visible_width) / 2;
        let y = cell.row * self.cell_height + (self.cell_height - visible_height) / 2;
        imageops::replace(&mut self.image, &visible, x as i64, y as i64);
    }

    /// The composited image.
    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// Consume the canvas, returning the composited image.
    pub fn into_image(self) -> RgbaImage {
        self.image
    }

    /// Write the canvas; the format follows the extension (PNG recommended).
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), VidthumbError> {
        self.image.save(path)?;
        Ok(())
    }
}
