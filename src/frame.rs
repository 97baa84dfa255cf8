//! Owned RGBA frame buffers and the per-frame measurements the selection
//! heuristic is built on.
//!
//! A [`FrameBuffer`] is produced by a [`DecodeSource`](crate::DecodeSource)
//! and never changes after construction. Pixels are stored as 8-bit RGBA,
//! four bytes per pixel, in rows padded to a 32-byte stride.
//!
//! Two measurements are defined on frames:
//!
//! - [`FrameBuffer::difference`]: RMS colour distance between two frames of
//!   equal size, or [`INCOMPARABLE`] when the sizes differ.
//! - [`FrameBuffer::contrast`]: standard deviation of per-pixel luma.
//!
//! With the `rayon` feature enabled, `contrast` sums rows on worker threads.
//! Floating-point addition order then depends on scheduling, so results can
//! differ from a sequential build in the last few significant digits.

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::path::Path;

use image::{Rgba, RgbaImage};

use crate::error::VidthumbError;

/// Bytes per pixel of every frame buffer.
pub const BYTES_PER_PIXEL: usize = 4;

/// Returned by [`FrameBuffer::difference`] when two frames cannot be
/// compared because their dimensions differ.
///
/// This is neither "identical" nor "maximally different"; callers must treat
/// it as an undefined measurement.
pub const INCOMPARABLE: f64 = -1.0;

const LUMA_RED: f64 = 0.299;
const LUMA_GREEN: f64 = 0.587;
const LUMA_BLUE: f64 = 0.114;

/// A decoded frame: immutable, stride-aligned RGBA pixels.
#[derive(Clone, PartialEq, Eq)]
pub struct FrameBuffer {
    width: u32,
    height: u32,
    stride: usize,
    data: Vec<u8>,
}

impl Debug for FrameBuffer {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("FrameBuffer")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("stride", &self.stride)
            .finish_non_exhaustive()
    }
}

impl FrameBuffer {
    /// Copy a frame out of a raw RGBA scan-line buffer.
    ///
    /// `source_stride` is the distance in bytes between the starts of two
    /// rows in `pixels`; it may exceed `width * 4`. Only the first
    /// `width * 4` bytes of each row are copied.
    ///
    /// # Errors
    ///
    /// Returns [`VidthumbError::InvalidFrameBuffer`] if either dimension is
    /// zero, `source_stride` is shorter than a row, or `pixels` is too short
    /// for `height` rows.
    pub fn from_raw(
        pixels: &[u8],
        width: u32,
        height: u32,
        source_stride: usize,
    ) -> Result<Self, VidthumbError> {
        if width == 0 || height == 0 {
            return Err(VidthumbError::InvalidFrameBuffer(format!(
                "zero-sized frame {width}x{height}"
            )));
        }

        let row_bytes = width as usize * BYTES_PER_PIXEL;
        if source_stride < row_bytes {
            return Err(VidthumbError::InvalidFrameBuffer(format!(
                "source stride {source_stride} is shorter than a {width}-pixel row"
            )));
        }

        let required = (height as usize - 1) * source_stride + row_bytes;
        if pixels.len() < required {
            return Err(VidthumbError::InvalidFrameBuffer(format!(
                "{} bytes supplied, {required} needed for {width}x{height} at stride {source_stride}",
                pixels.len()
            )));
        }

        let stride = crate::conversion::aligned_stride(row_bytes);
        let mut data = vec![0u8; stride * height as usize];
        for (row, target) in data.chunks_exact_mut(stride).enumerate() {
            let start = row * source_stride;
            target[..row_bytes].copy_from_slice(&pixels[start..start + row_bytes]);
        }

        Ok(Self {
            width,
            height,
            stride,
            data,
        })
    }

    /// Copy a frame out of an [`RgbaImage`].
    pub fn from_image(image: &RgbaImage) -> Result<Self, VidthumbError> {
        let (width, height) = image.dimensions();
        Self::from_raw(
            image.as_raw(),
            width,
            height,
            width as usize * BYTES_PER_PIXEL,
        )
    }

    /// Frame width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Frame height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Bytes between the starts of consecutive rows.
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// The RGBA bytes of row `y`, without alignment padding.
    ///
    /// # Panics
    ///
    /// Panics if `y >= height`.
    pub fn row(&self, y: u32) -> &[u8] {
        let start = y as usize * self.stride;
        &self.data[start..start + self.width as usize * BYTES_PER_PIXEL]
    }

    fn rows(&self) -> impl Iterator<Item = &[u8]> {
        let row_bytes = self.width as usize * BYTES_PER_PIXEL;
        self.data
            .chunks_exact(self.stride)
            .map(move |row| &row[..row_bytes])
    }

    /// RMS colour distance to `other`, in `[0, 1]`.
    ///
    /// Channels are normalised to `0..=1` and alpha is ignored. The sum of
    /// squared channel differences is square-rooted and divided by
    /// `sqrt(width * height * 3)`. The measure is symmetric and zero for
    /// identical frames.
    ///
    /// Returns [`INCOMPARABLE`] if the frames differ in width or height.
    pub fn difference(&self, other: &FrameBuffer) -> f64 {
        if self.width != other.width || self.height != other.height {
            return INCOMPARABLE;
        }

        let sum: f64 = self
            .rows()
            .zip(other.rows())
            .map(|(left, right)| {
                left.chunks_exact(BYTES_PER_PIXEL)
                    .zip(right.chunks_exact(BYTES_PER_PIXEL))
                    .map(|(a, b)| pixel_difference(a, b))
                    .sum::<f64>()
            })
            .sum();

        let samples = self.width as f64 * self.height as f64 * 3.0;
        sum.sqrt() / samples.sqrt()
    }

    /// Sample standard deviation of per-pixel luma, with luma in `0..=1`.
    ///
    /// Luma is `0.299 R + 0.587 G + 0.114 B`. The variance divides by
    /// `N - 1`; single-pixel frames have zero contrast.
    pub fn contrast(&self) -> f64 {
        let count = self.width as f64 * self.height as f64;
        if count < 2.0 {
            return 0.0;
        }

        let mean = self.sum_rows(|row| row_luma(row).sum()) / count;
        let squares = self.sum_rows(|row| {
            row_luma(row)
                .map(|luma| (luma - mean) * (luma - mean))
                .sum()
        });

        (squares / (count - 1.0)).sqrt()
    }

    #[cfg(feature = "rayon")]
    fn sum_rows<F>(&self, per_row: F) -> f64
    where
        F: Fn(&[u8]) -> f64 + Sync,
    {
        use rayon::prelude::*;

        let row_bytes = self.width as usize * BYTES_PER_PIXEL;
        self.data
            .par_chunks_exact(self.stride)
            .map(|row| per_row(&row[..row_bytes]))
            .sum()
    }

    #[cfg(not(feature = "rayon"))]
    fn sum_rows<F>(&self, per_row: F) -> f64
    where
        F: Fn(&[u8]) -> f64,
    {
        self.rows().map(per_row).sum()
    }

    /// Copy the pixels into a tightly packed [`RgbaImage`].
    pub fn to_image(&self) -> RgbaImage {
        RgbaImage::from_fn(self.width, self.height, |x, y| {
            let offset = x as usize * BYTES_PER_PIXEL;
            let pixel = &self.row(y)[offset..offset + BYTES_PER_PIXEL];
            Rgba([pixel[0], pixel[1], pixel[2], pixel[3]])
        })
    }

    /// Save the frame as an image; the format follows the file extension.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), VidthumbError> {
        self.to_image().save(path)?;
        Ok(())
    }
}

fn pixel_difference(a: &[u8], b: &[u8]) -> f64 {
    a[..3]
        .iter()
        .zip(&b[..3])
        .map(|(&left, &right)| {
            let delta = (left as f64 - right as f64) / 255.0;
            delta * delta
        })
        .sum()
}

fn row_luma(row: &[u8]) -> impl Iterator<Item = f64> + '_ {
    row.chunks_exact(BYTES_PER_PIXEL).map(|pixel| {
        (LUMA_RED * pixel[0] as f64 + LUMA_GREEN * pixel[1] as f64 + LUMA_BLUE * pixel[2] as f64)
            / 255.0
    })
}
