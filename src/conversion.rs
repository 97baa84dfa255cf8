//! Internal conversion helpers.
//!
//! Aspect-fit arithmetic, frame-count estimation, and stride alignment shared
//! by the frame buffer and both decode backends.

use ffmpeg_next::Rational;

/// Row alignment of [`FrameBuffer`](crate::FrameBuffer) storage, in bytes.
pub(crate) const STRIDE_ALIGNMENT: usize = 32;

/// Round `row_bytes` up to the next multiple of [`STRIDE_ALIGNMENT`].
pub(crate) fn aligned_stride(row_bytes: usize) -> usize {
    row_bytes.div_ceil(STRIDE_ALIGNMENT) * STRIDE_ALIGNMENT
}

/// Scale `source_width`×`source_height` to fit within a box, preserving
/// aspect ratio.
///
/// The scale factor is `min(box_width / source_width, box_height /
/// source_height)` in single precision and the result is truncated, matching
/// the sizes the scalers are configured with. Both dimensions are clamped to
/// at least 1.
pub(crate) fn fit_within(
    source_width: u32,
    source_height: u32,
    box_width: u32,
    box_height: u32,
) -> (u32, u32) {
    if source_width == 0 || source_height == 0 {
        return (box_width.max(1), box_height.max(1));
    }
    let scale = (box_width as f32 / source_width as f32)
        .min(box_height as f32 / source_height as f32);
    let width = (source_width as f32 * scale) as u32;
    let height = (source_height as f32 * scale) as u32;
    (width.max(1), height.max(1))
}

/// Convert an FFmpeg rational to `f64`, or `None` for a zero denominator.
pub(crate) fn rational_to_f64(rational: Rational) -> Option<f64> {
    if rational.denominator() == 0 {
        None
    } else {
        Some(rational.numerator() as f64 / rational.denominator() as f64)
    }
}

/// Estimate a frame count from a container duration in `AV_TIME_BASE`
/// units (microseconds) and an average frame rate.
///
/// This is only an estimate: variable frame rates and inexact container
/// durations make it drift from the number of frames actually decoded.
pub(crate) fn estimate_frame_count(duration_microseconds: i64, frames_per_second: f64) -> u64 {
    if duration_microseconds <= 0 || frames_per_second <= 0.0 {
        return 0;
    }
    (frames_per_second * duration_microseconds as f64 / 1_000_000.0) as u64
}
