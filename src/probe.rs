//! Backend probing.
//!
//! [`open_source`] tries each decode backend in turn and returns the first
//! one that accepts the file. Archives are probed before FFmpeg: recognising
//! a ZIP header is cheap and quiet, while FFmpeg probing is slower and
//! reports failures noisily.

use std::path::Path;

use crate::archive::ArchiveSource;
use crate::configuration::TargetBox;
use crate::error::VidthumbError;
use crate::source::{BackendKind, DecodeSource};
use crate::video::VideoSource;

type Constructor = fn(TargetBox) -> Result<Box<dyn DecodeSource>, VidthumbError>;

/// Backends in probe order.
const PROBE_ORDER: [(BackendKind, Constructor); 2] = [
    (BackendKind::Archive, new_archive),
    (BackendKind::Video, new_video),
];

/// Open `path` with the first backend that recognises it.
///
/// # Errors
///
/// Returns [`VidthumbError::UnsupportedFormat`] if every backend rejects the
/// file. Individual backend failures are logged at debug level.
///
/// # Example
///
/// ```no_run
/// use vidthumb::{DecodeSource, Orientation};
///
/// let source = vidthumb::open_source("input.mkv", Orientation::Landscape.target_box())?;
/// println!("~{} frames", source.total_frame_count());
/// # Ok::<(), vidthumb::VidthumbError>(())
/// ```
pub fn open_source<P: AsRef<Path>>(
    path: P,
    target: TargetBox,
) -> Result<Box<dyn DecodeSource>, VidthumbError> {
    let path = path.as_ref();

    for (backend, construct) in PROBE_ORDER {
        let mut source = construct(target)?;
        match source.open(path) {
            Ok(()) => {
                log::debug!("Opened {} with the {backend:?} backend", path.display());
                return Ok(source);
            }
            Err(error) => {
                log::debug!("{backend:?} backend rejected {}: {error}", path.display());
            }
        }
    }

    Err(VidthumbError::UnsupportedFormat {
        path: path.to_path_buf(),
    })
}

fn new_archive(target: TargetBox) -> Result<Box<dyn DecodeSource>, VidthumbError> {
    Ok(Box::new(ArchiveSource::new(target)))
}

fn new_video(target: TargetBox) -> Result<Box<dyn DecodeSource>, VidthumbError> {
    crate::ffmpeg::initialize()?;
    Ok(Box::new(VideoSource::new(target)))
}
