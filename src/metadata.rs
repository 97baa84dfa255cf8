//! Source metadata.
//!
//! [`SourceMetadata`] is a cheap, owned snapshot of an open
//! [`DecodeSource`](crate::DecodeSource), returned by
//! [`DecodeSource::metadata`](crate::DecodeSource::metadata) and carried on
//! the finished [`ContactSheet`](crate::ContactSheet).

use crate::configuration::TargetBox;
use crate::source::BackendKind;

/// Descriptive information about an open source.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct SourceMetadata {
    /// Which backend opened the source.
    pub backend: BackendKind,
    /// Container or archive format name (e.g. `"zip"`, `"matroska,webm"`).
    pub format: Option<String>,
    /// Estimated number of decodable units.
    pub frame_count_estimate: u64,
    /// Achieved frame size after scaling, when fixed for the whole source.
    ///
    /// Archive entries are scaled individually, so this is `None` for them.
    pub frame_size: Option<(u32, u32)>,
    /// The box frames are scaled to fit within.
    pub target_box: TargetBox,
}
