//! Image-archive decode backend.
//!
//! [`ArchiveSource`] reads a ZIP archive whose entries are individually
//! decodable still images (comic-book archives, exported photo sets, scanned
//! pages) and presents them as a frame sequence in archive order.
//!
//! Entries are discovered by walking local file headers from the start of
//! the file, so no central directory is needed. Stored and DEFLATE-compressed
//! entries are supported. An entry counts as a frame when it is non-empty,
//! uses a supported compression method, has an image file extension, and is
//! not a `.thumb` preview. [`skip_frame`](DecodeSource::skip_frame) and
//! [`next_frame`](DecodeSource::next_frame) apply the same rule, so frame
//! indices agree between passes.

use std::{
    fs::File,
    io::{BufReader, ErrorKind, Read, Seek, SeekFrom},
    path::Path,
};

use flate2::read::DeflateDecoder;
use image::{ImageFormat, imageops::FilterType};

use crate::configuration::TargetBox;
use crate::error::VidthumbError;
use crate::frame::FrameBuffer;
use crate::metadata::SourceMetadata;
use crate::source::{BackendKind, DecodeSource, ScaleQuality, SourceState, require_open};

const LOCAL_HEADER_SIGNATURE: [u8; 4] = *b"PK\x03\x04";
const LOCAL_HEADER_LEN: usize = 30;
const FLAG_DATA_DESCRIPTOR: u16 = 1 << 3;
const METHOD_STORED: u16 = 0;
const METHOD_DEFLATE: u16 = 8;

/// Fixed-size part of a ZIP local file header.
#[derive(Debug, Clone, Copy)]
struct LocalHeader {
    flags: u16,
    method: u16,
    compressed_size: u32,
    uncompressed_size: u32,
    name_length: u16,
    extra_length: u16,
}

impl LocalHeader {
    /// Parse a header, or `None` if the signature does not match (for
    /// example at the start of the central directory).
    fn parse(bytes: &[u8; LOCAL_HEADER_LEN]) -> Option<Self> {
        if bytes[..4] != LOCAL_HEADER_SIGNATURE {
            return None;
        }
        let u16_at = |offset: usize| u16::from_le_bytes([bytes[offset], bytes[offset + 1]]);
        let u32_at = |offset: usize| {
            u32::from_le_bytes([
                bytes[offset],
                bytes[offset + 1],
                bytes[offset + 2],
                bytes[offset + 3],
            ])
        };
        Some(Self {
            flags: u16_at(6),
            method: u16_at(8),
            compressed_size: u32_at(18),
            uncompressed_size: u32_at(22),
            name_length: u16_at(26),
            extra_length: u16_at(28),
        })
    }

    fn has_deferred_sizes(&self) -> bool {
        self.flags & FLAG_DATA_DESCRIPTOR != 0 && self.compressed_size == 0
    }
}

/// A local header together with its file name; the reader is positioned at
/// the start of the entry's data.
#[derive(Debug)]
struct Entry {
    header: LocalHeader,
    name: String,
}

impl Entry {
    fn is_frame(&self) -> bool {
        self.header.compressed_size > 0
            && matches!(self.header.method, METHOD_STORED | METHOD_DEFLATE)
            && !self.name.contains(".thumb")
            && ImageFormat::from_path(&self.name).is_ok()
    }
}

/// Resampling filters, fixed when the archive is opened.
#[derive(Debug, Clone, Copy)]
struct ScaleFilters {
    fast: FilterType,
    high: FilterType,
}

impl ScaleFilters {
    fn select(&self, quality: ScaleQuality) -> FilterType {
        match quality {
            ScaleQuality::Fast => self.fast,
            ScaleQuality::High => self.high,
        }
    }
}

/// Decode source over a ZIP archive of still images.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
///
/// use vidthumb::{ArchiveSource, DecodeSource, ScaleQuality, TargetBox};
///
/// let mut source = ArchiveSource::new(TargetBox::new(320, 200));
/// source.open(Path::new("pages.cbz"))?;
/// while let Some(frame) = source.next_frame(ScaleQuality::Fast)? {
///     println!("{}x{}", frame.width(), frame.height());
/// }
/// # Ok::<(), vidthumb::VidthumbError>(())
/// ```
#[derive(Debug)]
pub struct ArchiveSource {
    target: TargetBox,
    filters: Option<ScaleFilters>,
    reader: Option<BufReader<File>>,
    state: SourceState,
    current_frame: u64,
    total_frame_count: u64,
}

impl ArchiveSource {
    /// Create a closed archive source scaling into `target`.
    pub fn new(target: TargetBox) -> Self {
        Self {
            target,
            filters: None,
            reader: None,
            state: SourceState::Closed,
            current_frame: 0,
            total_frame_count: 0,
        }
    }

    fn close(&mut self) {
        self.reader = None;
        self.filters = None;
        self.state = SourceState::Closed;
        self.current_frame = 0;
        self.total_frame_count = 0;
    }

    fn reader(&mut self) -> Result<&mut BufReader<File>, VidthumbError> {
        let state = self.state;
        self.reader.as_mut().ok_or(VidthumbError::InvalidState {
            operation: "read archive",
            state,
        })
    }

    /// Count frame entries; fails if the archive cannot be walked.
    fn scan_entries(reader: &mut BufReader<File>) -> Result<u64, String> {
        let first = read_entry(reader).map_err(|error| error.to_string())?;
        let Some(mut entry) = first else {
            return Err("not a ZIP archive".to_string());
        };

        let mut frames = 0;
        loop {
            if entry.header.has_deferred_sizes() {
                return Err(format!(
                    "entry {} stores its sizes in a data descriptor",
                    entry.name
                ));
            }
            if entry.is_frame() {
                frames += 1;
            } else if entry.header.compressed_size > 0 {
                log::debug!("Ignoring archive entry {}", entry.name);
            }
            skip_data(reader, &entry).map_err(|error| error.to_string())?;

            match read_entry(reader).map_err(|error| error.to_string())? {
                Some(next) => entry = next,
                None => break,
            }
        }
        Ok(frames)
    }

    fn decode_entry(
        &self,
        entry: &Entry,
        compressed: Vec<u8>,
        quality: ScaleQuality,
    ) -> Result<FrameBuffer, VidthumbError> {
        let bytes = uncompress(&entry.header, compressed)?;
        let decoded = image::load_from_memory(&bytes).map_err(|error| {
            VidthumbError::VideoDecodeError(format!("{}: {error}", entry.name))
        })?;

        let rgba = decoded.to_rgba8();
        let (width, height) = self.target.fit(rgba.width(), rgba.height());
        let filter = self
            .filters
            .map(|filters| filters.select(quality))
            .unwrap_or(FilterType::Nearest);
        let scaled = image::imageops::resize(&rgba, width, height, filter);
        FrameBuffer::from_image(&scaled)
    }
}

impl DecodeSource for ArchiveSource {
    fn open(&mut self, path: &Path) -> Result<(), VidthumbError> {
        self.close();
        log::debug!("Probing {} as an image archive", path.display());

        let file_open = |reason: String| VidthumbError::FileOpen {
            path: path.to_path_buf(),
            reason,
        };

        let file = File::open(path).map_err(|error| file_open(error.to_string()))?;
        let mut reader = BufReader::new(file);

        let frames = Self::scan_entries(&mut reader).map_err(file_open)?;
        if frames == 0 {
            return Err(file_open("archive contains no image entries".to_string()));
        }
        reader
            .seek(SeekFrom::Start(0))
            .map_err(|error| file_open(error.to_string()))?;

        log::debug!("Opened archive {} with {frames} image entries", path.display());

        self.reader = Some(reader);
        self.filters = Some(ScaleFilters {
            fast: FilterType::Nearest,
            high: FilterType::Triangle,
        });
        self.total_frame_count = frames;
        self.state = SourceState::Scanning;
        Ok(())
    }

    fn next_frame(&mut self, quality: ScaleQuality) -> Result<Option<FrameBuffer>, VidthumbError> {
        require_open(self.state, "decode a frame")?;
        if self.state == SourceState::Exhausted {
            return Ok(None);
        }

        loop {
            let reader = self.reader()?;
            let Some(entry) = read_entry(reader)? else {
                self.state = SourceState::Exhausted;
                return Ok(None);
            };

            if !entry.is_frame() {
                skip_data(reader, &entry)?;
                continue;
            }

            let mut compressed = vec![0u8; entry.header.compressed_size as usize];
            reader.read_exact(&mut compressed)?;
            self.current_frame += 1;

            return self.decode_entry(&entry, compressed, quality).map(Some);
        }
    }

    fn skip_frame(&mut self) -> Result<bool, VidthumbError> {
        require_open(self.state, "skip a frame")?;
        if self.state == SourceState::Exhausted {
            return Ok(false);
        }

        loop {
            let reader = self.reader()?;
            let Some(entry) = read_entry(reader)? else {
                self.state = SourceState::Exhausted;
                return Ok(false);
            };
            skip_data(reader, &entry)?;

            if entry.is_frame() {
                self.current_frame += 1;
                return Ok(true);
            }
        }
    }

    fn rewind(&mut self) -> Result<(), VidthumbError> {
        require_open(self.state, "rewind")?;
        self.reader()?.seek(SeekFrom::Start(0))?;
        self.current_frame = 0;
        self.state = SourceState::Scanning;
        Ok(())
    }

    fn total_frame_count(&self) -> u64 {
        self.total_frame_count
    }

    fn current_frame(&self) -> u64 {
        self.current_frame
    }

    fn state(&self) -> SourceState {
        self.state
    }

    fn target_box(&self) -> TargetBox {
        self.target
    }

    fn metadata(&self) -> SourceMetadata {
        SourceMetadata {
            backend: BackendKind::Archive,
            format: Some("zip".to_string()),
            frame_count_estimate: self.total_frame_count,
            frame_size: None,
            target_box: self.target,
        }
    }
}

/// Read the next local header and file name.
///
/// Returns `Ok(None)` at end of file, on a truncated header, or when the next
/// record is not a local file header.
fn read_entry<R: Read + Seek>(reader: &mut BufReader<R>) -> Result<Option<Entry>, VidthumbError> {
    let mut bytes = [0u8; LOCAL_HEADER_LEN];
    match reader.read_exact(&mut bytes) {
        Ok(()) => {}
        Err(error) if error.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(error) => return Err(error.into()),
    }

    let Some(header) = LocalHeader::parse(&bytes) else {
        return Ok(None);
    };

    let mut name = vec![0u8; header.name_length as usize];
    reader.read_exact(&mut name)?;
    reader.seek_relative(header.extra_length as i64)?;

    Ok(Some(Entry {
        header,
        name: String::from_utf8_lossy(&name).into_owned(),
    }))
}

fn skip_data<R: Read + Seek>(reader: &mut BufReader<R>, entry: &Entry) -> Result<(), VidthumbError> {
    reader.seek_relative(entry.header.compressed_size as i64)?;
    Ok(())
}

fn uncompress(header: &LocalHeader, compressed: Vec<u8>) -> Result<Vec<u8>, VidthumbError> {
    match header.method {
        METHOD_STORED => Ok(compressed),
        METHOD_DEFLATE => {
            let mut output = Vec::with_capacity(header.uncompressed_size as usize);
            DeflateDecoder::new(compressed.as_slice())
                .read_to_end(&mut output)
                .map_err(|error| VidthumbError::ArchiveError(format!("inflate failed: {error}")))?;
            Ok(output)
        }
        method => Err(VidthumbError::ArchiveError(format!(
            "unsupported compression method {method}"
        ))),
    }
}
