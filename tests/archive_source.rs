//! Image-archive backend integration tests.
//!
//! Archives are assembled in-test from PNG images, mixing stored and
//! DEFLATE-compressed entries with entries that must be ignored.

use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use flate2::{Compression, write::DeflateEncoder};
use image::{ImageFormat, Rgba, RgbaImage};
use vidthumb::{
    ArchiveSource, BackendKind, ContactSheet, DecodeSource, GridShape, ScaleQuality,
    SheetOptions, SourceState, TargetBox, VidthumbError,
};

const TARGET: TargetBox = TargetBox::new(10, 10);

struct ZipEntry {
    name: &'static str,
    data: Vec<u8>,
    deflate: bool,
    flags: u16,
}

impl ZipEntry {
    fn stored(name: &'static str, data: Vec<u8>) -> Self {
        Self {
            name,
            data,
            deflate: false,
            flags: 0,
        }
    }

    fn deflated(name: &'static str, data: Vec<u8>) -> Self {
        Self {
            name,
            data,
            deflate: true,
            flags: 0,
        }
    }
}

fn png(width: u32, height: u32, colour: [u8; 4]) -> Vec<u8> {
    let image = RgbaImage::from_pixel(width, height, Rgba(colour));
    let mut bytes = Vec::new();
    image
        .write_to(&mut Cursor::new(&mut bytes), ImageFormat::Png)
        .expect("Failed to encode PNG");
    bytes
}

/// Serialise local headers followed by a stub central directory record.
fn zip_bytes(entries: &[ZipEntry]) -> Vec<u8> {
    let mut out = Vec::new();
    for entry in entries {
        let (method, payload): (u16, Vec<u8>) = if entry.deflate {
            let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(&entry.data).unwrap();
            (8, encoder.finish().unwrap())
        } else {
            (0, entry.data.clone())
        };
        let deferred = entry.flags & (1 << 3) != 0;
        let compressed_size = if deferred { 0 } else { payload.len() as u32 };
        let uncompressed_size = if deferred { 0 } else { entry.data.len() as u32 };

        out.extend_from_slice(b"PK\x03\x04");
        out.extend_from_slice(&20u16.to_le_bytes());
        out.extend_from_slice(&entry.flags.to_le_bytes());
        out.extend_from_slice(&method.to_le_bytes());
        out.extend_from_slice(&[0; 8]); // time, date, crc
        out.extend_from_slice(&compressed_size.to_le_bytes());
        out.extend_from_slice(&uncompressed_size.to_le_bytes());
        out.extend_from_slice(&(entry.name.len() as u16).to_le_bytes());
        out.extend_from_slice(&0u16.to_le_bytes());
        out.extend_from_slice(entry.name.as_bytes());
        out.extend_from_slice(&payload);
    }
    out.extend_from_slice(b"PK\x01\x02");
    out.extend_from_slice(&[0; 42]);
    out
}

fn write_archive(directory: &Path, entries: &[ZipEntry]) -> PathBuf {
    let path = directory.join("pages.zip");
    std::fs::write(&path, zip_bytes(entries)).expect("Failed to write archive");
    path
}

/// Three image pages interleaved with entries that are not frames.
fn comic_entries() -> Vec<ZipEntry> {
    vec![
        ZipEntry::stored("page1.png", png(40, 20, [255, 0, 0, 255])),
        ZipEntry::stored("notes.txt", b"not an image".to_vec()),
        ZipEntry::deflated("page2.png", png(20, 40, [0, 255, 0, 255])),
        ZipEntry::stored("page2.thumb.png", png(4, 4, [9, 9, 9, 255])),
        ZipEntry::stored("extras/", Vec::new()),
        ZipEntry::deflated("page3.png", png(40, 20, [0, 0, 255, 255])),
    ]
}

fn open_comic(directory: &Path) -> ArchiveSource {
    let path = write_archive(directory, &comic_entries());
    let mut source = ArchiveSource::new(TARGET);
    source.open(&path).expect("Failed to open archive");
    source
}

// ── Opening ───────────────────────────────────────────────────────

#[test]
fn counts_only_image_entries() {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let source = open_comic(directory.path());

    assert_eq!(source.total_frame_count(), 3);
    assert_eq!(source.current_frame(), 0);
    assert_eq!(source.state(), SourceState::Scanning);

    let metadata = source.metadata();
    assert_eq!(metadata.backend, BackendKind::Archive);
    assert_eq!(metadata.format.as_deref(), Some("zip"));
    assert_eq!(metadata.target_box, TARGET);
}

#[test]
fn archive_without_images_is_rejected() {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let path = write_archive(
        directory.path(),
        &[ZipEntry::stored("readme.txt", b"hello".to_vec())],
    );

    let mut source = ArchiveSource::new(TARGET);
    let result = source.open(&path);
    assert!(matches!(result, Err(VidthumbError::FileOpen { .. })));
    assert_eq!(source.state(), SourceState::Closed);
}

#[test]
fn deferred_sizes_are_rejected() {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let mut entry = ZipEntry::deflated("page1.png", png(4, 4, [1, 2, 3, 255]));
    entry.flags = 1 << 3;
    let path = write_archive(directory.path(), &[entry]);

    let mut source = ArchiveSource::new(TARGET);
    assert!(source.open(&path).is_err());
}

#[test]
fn non_zip_file_is_rejected() {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let path = directory.path().join("page.png");
    std::fs::write(&path, png(4, 4, [0, 0, 0, 255])).unwrap();

    let mut source = ArchiveSource::new(TARGET);
    assert!(matches!(source.open(&path), Err(VidthumbError::FileOpen { .. })));
}

#[test]
fn closed_source_refuses_to_decode() {
    let mut source = ArchiveSource::new(TARGET);
    assert!(matches!(
        source.next_frame(ScaleQuality::Fast),
        Err(VidthumbError::InvalidState { .. })
    ));
    assert!(source.skip_frame().is_err());
    assert!(source.rewind().is_err());
}

// ── Decoding ──────────────────────────────────────────────────────

#[test]
fn frames_are_decoded_in_archive_order() {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let mut source = open_comic(directory.path());

    let first = source.next_frame(ScaleQuality::Fast).unwrap().unwrap();
    assert_eq!((first.width(), first.height()), (10, 5));
    assert_eq!(&first.row(0)[..4], &[255, 0, 0, 255]);

    let second = source.next_frame(ScaleQuality::High).unwrap().unwrap();
    assert_eq!((second.width(), second.height()), (5, 10));
    assert_eq!(&second.row(9)[..4], &[0, 255, 0, 255]);

    let third = source.next_frame(ScaleQuality::Fast).unwrap().unwrap();
    assert_eq!(&third.row(2)[..4], &[0, 0, 255, 255]);
    assert_eq!(source.current_frame(), 3);

    assert!(source.next_frame(ScaleQuality::Fast).unwrap().is_none());
    assert_eq!(source.state(), SourceState::Exhausted);
    assert!(!source.skip_frame().unwrap());
}

#[test]
fn skip_and_decode_agree_on_indices() {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let mut source = open_comic(directory.path());

    while source.next_frame(ScaleQuality::Fast).unwrap().is_some() {}
    source.rewind().unwrap();
    assert_eq!(source.current_frame(), 0);
    assert_eq!(source.state(), SourceState::Scanning);

    assert!(source.skip_frame().unwrap());
    assert_eq!(source.current_frame(), 1);
    let second = source.next_frame(ScaleQuality::High).unwrap().unwrap();
    assert_eq!(&second.row(0)[..4], &[0, 255, 0, 255]);

    assert!(source.skip_frame().unwrap());
    assert!(!source.skip_frame().unwrap());
    assert_eq!(source.current_frame(), 3);
}

#[test]
fn reopening_resets_position() {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let path = write_archive(directory.path(), &comic_entries());
    let mut source = ArchiveSource::new(TARGET);

    source.open(&path).unwrap();
    source.skip_frame().unwrap();
    source.open(&path).unwrap();
    assert_eq!(source.current_frame(), 0);
    let first = source.next_frame(ScaleQuality::Fast).unwrap().unwrap();
    assert_eq!(&first.row(0)[..4], &[255, 0, 0, 255]);
}

// ── Probing and contact sheets ────────────────────────────────────

#[test]
fn probe_picks_archive_backend() {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let path = write_archive(directory.path(), &comic_entries());

    let source = vidthumb::open_source(&path, TARGET).unwrap();
    assert_eq!(source.metadata().backend, BackendKind::Archive);
    assert_eq!(source.total_frame_count(), 3);
}

#[test]
fn contact_sheet_from_archive() {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let path = write_archive(directory.path(), &comic_entries());
    let output = directory.path().join("sheet.png");

    let options = SheetOptions::new()
        .with_target_box(TARGET)
        .with_grid(GridShape::new(2, 2));
    let sheet = ContactSheet::generate(&path, &options).unwrap();
    sheet.save(&output).unwrap();

    // Three pages cannot fill 2x2, so the grid shrinks to one row of three.
    assert_eq!(sheet.plan().grid(), GridShape::new(3, 1));
    assert_eq!(sheet.plan().frames(), &[0, 1, 2]);
    assert_eq!(sheet.placed(), 3);
    assert_eq!(sheet.image().dimensions(), (30, 10));

    // Page 1 is 10x5, centred vertically in a 10x10 cell.
    assert_eq!(sheet.image().get_pixel(5, 0)[0], 0);
    assert_eq!(sheet.image().get_pixel(5, 4)[0], 255);

    let reloaded = image::open(&output).unwrap();
    assert_eq!(reloaded.width(), 30);
    assert_eq!(reloaded.height(), 10);
}
