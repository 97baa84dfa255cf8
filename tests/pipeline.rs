//! End-to-end pipeline tests over an in-memory decode source.
//!
//! `SyntheticSource` implements [`DecodeSource`] over a fixed list of
//! frames, so both passes, the filter, the sampler and compositing can be
//! exercised without FFmpeg or files on disk.

use std::path::Path;
use std::sync::{Arc, Mutex};

use image::{Rgba, RgbaImage};
use vidthumb::{
    ContactSheet, DecodeSource, FrameBuffer, GridShape, OperationType, ProgressCallback,
    ProgressInfo, ScaleQuality, SelectionPlan, SheetOptions, SourceState, TargetBox,
    VidthumbError, analyze, extract_selected, filter_candidates, plan_selection,
};

struct SyntheticSource {
    frames: Vec<FrameBuffer>,
    position: usize,
    state: SourceState,
    /// High-quality decodes fail from this index on.
    fail_high_from: Option<usize>,
    /// Fast decodes fail from this index on.
    fail_fast_from: Option<usize>,
    /// Overrides the frame-count estimate.
    reported_total: Option<u64>,
    high_decodes: Vec<usize>,
}

impl SyntheticSource {
    fn new(frames: Vec<FrameBuffer>) -> Self {
        Self {
            frames,
            position: 0,
            state: SourceState::Scanning,
            fail_high_from: None,
            fail_fast_from: None,
            reported_total: None,
            high_decodes: Vec::new(),
        }
    }

    fn closed() -> Self {
        let mut source = Self::new(Vec::new());
        source.state = SourceState::Closed;
        source
    }
}

impl DecodeSource for SyntheticSource {
    fn open(&mut self, _path: &Path) -> Result<(), VidthumbError> {
        self.position = 0;
        self.state = SourceState::Scanning;
        Ok(())
    }

    fn next_frame(&mut self, quality: ScaleQuality) -> Result<Option<FrameBuffer>, VidthumbError> {
        if self.state == SourceState::Closed {
            return Err(VidthumbError::InvalidState {
                operation: "decode a frame",
                state: self.state,
            });
        }
        let Some(frame) = self.frames.get(self.position).cloned() else {
            self.state = SourceState::Exhausted;
            return Ok(None);
        };
        if quality == ScaleQuality::High {
            if self.fail_high_from.is_some_and(|from| self.position >= from) {
                return Err(VidthumbError::VideoDecodeError("corrupt frame".to_string()));
            }
            self.high_decodes.push(self.position);
        } else if self.fail_fast_from.is_some_and(|from| self.position >= from) {
            return Err(VidthumbError::VideoDecodeError("truncated stream".to_string()));
        }
        self.position += 1;
        Ok(Some(frame))
    }

    fn skip_frame(&mut self) -> Result<bool, VidthumbError> {
        if self.position < self.frames.len() {
            self.position += 1;
            Ok(true)
        } else {
            self.state = SourceState::Exhausted;
            Ok(false)
        }
    }

    fn rewind(&mut self) -> Result<(), VidthumbError> {
        if self.state == SourceState::Closed {
            return Err(VidthumbError::InvalidState {
                operation: "rewind",
                state: self.state,
            });
        }
        self.position = 0;
        self.state = SourceState::Scanning;
        Ok(())
    }

    fn total_frame_count(&self) -> u64 {
        self.reported_total.unwrap_or(self.frames.len() as u64)
    }

    fn current_frame(&self) -> u64 {
        self.position as u64
    }

    fn state(&self) -> SourceState {
        self.state
    }

    fn target_box(&self) -> TargetBox {
        TargetBox::new(8, 8)
    }
}

#[derive(Default)]
struct Recorder {
    reports: Mutex<Vec<ProgressInfo>>,
}

impl ProgressCallback for Recorder {
    fn on_progress(&self, info: &ProgressInfo) {
        self.reports.lock().unwrap().push(info.clone());
    }
}

fn quiet() -> Arc<dyn ProgressCallback> {
    Arc::new(Recorder::default())
}

fn solid(width: u32, height: u32, value: u8) -> FrameBuffer {
    FrameBuffer::from_image(&RgbaImage::from_pixel(width, height, Rgba([value, value, value, 255])))
        .unwrap()
}

fn split(width: u32, height: u32, flip: bool) -> FrameBuffer {
    let image = RgbaImage::from_fn(width, height, |x, _| {
        let value = if (x >= width / 2) != flip { 255 } else { 0 };
        Rgba([value, value, value, 255])
    });
    FrameBuffer::from_image(&image).unwrap()
}

/// 100 alternating high-contrast frames with a flat grey stretch at 40..=45.
fn video_with_fade() -> Vec<FrameBuffer> {
    (0..100)
        .map(|index| {
            if (40..=45).contains(&index) {
                solid(8, 8, 128)
            } else {
                split(8, 8, index % 2 == 1)
            }
        })
        .collect()
}

/// Frames whose top-left pixel encodes their index.
fn numbered(count: usize) -> Vec<FrameBuffer> {
    (0..count)
        .map(|index| {
            let image = RgbaImage::from_fn(4, 4, |x, y| {
                if x == 0 && y == 0 {
                    Rgba([index as u8, 0, 0, 255])
                } else {
                    Rgba([((x + y) * 30) as u8, 200, 10, 255])
                }
            });
            FrameBuffer::from_image(&image).unwrap()
        })
        .collect()
}

// ── Metrics pass ──────────────────────────────────────────────────

#[test]
fn analyze_scores_every_frame() {
    let mut source = SyntheticSource::new(video_with_fade());
    let statistics = analyze(&mut source, quiet(), 10).unwrap();

    assert_eq!(statistics.frame_count(), 100);
    assert_eq!(statistics.difference()[0], 0.0);
    assert!((statistics.difference()[1] - 1.0).abs() < 1e-9);
    assert_eq!(statistics.difference()[42], 0.0);
    assert!((statistics.median_difference() - 1.0).abs() < 1e-9);
    assert!(statistics.contrast()[42].abs() < 1e-9);
    assert!(!statistics.any_difference_invalid());
    assert!(!statistics.ended_early());
    assert_eq!(statistics.max_frame_size(), Some((8, 8)));
    assert_eq!(source.state(), SourceState::Exhausted);
}

#[test]
fn analyze_flags_size_changes() {
    let frames = vec![solid(4, 4, 0), solid(4, 4, 10), solid(6, 2, 10), solid(6, 2, 20)];
    let mut source = SyntheticSource::new(frames);
    let statistics = analyze(&mut source, quiet(), 1).unwrap();

    assert!(statistics.any_difference_invalid());
    assert!(statistics.difference()[2] < 0.0);
    assert_eq!(statistics.max_frame_size(), Some((6, 4)));
}

#[test]
fn analyze_stops_at_decode_error() {
    let mut source = SyntheticSource::new(numbered(10));
    source.fail_fast_from = Some(4);
    let statistics = analyze(&mut source, quiet(), 1).unwrap();

    assert_eq!(statistics.frame_count(), 4);
    assert_eq!(statistics.contrast().len(), 4);
    assert!(statistics.ended_early());
    assert_eq!(statistics.max_frame_size(), Some((4, 4)));
}

#[test]
fn analyze_tolerates_huge_frame_estimates() {
    let mut source = SyntheticSource::new(numbered(3));
    source.reported_total = Some(u64::MAX / 2);
    let statistics = analyze(&mut source, quiet(), 1).unwrap();

    assert_eq!(statistics.frame_count(), 3);
    assert!(!statistics.ended_early());
}

#[test]
fn analyze_rejects_closed_source() {
    let mut source = SyntheticSource::closed();
    let result = analyze(&mut source, quiet(), 1);
    assert!(matches!(
        result,
        Err(VidthumbError::InvalidState {
            state: SourceState::Closed,
            ..
        })
    ));
}

#[test]
fn analyze_reports_progress() {
    let recorder = Arc::new(Recorder::default());
    let mut source = SyntheticSource::new(numbered(25));
    analyze(&mut source, recorder.clone(), 10).unwrap();

    let reports = recorder.reports.lock().unwrap();
    let counts: Vec<u64> = reports.iter().map(|info| info.current).collect();
    assert_eq!(counts, vec![10, 20, 25]);
    assert!(reports.iter().all(|info| info.operation == OperationType::FrameAnalysis));
    assert_eq!(reports.last().unwrap().total, Some(25));
}

// ── Filter and sampler on scanned statistics ──────────────────────

#[test]
fn flat_stretch_is_never_selected() {
    let mut source = SyntheticSource::new(video_with_fade());
    let statistics = analyze(&mut source, quiet(), 10).unwrap();

    let candidates = filter_candidates(&statistics, 36);
    let expected: Vec<u64> = (0..100).filter(|frame| !(40..=45).contains(frame)).collect();
    assert_eq!(candidates.frames(), expected.as_slice());

    let plan = plan_selection(&candidates, GridShape::new(6, 6));
    assert_eq!(plan.len(), 36);
    assert!(plan.frames().iter().all(|frame| !(40..=45).contains(frame)));
}

// ── Extraction pass ───────────────────────────────────────────────

fn plan_for(frames: usize, grid: GridShape) -> SelectionPlan {
    plan_selection(&vidthumb::CandidateSet::all(frames), grid)
}

#[test]
fn extraction_decodes_only_selected_frames() {
    let mut source = SyntheticSource::new(numbered(20));
    analyze(&mut source, quiet(), 1).unwrap();

    let plan = plan_for(20, GridShape::new(2, 2));
    let mut delivered = Vec::new();
    let report = extract_selected(&mut source, &plan, quiet(), |cell, frame| {
        delivered.push((cell, frame.row(0)[0] as u64));
        Ok(())
    })
    .unwrap();

    assert!(report.is_complete());
    assert_eq!(source.high_decodes, vec![0, 5, 10, 15]);
    let indices: Vec<u64> = delivered.iter().map(|(_, index)| *index).collect();
    assert_eq!(indices, plan.frames());
    assert_eq!(delivered[3].0, plan.cell(3));
}

#[test]
fn extraction_stops_at_decode_error() {
    let mut source = SyntheticSource::new(numbered(20));
    source.fail_high_from = Some(8);

    let plan = plan_for(20, GridShape::new(2, 2));
    let mut placed = 0;
    let report = extract_selected(&mut source, &plan, quiet(), |_, _| {
        placed += 1;
        Ok(())
    })
    .unwrap();

    assert_eq!(report.placed, 2);
    assert_eq!(report.requested, 4);
    assert!(!report.is_complete());
    assert_eq!(placed, 2);
}

#[test]
fn extraction_propagates_handler_errors() {
    let mut source = SyntheticSource::new(numbered(10));
    let plan = plan_for(10, GridShape::new(2, 1));
    let result = extract_selected(&mut source, &plan, quiet(), |_, _| Err(VidthumbError::NoFrames));
    assert!(matches!(result, Err(VidthumbError::NoFrames)));
}

#[test]
fn extraction_rejects_closed_source() {
    let mut source = SyntheticSource::closed();
    let plan = plan_for(4, GridShape::new(2, 2));
    let result = extract_selected(&mut source, &plan, quiet(), |_, _| Ok(()));
    assert!(matches!(result, Err(VidthumbError::InvalidState { .. })));
}

// ── Contact sheet ─────────────────────────────────────────────────

#[test]
fn contact_sheet_from_source() {
    let recorder = Arc::new(Recorder::default());
    let options = SheetOptions::new()
        .with_grid(GridShape::new(6, 6))
        .with_progress(recorder.clone());
    let mut source = SyntheticSource::new(video_with_fade());

    let sheet = ContactSheet::generate_from_source(&mut source, &options).unwrap();

    assert_eq!(sheet.image().dimensions(), (48, 48));
    assert_eq!(sheet.placed(), 36);
    assert_eq!(sheet.candidate_count(), 94);
    assert_eq!(sheet.statistics().frame_count(), 100);
    assert_eq!(sheet.plan().grid(), GridShape::new(6, 6));

    let reports = recorder.reports.lock().unwrap();
    assert!(reports.iter().any(|info| info.operation == OperationType::FrameExtraction));
}

#[test]
fn contact_sheet_shrinks_for_short_sources() {
    let mut source = SyntheticSource::new(numbered(5));
    let sheet = ContactSheet::generate_from_source(&mut source, &SheetOptions::new()).unwrap();

    assert_eq!(sheet.plan().grid(), GridShape::new(2, 2));
    assert_eq!(sheet.plan().frames(), &[0, 1, 2, 3]);
    assert_eq!(sheet.image().dimensions(), (8, 8));
    assert_eq!(sheet.image().get_pixel(4, 0)[0], 1);
    assert_eq!(sheet.image().get_pixel(4, 4)[0], 3);
}

#[test]
fn contact_sheet_letterboxes_smaller_frames() {
    let frames = vec![split(4, 4, false), split(2, 2, false)];
    let options = SheetOptions::new().with_grid(GridShape::new(2, 1));
    let mut source = SyntheticSource::new(frames);

    let sheet = ContactSheet::generate_from_source(&mut source, &options).unwrap();
    let image = sheet.image();
    assert_eq!(image.dimensions(), (8, 4));
    assert_eq!(image.get_pixel(3, 0)[0], 255);
    // The 2x2 frame sits at (5, 1) inside the second cell.
    assert_eq!(image.get_pixel(6, 1)[0], 255);
    assert_eq!(image.get_pixel(6, 0)[0], 0);
    assert_eq!(image.get_pixel(7, 1)[0], 0);
}

#[test]
fn contact_sheet_from_truncated_scan() {
    let mut source = SyntheticSource::new(numbered(10));
    source.fail_fast_from = Some(4);
    let options = SheetOptions::new().with_grid(GridShape::new(2, 2));

    let sheet = ContactSheet::generate_from_source(&mut source, &options).unwrap();

    assert!(sheet.statistics().ended_early());
    assert_eq!(sheet.statistics().frame_count(), 4);
    assert_eq!(sheet.plan().frames(), &[0, 1, 2, 3]);
    assert_eq!(sheet.placed(), 4);
    assert_eq!(source.high_decodes, vec![0, 1, 2, 3]);
    assert_eq!(sheet.image().get_pixel(4, 4)[0], 3);
}

#[test]
fn contact_sheet_without_frames_fails() {
    let mut source = SyntheticSource::new(Vec::new());
    let result = ContactSheet::generate_from_source(&mut source, &SheetOptions::new());
    assert!(matches!(result, Err(VidthumbError::NoFrames)));
}

#[test]
fn contact_sheet_rejects_empty_grid() {
    let mut source = SyntheticSource::new(numbered(5));
    let options = SheetOptions::new().with_grid(GridShape::new(0, 3));
    let result = ContactSheet::generate_from_source(&mut source, &options);
    assert!(matches!(
        result,
        Err(VidthumbError::InvalidGrid {
            columns: 0,
            rows: 3
        })
    ));
}

#[test]
fn contact_sheet_saves_png() {
    let directory = tempfile::tempdir().expect("Failed to create temp dir");
    let path = directory.path().join("sheet.png");
    let mut source = SyntheticSource::new(numbered(9));
    let options = SheetOptions::new().with_grid(GridShape::new(3, 3));

    let sheet = ContactSheet::generate_from_source(&mut source, &options).unwrap();
    sheet.save(&path).unwrap();

    let reloaded = image::open(&path).unwrap().to_rgba8();
    assert_eq!(&reloaded, sheet.image());
}
