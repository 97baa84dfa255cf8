//! FFmpeg container/codec decode backend.
//!
//! [`VideoSource`] decodes the best video stream of any file FFmpeg can
//! demux and scales each frame into the target box as RGBA.
//!
//! Both resampling contexts (point sampling for [`ScaleQuality::Fast`],
//! Lanczos for [`ScaleQuality::High`]) are built once when the file is
//! opened. They are only rebuilt if the decoder starts producing frames in a
//! different pixel format or size than it advertised. The output size is
//! fixed at open time for the whole run.

use std::{
    fmt::{Debug, Formatter, Result as FmtResult},
    path::{Path, PathBuf},
};

use ffmpeg_next::{
    Error as FfmpegError, Packet,
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
};

use crate::configuration::TargetBox;
use crate::error::VidthumbError;
use crate::frame::FrameBuffer;
use crate::metadata::SourceMetadata;
use crate::source::{BackendKind, DecodeSource, ScaleQuality, SourceState, require_open};

/// Everything that exists only while a file is open.
struct OpenStream {
    input: Input,
    decoder: VideoDecoder,
    stream_index: usize,
    format_name: String,
    fast_scaler: ScalingContext,
    high_scaler: ScalingContext,
    output_width: u32,
    output_height: u32,
    decoded: VideoFrame,
    scaled: VideoFrame,
    eof_sent: bool,
}

impl OpenStream {
    /// Decode forward until a frame is waiting in `decoded`.
    ///
    /// Returns `Ok(false)` once the stream is fully drained.
    fn decode_next(&mut self) -> Result<bool, VidthumbError> {
        loop {
            if self.decoder.receive_frame(&mut self.decoded).is_ok() {
                return Ok(true);
            }

            if self.eof_sent {
                return Ok(false);
            }

            let mut packet = Packet::empty();
            match packet.read(&mut self.input) {
                Ok(()) => {
                    if packet.stream() != self.stream_index {
                        continue;
                    }
                    if let Err(error) = self.decoder.send_packet(&packet) {
                        log::warn!("Dropping undecodable packet: {error}");
                    }
                }
                Err(FfmpegError::Eof) => {
                    self.decoder.send_eof()?;
                    self.eof_sent = true;
                }
                Err(error) => {
                    return Err(VidthumbError::VideoDecodeError(format!(
                        "failed to read packet: {error}"
                    )));
                }
            }
        }
    }

    /// Rebuild the scalers if the decoded frame no longer matches them.
    fn ensure_scalers(&mut self) -> Result<(), VidthumbError> {
        let input = self.fast_scaler.input();
        if input.format == self.decoded.format()
            && input.width == self.decoded.width()
            && input.height == self.decoded.height()
        {
            return Ok(());
        }

        log::debug!(
            "Decoder output changed to {:?} {}x{}, rebuilding scalers",
            self.decoded.format(),
            self.decoded.width(),
            self.decoded.height()
        );
        let (fast_scaler, high_scaler) = build_scalers(
            self.decoded.format(),
            self.decoded.width(),
            self.decoded.height(),
            self.output_width,
            self.output_height,
        )?;
        self.fast_scaler = fast_scaler;
        self.high_scaler = high_scaler;
        self.scaled = VideoFrame::empty();
        Ok(())
    }

    /// Scale the frame in `decoded` into an owned [`FrameBuffer`].
    fn scale(&mut self, quality: ScaleQuality) -> Result<FrameBuffer, VidthumbError> {
        self.ensure_scalers()?;
        let scaler = match quality {
            ScaleQuality::Fast => &mut self.fast_scaler,
            ScaleQuality::High => &mut self.high_scaler,
        };
        scaler.run(&self.decoded, &mut self.scaled)?;

        FrameBuffer::from_raw(
            self.scaled.data(0),
            self.output_width,
            self.output_height,
            self.scaled.stride(0),
        )
    }
}

fn build_scalers(
    format: Pixel,
    width: u32,
    height: u32,
    output_width: u32,
    output_height: u32,
) -> Result<(ScalingContext, ScalingContext), VidthumbError> {
    let fast = ScalingContext::get(
        format,
        width,
        height,
        Pixel::RGBA,
        output_width,
        output_height,
        ScalingFlags::POINT,
    )?;
    let high = ScalingContext::get(
        format,
        width,
        height,
        Pixel::RGBA,
        output_width,
        output_height,
        ScalingFlags::LANCZOS,
    )?;
    Ok((fast, high))
}

/// Decode source over an FFmpeg-readable video file.
///
/// # Example
///
/// ```no_run
/// use std::path::Path;
///
/// use vidthumb::{DecodeSource, ScaleQuality, TargetBox, VideoSource};
///
/// vidthumb::initialize_ffmpeg()?;
/// let mut source = VideoSource::new(TargetBox::new(320, 200));
/// source.open(Path::new("input.mp4"))?;
/// let first = source.next_frame(ScaleQuality::High)?;
/// # Ok::<(), vidthumb::VidthumbError>(())
/// ```
pub struct VideoSource {
    target: TargetBox,
    stream: Option<OpenStream>,
    path: Option<PathBuf>,
    state: SourceState,
    current_frame: u64,
    total_frame_count: u64,
}

impl Debug for VideoSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("VideoSource")
            .field("target", &self.target)
            .field("path", &self.path)
            .field("state", &self.state)
            .field("current_frame", &self.current_frame)
            .field("total_frame_count", &self.total_frame_count)
            .finish_non_exhaustive()
    }
}

impl VideoSource {
    /// Create a closed video source scaling into `target`.
    ///
    /// FFmpeg must have been initialised with
    /// [`initialize_ffmpeg`](crate::initialize_ffmpeg) before the source is
    /// opened; [`open`](DecodeSource::open) does this itself if needed.
    pub fn new(target: TargetBox) -> Self {
        Self {
            target,
            stream: None,
            path: None,
            state: SourceState::Closed,
            current_frame: 0,
            total_frame_count: 0,
        }
    }

    fn close(&mut self) {
        self.stream = None;
        self.path = None;
        self.state = SourceState::Closed;
        self.current_frame = 0;
        self.total_frame_count = 0;
    }

    fn stream(&mut self) -> Result<&mut OpenStream, VidthumbError> {
        let state = self.state;
        self.stream.as_mut().ok_or(VidthumbError::InvalidState {
            operation: "read video",
            state,
        })
    }

    fn open_stream(&self, path: &Path) -> Result<(OpenStream, u64), VidthumbError> {
        let file_open = |reason: String| VidthumbError::FileOpen {
            path: path.to_path_buf(),
            reason,
        };

        let input = ffmpeg_next::format::input(&path).map_err(|error| file_open(error.to_string()))?;

        let (stream_index, frames_per_second, decoder) = {
            let stream = input
                .streams()
                .best(Type::Video)
                .ok_or(VidthumbError::NoVideoStream)?;

            let frames_per_second = crate::conversion::rational_to_f64(stream.avg_frame_rate())
                .or_else(|| crate::conversion::rational_to_f64(stream.rate()))
                .unwrap_or(0.0);

            let decoder = CodecContext::from_parameters(stream.parameters())
                .and_then(|context| context.decoder().video())
                .map_err(|error| file_open(format!("failed to open video decoder: {error}")))?;

            (stream.index(), frames_per_second, decoder)
        };

        let total_frame_count =
            crate::conversion::estimate_frame_count(input.duration(), frames_per_second);
        let (output_width, output_height) = self.target.fit(decoder.width(), decoder.height());
        let (fast_scaler, high_scaler) = build_scalers(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            output_width,
            output_height,
        )
        .map_err(|error| file_open(error.to_string()))?;

        let format_name = input.format().name().to_string();
        let codec_name = decoder
            .codec()
            .map(|codec| codec.name().to_string())
            .unwrap_or_else(|| "unknown".to_string());
        log::debug!(
            "Opened {} (format={}, codec={}, {}x{} @ {:.3} fps, ~{} frames) scaling to {}x{}",
            path.display(),
            format_name,
            codec_name,
            decoder.width(),
            decoder.height(),
            frames_per_second,
            total_frame_count,
            output_width,
            output_height
        );

        let stream = OpenStream {
            input,
            decoder,
            stream_index,
            format_name,
            fast_scaler,
            high_scaler,
            output_width,
            output_height,
            decoded: VideoFrame::empty(),
            scaled: VideoFrame::empty(),
            eof_sent: false,
        };
        Ok((stream, total_frame_count))
    }
}

impl DecodeSource for VideoSource {
    fn open(&mut self, path: &Path) -> Result<(), VidthumbError> {
        self.close();
        crate::ffmpeg::initialize()?;
        log::debug!("Probing {} with FFmpeg", path.display());

        let (stream, total_frame_count) = self.open_stream(path)?;
        self.stream = Some(stream);
        self.path = Some(path.to_path_buf());
        self.total_frame_count = total_frame_count;
        self.state = SourceState::Scanning;
        Ok(())
    }

    fn next_frame(&mut self, quality: ScaleQuality) -> Result<Option<FrameBuffer>, VidthumbError> {
        require_open(self.state, "decode a frame")?;
        if self.state == SourceState::Exhausted {
            return Ok(None);
        }

        let stream = self.stream()?;
        if !stream.decode_next()? {
            self.state = SourceState::Exhausted;
            return Ok(None);
        }
        let frame = stream.scale(quality)?;
        self.current_frame += 1;
        Ok(Some(frame))
    }

    fn skip_frame(&mut self) -> Result<bool, VidthumbError> {
        require_open(self.state, "skip a frame")?;
        if self.state == SourceState::Exhausted {
            return Ok(false);
        }

        if !self.stream()?.decode_next()? {
            self.state = SourceState::Exhausted;
            return Ok(false);
        }
        self.current_frame += 1;
        Ok(true)
    }

    fn rewind(&mut self) -> Result<(), VidthumbError> {
        require_open(self.state, "rewind")?;

        let stream = self.stream()?;
        match stream.input.seek(0, ..0) {
            Ok(()) => {
                stream.decoder.flush();
                stream.eof_sent = false;
            }
            Err(error) => {
                let path = self.path.clone().ok_or(VidthumbError::InvalidState {
                    operation: "rewind",
                    state: self.state,
                })?;
                log::debug!("Seek to start failed ({error}), reopening {}", path.display());
                let (stream, _) = self.open_stream(&path)?;
                self.stream = Some(stream);
            }
        }

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
            backend: BackendKind::Video,
            format: self.stream.as_ref().map(|stream| stream.format_name.clone()),
            frame_count_estimate: self.total_frame_count,
            frame_size: self
                .stream
                .as_ref()
                .map(|stream| (stream.output_width, stream.output_height)),
            target_box: self.target,
        }
    }
}
