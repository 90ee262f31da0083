//! In-process decoding with FFmpeg.
//!
//! [`MediaFile`] opens a container, reads the metadata of its best video
//! stream and hands out a [`FrameIterator`] that decodes every frame in order,
//! already converted to 8-bit grayscale by the FFmpeg scaler. The demuxer and
//! decoder contexts are released when the `MediaFile` is dropped.
//!
//! # Example
//!
//! ```no_run
//! use reelcut::{FrameSource, MediaFile, ReelcutError};
//!
//! let mut media = MediaFile::open("input.mp4")?;
//! println!("{}", media.metadata());
//! let decoded = media.frames()?.filter(Result::is_ok).count();
//! println!("{decoded} frames");
//! # Ok::<(), ReelcutError>(())
//! ```

use std::fmt::{Debug, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ffmpeg_next::{
    Error as FfmpegError, Packet, Rational,
    codec::context::Context as CodecContext,
    decoder::Video as VideoDecoder,
    format::{Pixel, context::Input},
    frame::Video as VideoFrame,
    media::Type,
    software::scaling::{Context as ScalingContext, Flags as ScalingFlags},
    util::log::Level,
};
use image::{DynamicImage, GrayImage};

use crate::error::ReelcutError;
use crate::frame::{FrameResult, FrameSource, FrameStream};
use crate::metadata::VideoMetadata;

/// An opened source video.
pub struct MediaFile {
    input: Input,
    metadata: VideoMetadata,
    video_stream_index: usize,
    path: PathBuf,
    passes: u32,
}

impl Debug for MediaFile {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("MediaFile")
            .field("path", &self.path)
            .field("metadata", &self.metadata)
            .field("video_stream_index", &self.video_stream_index)
            .finish_non_exhaustive()
    }
}

impl MediaFile {
    /// Open a video file and read its metadata.
    ///
    /// Initializes FFmpeg (idempotent) and selects the stream FFmpeg ranks as
    /// the best video stream.
    ///
    /// # Errors
    ///
    /// - [`ReelcutError::FileOpen`] if the file cannot be opened or its video
    ///   codec parameters cannot be read.
    /// - [`ReelcutError::NoVideoStream`] if the file has no video stream.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, ReelcutError> {
        let path = path.as_ref().to_path_buf();
        log::debug!("Opening video file: {}", path.display());

        let open_error = |reason: String| ReelcutError::FileOpen {
            path: path.clone(),
            reason,
        };

        ffmpeg_next::init()
            .map_err(|error| open_error(format!("FFmpeg initialisation failed: {error}")))?;

        let input =
            ffmpeg_next::format::input(&path).map_err(|error| open_error(error.to_string()))?;

        let stream = input
            .streams()
            .best(Type::Video)
            .ok_or(ReelcutError::NoVideoStream)?;
        let video_stream_index = stream.index();

        let decoder = CodecContext::from_parameters(stream.parameters())
            .and_then(|context| context.decoder().video())
            .map_err(|error| open_error(format!("Failed to create video decoder: {error}")))?;

        let duration = container_duration(&input).unwrap_or_else(|| {
            stream_duration(stream.duration(), stream.time_base()).unwrap_or(Duration::ZERO)
        });

        let frames_per_second = rational_to_f64(stream.avg_frame_rate())
            .or_else(|| rational_to_f64(stream.rate()))
            .unwrap_or(0.0);

        let codec = decoder
            .codec()
            .map(|codec| codec.name().to_string())
            .unwrap_or_else(|| "unknown".to_string());

        let metadata = VideoMetadata::new(
            duration,
            frames_per_second,
            decoder.width(),
            decoder.height(),
        )
        .with_codec(codec);

        log::debug!("Opened {}: {metadata}", path.display());

        Ok(Self {
            input,
            metadata,
            video_stream_index,
            path,
            passes: 0,
        })
    }

    /// Path the file was opened from.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Metadata read at open time.
    pub fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    /// Decode every frame of the video stream from the start.
    ///
    /// # Errors
    ///
    /// Returns an error if the decoder or the grayscale scaler cannot be
    /// created.
    pub fn frame_iter(&mut self) -> Result<FrameIterator<'_>, ReelcutError> {
        if self.passes > 0 {
            if let Err(error) = self.input.seek(0, ..0) {
                log::warn!("Failed to rewind {}: {error}", self.path.display());
            }
        }
        self.passes += 1;
        FrameIterator::new(self)
    }
}

impl FrameSource for MediaFile {
    fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    fn frames(&mut self) -> Result<FrameStream<'_>, ReelcutError> {
        Ok(Box::new(self.frame_iter()?))
    }
}

fn container_duration(input: &Input) -> Option<Duration> {
    // Container durations are in AV_TIME_BASE (microsecond) units.
    let micros = input.duration();
    (micros > 0).then(|| Duration::from_micros(micros as u64))
}

fn stream_duration(duration: i64, time_base: Rational) -> Option<Duration> {
    if duration <= 0 || time_base.denominator() == 0 {
        return None;
    }
    let seconds = duration as f64 * time_base.numerator() as f64 / time_base.denominator() as f64;
    (seconds.is_finite() && seconds > 0.0).then(|| Duration::from_secs_f64(seconds))
}

fn rational_to_f64(rate: Rational) -> Option<f64> {
    if rate.denominator() == 0 || rate.numerator() <= 0 {
        return None;
    }
    Some(rate.numerator() as f64 / rate.denominator() as f64)
}

/// Consecutive demuxer read failures tolerated before a source is given up on.
const MAX_CONSECUTIVE_READ_ERRORS: u32 = 32;

/// Tracks back-to-back packet read failures.
///
/// Isolated damaged packets are skipped, but an I/O error that repeats on
/// every read (a truncated file, a vanished mount) must end the pass.
#[derive(Debug, Default)]
struct ReadErrorStreak {
    count: u32,
}

impl ReadErrorStreak {
    fn succeeded(&mut self) {
        self.count = 0;
    }

    /// Record a failure; returns the error to yield once the cap is reached.
    fn failed(&mut self, error: &FfmpegError) -> Option<ReelcutError> {
        self.count += 1;
        (self.count >= MAX_CONSECUTIVE_READ_ERRORS).then(|| {
            ReelcutError::VideoDecodeError(format!(
                "packet read failed {} times in a row: {error}",
                self.count
            ))
        })
    }
}

/// A lazy iterator over every decoded frame of a [`MediaFile`], in
/// presentation order, as [`DynamicImage::ImageLuma8`] values.
///
/// Decoding stops at the first decoder error, which is yielded once.
pub struct FrameIterator<'a> {
    media: &'a mut MediaFile,
    decoder: VideoDecoder,
    scaler: ScalingContext,
    decoded_frame: VideoFrame,
    scaled_frame: VideoFrame,
    read_errors: ReadErrorStreak,
    eof_sent: bool,
    done: bool,
}

impl<'a> FrameIterator<'a> {
    fn new(media: &'a mut MediaFile) -> Result<Self, ReelcutError> {
        let stream = media
            .input
            .stream(media.video_stream_index)
            .ok_or(ReelcutError::NoVideoStream)?;
        let decoder = CodecContext::from_parameters(stream.parameters())?
            .decoder()
            .video()?;
        let scaler = gray_scaler(decoder.format(), decoder.width(), decoder.height())?;

        Ok(Self {
            media,
            decoder,
            scaler,
            decoded_frame: VideoFrame::empty(),
            scaled_frame: VideoFrame::empty(),
            read_errors: ReadErrorStreak::default(),
            eof_sent: false,
            done: false,
        })
    }

    fn convert_current_frame(&mut self) -> Result<DynamicImage, ReelcutError> {
        let format = self.decoded_frame.format();
        let width = self.decoded_frame.width();
        let height = self.decoded_frame.height();

        let input = self.scaler.input();
        if input.format != format || input.width != width || input.height != height {
            log::debug!("Frame geometry changed to {width}x{height}, rebuilding scaler");
            self.scaler = gray_scaler(format, width, height)?;
        }

        self.scaler.run(&self.decoded_frame, &mut self.scaled_frame)?;
        let buffer = plane_to_buffer(&self.scaled_frame, width, height);
        let image = GrayImage::from_raw(width, height, buffer).ok_or_else(|| {
            ReelcutError::VideoDecodeError(
                "Failed to construct grayscale image from decoded frame data".to_string(),
            )
        })?;
        Ok(DynamicImage::ImageLuma8(image))
    }

    fn fail(&mut self, error: ReelcutError) -> Option<FrameResult> {
        self.done = true;
        Some(Err(error))
    }
}

impl Iterator for FrameIterator<'_> {
    type Item = FrameResult;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        loop {
            if self.decoder.receive_frame(&mut self.decoded_frame).is_ok() {
                return match self.convert_current_frame() {
                    Ok(image) => Some(Ok(image)),
                    Err(error) => self.fail(error),
                };
            }

            if self.eof_sent {
                self.done = true;
                return None;
            }

            let mut packet = Packet::empty();
            match packet.read(&mut self.media.input) {
                Ok(()) => {
                    self.read_errors.succeeded();
                    if packet.stream() == self.media.video_stream_index {
                        if let Err(error) = self.decoder.send_packet(&packet) {
                            return self.fail(ReelcutError::VideoDecodeError(error.to_string()));
                        }
                    }
                }
                Err(FfmpegError::Eof) => {
                    if let Err(error) = self.decoder.send_eof() {
                        return self.fail(ReelcutError::VideoDecodeError(error.to_string()));
                    }
                    self.eof_sent = true;
                }
                Err(error) => {
                    log::debug!("Skipping unreadable packet: {error}");
                    if let Some(fatal) = self.read_errors.failed(&error) {
                        return self.fail(fatal);
                    }
                }
            }
        }
    }
}

fn gray_scaler(format: Pixel, width: u32, height: u32) -> Result<ScalingContext, ReelcutError> {
    Ok(ScalingContext::get(
        format,
        width,
        height,
        Pixel::GRAY8,
        width,
        height,
        ScalingFlags::BILINEAR,
    )?)
}

/// Copy the first plane of a single-byte-per-pixel frame, dropping any row
/// padding FFmpeg added.
fn plane_to_buffer(frame: &VideoFrame, width: u32, height: u32) -> Vec<u8> {
    let stride = frame.stride(0);
    let row_bytes = width as usize;
    let data = frame.data(0);

    if stride == row_bytes {
        return data[..row_bytes * height as usize].to_vec();
    }
    let mut buffer = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let row_start = row * stride;
        buffer.extend_from_slice(&data[row_start..row_start + row_bytes]);
    }
    buffer
}

/// FFmpeg's own console verbosity, independent of the `log` facade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FfmpegLogLevel {
    /// Print nothing.
    Quiet,
    /// Unrecoverable errors only.
    Fatal,
    /// Recoverable errors.
    Error,
    /// Warnings (FFmpeg's default).
    Warning,
    /// Informational messages.
    Info,
    /// Debugging output.
    Debug,
}

impl FfmpegLogLevel {
    fn to_ffmpeg_level(self) -> Level {
        match self {
            FfmpegLogLevel::Quiet => Level::Quiet,
            FfmpegLogLevel::Fatal => Level::Fatal,
            FfmpegLogLevel::Error => Level::Error,
            FfmpegLogLevel::Warning => Level::Warning,
            FfmpegLogLevel::Info => Level::Info,
            FfmpegLogLevel::Debug => Level::Debug,
        }
    }
}

impl FromStr for FfmpegLogLevel {
    type Err = ReelcutError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "quiet" => Ok(FfmpegLogLevel::Quiet),
            "fatal" => Ok(FfmpegLogLevel::Fatal),
            "error" => Ok(FfmpegLogLevel::Error),
            "warning" | "warn" => Ok(FfmpegLogLevel::Warning),
            "info" => Ok(FfmpegLogLevel::Info),
            "debug" => Ok(FfmpegLogLevel::Debug),
            other => Err(ReelcutError::InvalidConfiguration(format!(
                "unsupported FFmpeg log level: {other}"
            ))),
        }
    }
}

/// Set FFmpeg's internal log level. Does not affect `log` output.
pub fn set_ffmpeg_log_level(level: FfmpegLogLevel) {
    ffmpeg_next::util::log::set_level(level.to_ffmpeg_level());
}
