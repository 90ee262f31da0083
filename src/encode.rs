//! Range export.
//!
//! An [`Encoder`] turns one [`EncodeRequest`] (source, time range, visual
//! transforms, output path) into a file. [`FfmpegEncoder`] drives the
//! external `ffmpeg` executable, re-encoding to H.264 video and AAC audio.
//! [`Materializer`] wraps an encoder for the pipeline: it reports every
//! outcome, turns encoder failures into an [`EncodeOutcome`] instead of an
//! error so one bad output never stops its siblings, and honours dry runs.
//!
//! # Example
//!
//! ```
//! use std::path::Path;
//!
//! use reelcut::{EncodeRequest, FfmpegEncoder, TimeRange};
//!
//! let request = EncodeRequest::new(
//!     Path::new("talk.mp4"),
//!     TimeRange::new(600.0, 1200.0)?,
//!     Path::new("out/talk_part_1.mp4"),
//! );
//! let args = FfmpegEncoder::new().build_args(&request);
//! assert!(args.iter().any(|arg| arg == "libx264"));
//! # Ok::<(), reelcut::ReelcutError>(())
//! ```

use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::time::Duration;

use crate::error::ReelcutError;
use crate::range::TimeRange;
use crate::report::{Event, Reporter};
use crate::sampler::ClipSpec;
use crate::segment::SegmentDescriptor;

/// A visual effect applied while exporting a range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transform {
    /// Fade from black over the given length at the start of the output.
    FadeIn(Duration),
    /// Fade to black over the given length at the end of the output.
    FadeOut(Duration),
}

/// Everything an encoder needs to export one range.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeRequest {
    /// Source video.
    pub source: PathBuf,
    /// Range of the source to export.
    pub range: TimeRange,
    /// Transforms applied in order.
    pub transforms: Vec<Transform>,
    /// Output file.
    pub output: PathBuf,
}

impl EncodeRequest {
    /// A plain export of `range` with no transforms.
    pub fn new(source: &Path, range: TimeRange, output: &Path) -> Self {
        Self {
            source: source.to_path_buf(),
            range,
            transforms: Vec::new(),
            output: output.to_path_buf(),
        }
    }

    /// Append a transform.
    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transforms.push(transform);
        self
    }
}

impl From<&ClipSpec> for EncodeRequest {
    fn from(clip: &ClipSpec) -> Self {
        Self {
            source: clip.source.clone(),
            range: clip.range,
            transforms: clip.transforms.clone(),
            output: clip.output.clone(),
        }
    }
}

/// Exports a range of a source video to a file.
pub trait Encoder {
    /// Perform the export.
    ///
    /// # Errors
    ///
    /// Returns [`ReelcutError::EncodeError`] when the output could not be
    /// produced.
    fn encode(&self, request: &EncodeRequest) -> Result<(), ReelcutError>;
}

/// Number of trailing stderr lines kept in an encode error.
const STDERR_TAIL_LINES: usize = 5;

/// Encoder backed by the `ffmpeg` command-line tool.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    binary: PathBuf,
    overwrite: bool,
    video_codec: String,
    audio_codec: String,
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self {
            binary: PathBuf::from("ffmpeg"),
            overwrite: false,
            video_codec: "libx264".to_string(),
            audio_codec: "aac".to_string(),
        }
    }
}

impl FfmpegEncoder {
    /// Create an encoder that runs `ffmpeg` from `PATH`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a specific `ffmpeg` executable.
    pub fn binary(mut self, binary: impl Into<PathBuf>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Replace existing outputs instead of failing on them.
    pub fn overwrite(mut self, overwrite: bool) -> Self {
        self.overwrite = overwrite;
        self
    }

    /// Command-line arguments for `request`, without the program name.
    pub fn build_args(&self, request: &EncodeRequest) -> Vec<OsString> {
        let duration = request.range.duration();
        let mut args: Vec<OsString> = ["-hide_banner", "-nostdin", "-loglevel", "error"]
            .into_iter()
            .map(OsString::from)
            .collect();

        let overwrite_flag = if self.overwrite { "-y" } else { "-n" };
        args.push(overwrite_flag.into());
        args.push("-ss".into());
        args.push(format!("{:.3}", request.range.start()).into());
        args.push("-i".into());
        args.push(request.source.clone().into_os_string());
        args.push("-t".into());
        args.push(format!("{duration:.3}").into());

        let filters: Vec<String> = request
            .transforms
            .iter()
            .map(|transform| fade_filter(*transform, duration))
            .collect();
        if !filters.is_empty() {
            args.push("-vf".into());
            args.push(filters.join(",").into());
        }

        args.push("-c:v".into());
        args.push(self.video_codec.clone().into());
        args.push("-c:a".into());
        args.push(self.audio_codec.clone().into());
        args.push(request.output.clone().into_os_string());
        args
    }

    /// The full command for `request`.
    pub fn command(&self, request: &EncodeRequest) -> Command {
        let mut command = Command::new(&self.binary);
        command.args(self.build_args(request));
        command
    }
}

// Input seeking resets output timestamps to zero, so fades are placed
// relative to the exported range.
fn fade_filter(transform: Transform, clip_duration: f64) -> String {
    match transform {
        Transform::FadeIn(length) => {
            format!("fade=t=in:st=0:d={:.3}", length.as_secs_f64())
        }
        Transform::FadeOut(length) => {
            let length = length.as_secs_f64();
            let start = (clip_duration - length).max(0.0);
            format!("fade=t=out:st={start:.3}:d={length:.3}")
        }
    }
}

impl Encoder for FfmpegEncoder {
    fn encode(&self, request: &EncodeRequest) -> Result<(), ReelcutError> {
        log::debug!(
            "Encoding {} [{}] -> {}",
            request.source.display(),
            request.range,
            request.output.display()
        );

        let output = self.command(request).output().map_err(|error| {
            let reason = if error.kind() == ErrorKind::NotFound {
                format!("ffmpeg executable not found: {}", self.binary.display())
            } else {
                format!("failed to run {}: {error}", self.binary.display())
            };
            ReelcutError::EncodeError {
                output: request.output.clone(),
                reason,
            }
        })?;

        if output.status.success() {
            return Ok(());
        }

        let stderr = String::from_utf8_lossy(&output.stderr);
        let lines: Vec<&str> = stderr.lines().filter(|line| !line.trim().is_empty()).collect();
        let tail = lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("; ");
        let reason = if tail.is_empty() {
            format!("ffmpeg exited with {}", output.status)
        } else {
            format!("ffmpeg exited with {}: {tail}", output.status)
        };
        Err(ReelcutError::EncodeError {
            output: request.output.clone(),
            reason,
        })
    }
}

/// Result of materializing one output.
#[derive(Debug, Clone, PartialEq)]
pub struct EncodeOutcome {
    /// Output path.
    pub output: PathBuf,
    /// `true` when the output was written, or would have been in a dry run.
    pub success: bool,
    /// Encoder diagnostic for a failed output.
    pub error: Option<String>,
    /// `true` when the encoder was not invoked because of a dry run.
    pub dry_run: bool,
}

/// Hands planned segments and clips to an [`Encoder`] and reports outcomes.
pub struct Materializer<'a> {
    encoder: &'a dyn Encoder,
    reporter: &'a dyn Reporter,
    dry_run: bool,
}

impl<'a> Materializer<'a> {
    /// Create a materializer over `encoder`.
    pub fn new(encoder: &'a dyn Encoder, reporter: &'a dyn Reporter) -> Self {
        Self {
            encoder,
            reporter,
            dry_run: false,
        }
    }

    /// Plan and report outputs without invoking the encoder.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Export an accepted clip with its transforms.
    pub fn materialize_clip(&self, clip: &ClipSpec) -> EncodeOutcome {
        self.materialize(&EncodeRequest::from(clip))
    }

    /// Export a segment into `output_dir`. Segments carry no transforms.
    pub fn materialize_segment(
        &self,
        segment: &SegmentDescriptor,
        output_dir: &Path,
    ) -> EncodeOutcome {
        let output = output_dir.join(&segment.output_name);
        self.materialize(&EncodeRequest::new(&segment.source, segment.range, &output))
    }

    /// Export an arbitrary request.
    pub fn materialize(&self, request: &EncodeRequest) -> EncodeOutcome {
        if self.dry_run {
            self.reporter.report(&Event::OutputPlanned {
                output: request.output.clone(),
                range: request.range,
            });
            return EncodeOutcome {
                output: request.output.clone(),
                success: true,
                error: None,
                dry_run: true,
            };
        }

        match self.encoder.encode(request) {
            Ok(()) => {
                self.reporter.report(&Event::OutputWritten {
                    output: request.output.clone(),
                    range: request.range,
                });
                EncodeOutcome {
                    output: request.output.clone(),
                    success: true,
                    error: None,
                    dry_run: false,
                }
            }
            Err(error) => {
                let detail = match error {
                    ReelcutError::EncodeError { reason, .. } => reason,
                    other => other.to_string(),
                };
                self.reporter.report(&Event::OutputFailed {
                    output: request.output.clone(),
                    detail: detail.clone(),
                });
                EncodeOutcome {
                    output: request.output.clone(),
                    success: false,
                    error: Some(detail),
                    dry_run: false,
                }
            }
        }
    }
}
