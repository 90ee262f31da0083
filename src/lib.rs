//! # reelcut
//!
//! Cut long videos into pieces: fixed-length segments, or randomly sampled
//! short clips that start and end on scene cuts.
//!
//! The core is split into small, independently testable stages:
//!
//! - a [`FrameSource`] yields [`VideoMetadata`] and a stream of decoded
//!   frames ([`MediaFile`] decodes with FFmpeg; [`MemoryFrameSource`] holds
//!   synthetic frames),
//! - [`detect_scene_boundaries`] flags hard cuts by counting changed pixels
//!   between consecutive frames,
//! - [`plan_segments`] tiles a duration into windows of bounded length,
//! - [`ClipSampler`] draws duration-bounded, non-duplicate clips from pairs
//!   of scene boundaries,
//! - a [`Materializer`] hands each planned output to an [`Encoder`]
//!   ([`FfmpegEncoder`] runs the `ffmpeg` executable).
//!
//! [`Pipeline`] runs these per video, containing failures, and every
//! operational event goes to an injected [`Reporter`].
//!
//! ## Quick Start
//!
//! ### Split a video into 10-minute parts
//!
//! ```no_run
//! # #[cfg(feature = "ffmpeg")]
//! # fn main() -> Result<(), reelcut::ReelcutError> {
//! use std::path::Path;
//!
//! use reelcut::{FfmpegEncoder, FfmpegOpener, LogReporter, Pipeline};
//!
//! let encoder = FfmpegEncoder::new();
//! let summary = Pipeline::new(&FfmpegOpener, &encoder, &LogReporter)
//!     .split_video(Path::new("lecture.mp4"))?;
//! println!("{summary}");
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "ffmpeg"))]
//! # fn main() {}
//! ```
//!
//! ### Detect scene cuts in synthetic frames
//!
//! ```
//! use image::{DynamicImage, GrayImage, Luma};
//! use reelcut::{SceneDetectionOptions, SilentReporter, detect_scene_boundaries};
//!
//! let frame = |value| DynamicImage::ImageLuma8(GrayImage::from_pixel(200, 100, Luma([value])));
//! let frames = vec![Ok(frame(0)), Ok(frame(0)), Ok(frame(255)), Ok(frame(255))];
//!
//! let scan = detect_scene_boundaries(frames, &SceneDetectionOptions::new(), &SilentReporter);
//! assert_eq!(scan.boundaries, vec![1]);
//! ```
//!
//! ## Features
//!
//! - `ffmpeg` (default): in-process decoding and probing through
//!   `ffmpeg-next`, plus the `reelcut` binary. Without it the detector,
//!   segmenter, sampler and materializer still build and run against
//!   in-memory sources.

#[cfg(feature = "ffmpeg")]
pub mod decode;
pub mod discovery;
pub mod encode;
pub mod error;
pub mod frame;
pub mod metadata;
pub mod naming;
pub mod pipeline;
pub mod range;
pub mod report;
pub mod sampler;
pub mod scene;
pub mod segment;

#[cfg(feature = "ffmpeg")]
pub use decode::{FfmpegLogLevel, FrameIterator, MediaFile, set_ffmpeg_log_level};
pub use discovery::{DEFAULT_VIDEO_EXTENSIONS, discover_videos};
pub use encode::{EncodeOutcome, EncodeRequest, Encoder, FfmpegEncoder, Materializer, Transform};
pub use error::ReelcutError;
pub use frame::{FrameResult, FrameSource, FrameStream, MemoryFrameSource};
pub use metadata::VideoMetadata;
#[cfg(feature = "ffmpeg")]
pub use pipeline::FfmpegOpener;
pub use pipeline::{BatchSummary, MediaOpener, Pipeline};
pub use range::TimeRange;
pub use report::{
    Event, LogReporter, MemoryReporter, ProgressInfo, Reporter, Severity, SilentReporter,
};
pub use sampler::{
    ClipPlan, ClipSampler, ClipSamplerOptions, ClipSpec, OverlapPolicy, RandomSource, Rejection,
    RejectionCounts, ScriptedRandom,
};
pub use scene::{DEFAULT_THRESHOLD, SceneDetectionOptions, SceneScan, detect_scene_boundaries};
pub use segment::{
    DEFAULT_MAX_SEGMENT_SECONDS, SegmentDescriptor, SegmentOptions, plan_segments,
};
