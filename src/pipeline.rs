//! Per-video orchestration.
//!
//! [`Pipeline`] wires a [`MediaOpener`], the scene detector, the segmenter or
//! clip sampler, and a [`Materializer`] together, one source video at a time.
//! Failures are contained per video: an unreadable source, a detection pass
//! that yields nothing, or too few scenes are reported and counted in the
//! [`BatchSummary`], and the batch moves on to the next video. Each source is
//! dropped, releasing its decoder, before its outputs are encoded.
//!
//! # Example
//!
//! ```no_run
//! # #[cfg(feature = "ffmpeg")]
//! # fn main() -> Result<(), reelcut::ReelcutError> {
//! use std::path::{Path, PathBuf};
//!
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//! use reelcut::{FfmpegEncoder, FfmpegOpener, LogReporter, Pipeline};
//!
//! let encoder = FfmpegEncoder::new();
//! let pipeline = Pipeline::new(&FfmpegOpener, &encoder, &LogReporter).output_dir("shorts");
//!
//! let summary = pipeline.split_video(Path::new("lecture.mp4"))?;
//! println!("{summary}");
//!
//! let mut rng = StdRng::from_entropy();
//! let summary = pipeline.create_shorts(&[PathBuf::from("lecture.mp4")], &mut rng)?;
//! println!("{summary}");
//! # Ok(())
//! # }
//! # #[cfg(not(feature = "ffmpeg"))]
//! # fn main() {}
//! ```

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::fs;
use std::path::{Path, PathBuf};

use crate::encode::{EncodeOutcome, Encoder, Materializer};
use crate::error::ReelcutError;
use crate::frame::FrameSource;
use crate::metadata::VideoMetadata;
use crate::report::{Event, Reporter};
use crate::sampler::{ClipSampler, ClipSamplerOptions, RandomSource};
use crate::scene::{SceneDetectionOptions, detect_scene_boundaries};
use crate::segment::{SegmentOptions, plan_segments};

/// Opens source videos for the pipeline.
pub trait MediaOpener {
    /// Open `path` as a frame source.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or has no video stream.
    fn open(&self, path: &Path) -> Result<Box<dyn FrameSource>, ReelcutError>;
}

/// Opens files with FFmpeg as [`MediaFile`](crate::MediaFile)s.
#[cfg(feature = "ffmpeg")]
#[derive(Debug, Default, Clone, Copy)]
pub struct FfmpegOpener;

#[cfg(feature = "ffmpeg")]
impl MediaOpener for FfmpegOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn FrameSource>, ReelcutError> {
        Ok(Box::new(crate::decode::MediaFile::open(path)?))
    }
}

/// Totals for one batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    /// Videos that produced a plan (even an empty or partial one).
    pub videos_processed: usize,
    /// Videos skipped for the current mode (too short, too few scenes).
    pub videos_skipped: usize,
    /// Videos that could not be opened or decoded.
    pub videos_failed: usize,
    /// Outputs encoded.
    pub outputs_written: usize,
    /// Outputs the encoder failed on.
    pub outputs_failed: usize,
    /// Outputs planned but not encoded because of a dry run.
    pub outputs_planned: usize,
    /// Videos whose clip sampling hit the attempt cap.
    pub partial_samplings: usize,
}

impl BatchSummary {
    /// Add another summary's totals to this one.
    pub fn merge(&mut self, other: &BatchSummary) {
        self.videos_processed += other.videos_processed;
        self.videos_skipped += other.videos_skipped;
        self.videos_failed += other.videos_failed;
        self.outputs_written += other.outputs_written;
        self.outputs_failed += other.outputs_failed;
        self.outputs_planned += other.outputs_planned;
        self.partial_samplings += other.partial_samplings;
    }

    /// Total number of videos looked at.
    pub fn videos_seen(&self) -> usize {
        self.videos_processed + self.videos_skipped + self.videos_failed
    }

    fn record(&mut self, outcome: &EncodeOutcome) {
        match (outcome.success, outcome.dry_run) {
            (true, true) => self.outputs_planned += 1,
            (true, false) => self.outputs_written += 1,
            (false, _) => self.outputs_failed += 1,
        }
    }
}

impl Display for BatchSummary {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "{} videos: {} processed, {} skipped, {} failed; outputs: {} written, {} failed",
            self.videos_seen(),
            self.videos_processed,
            self.videos_skipped,
            self.videos_failed,
            self.outputs_written,
            self.outputs_failed,
        )?;
        if self.outputs_planned > 0 {
            write!(f, ", {} planned", self.outputs_planned)?;
        }
        if self.partial_samplings > 0 {
            write!(f, "; {} partial samplings", self.partial_samplings)?;
        }
        Ok(())
    }
}

/// Runs the split and shorts workflows over source videos.
pub struct Pipeline<'a> {
    opener: &'a dyn MediaOpener,
    encoder: &'a dyn Encoder,
    reporter: &'a dyn Reporter,
    output_dir: PathBuf,
    dry_run: bool,
    detection: SceneDetectionOptions,
    segments: SegmentOptions,
    sampling: ClipSamplerOptions,
}

impl<'a> Pipeline<'a> {
    /// Create a pipeline writing to the current directory with default
    /// options.
    pub fn new(
        opener: &'a dyn MediaOpener,
        encoder: &'a dyn Encoder,
        reporter: &'a dyn Reporter,
    ) -> Self {
        Self {
            opener,
            encoder,
            reporter,
            output_dir: PathBuf::from("."),
            dry_run: false,
            detection: SceneDetectionOptions::default(),
            segments: SegmentOptions::default(),
            sampling: ClipSamplerOptions::default(),
        }
    }

    /// Directory outputs are written to and checked against.
    pub fn output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Plan and report outputs without encoding them.
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Scene detection settings for the shorts workflow.
    pub fn scene_detection(mut self, options: SceneDetectionOptions) -> Self {
        self.detection = options;
        self
    }

    /// Segmenter settings for the split workflow.
    pub fn segment_options(mut self, options: SegmentOptions) -> Self {
        self.segments = options;
        self
    }

    /// Clip sampler settings for the shorts workflow.
    pub fn sampler_options(mut self, options: ClipSamplerOptions) -> Self {
        self.sampling = options;
        self
    }

    /// Split one video into fixed-length segments.
    ///
    /// # Errors
    ///
    /// Returns an error only for invalid segment options or an output
    /// directory that cannot be created. Per-video and per-output failures
    /// are reported and counted in the summary.
    pub fn split_video(&self, path: &Path) -> Result<BatchSummary, ReelcutError> {
        self.segments.validate()?;
        self.prepare_output_dir()?;

        let mut summary = BatchSummary::default();
        self.reporter.report(&Event::VideoStarted {
            path: path.to_path_buf(),
        });

        let Some(metadata) = self.open_metadata(path, &mut summary) else {
            return Ok(summary);
        };

        let segments = plan_segments(
            path,
            metadata.duration_seconds(),
            &self.segments,
            self.reporter,
        )?;
        if segments.is_empty() {
            summary.videos_skipped += 1;
            return Ok(summary);
        }

        let materializer = self.materializer();
        for segment in &segments {
            let outcome = materializer.materialize_segment(segment, &self.output_dir);
            summary.record(&outcome);
        }
        summary.videos_processed += 1;
        Ok(summary)
    }

    /// Sample and export short clips from each video in turn.
    ///
    /// # Errors
    ///
    /// Returns an error only for invalid sampler options or an output
    /// directory that cannot be created.
    pub fn create_shorts<R: RandomSource + ?Sized>(
        &self,
        paths: &[PathBuf],
        rng: &mut R,
    ) -> Result<BatchSummary, ReelcutError> {
        let sampler = ClipSampler::new(self.sampling.clone())?;
        self.prepare_output_dir()?;

        let mut summary = BatchSummary::default();
        for path in paths {
            self.create_shorts_for(path, &sampler, rng, &mut summary);
        }
        Ok(summary)
    }

    fn create_shorts_for<R: RandomSource + ?Sized>(
        &self,
        path: &Path,
        sampler: &ClipSampler,
        rng: &mut R,
        summary: &mut BatchSummary,
    ) {
        self.reporter.report(&Event::VideoStarted {
            path: path.to_path_buf(),
        });

        let mut source = match self.opener.open(path) {
            Ok(source) => source,
            Err(error) => {
                self.unreadable(path, error.to_string(), summary);
                return;
            }
        };
        let metadata = source.metadata().clone();
        self.reporter.report(&Event::VideoProperties {
            path: path.to_path_buf(),
            metadata: metadata.clone(),
        });

        let min_duration = sampler.options().min_duration;
        if metadata.duration_seconds() < min_duration {
            self.skipped(
                path,
                format!(
                    "video is {:.2} seconds long, shorter than the minimum clip duration of {min_duration} seconds",
                    metadata.duration_seconds()
                ),
                summary,
            );
            return;
        }

        let detection = self.detection.clone().expected_frames(metadata.frame_count);
        let scan = match source.frames() {
            Ok(frames) => detect_scene_boundaries(frames, &detection, self.reporter),
            Err(error) => {
                self.unreadable(path, error.to_string(), summary);
                return;
            }
        };
        drop(source);

        if scan.read_failed() {
            let reason = scan
                .decode_error
                .unwrap_or_else(|| "no frames could be read".to_string());
            self.unreadable(path, reason, summary);
            return;
        }

        let plan = match sampler.sample(
            path,
            &scan.boundaries,
            metadata.frames_per_second,
            &self.output_dir,
            rng,
            self.reporter,
        ) {
            Ok(plan) => plan,
            Err(error) => {
                self.skipped(path, error.to_string(), summary);
                return;
            }
        };
        if plan.exhausted {
            summary.partial_samplings += 1;
        }

        let materializer = self.materializer();
        for clip in &plan.clips {
            let outcome = materializer.materialize_clip(clip);
            summary.record(&outcome);
        }
        summary.videos_processed += 1;
    }

    fn open_metadata(&self, path: &Path, summary: &mut BatchSummary) -> Option<VideoMetadata> {
        match self.opener.open(path) {
            Ok(source) => {
                let metadata = source.metadata().clone();
                self.reporter.report(&Event::VideoProperties {
                    path: path.to_path_buf(),
                    metadata: metadata.clone(),
                });
                Some(metadata)
            }
            Err(error) => {
                self.unreadable(path, error.to_string(), summary);
                None
            }
        }
    }

    fn unreadable(&self, path: &Path, reason: String, summary: &mut BatchSummary) {
        self.reporter.report(&Event::SourceUnreadable {
            path: path.to_path_buf(),
            reason,
        });
        summary.videos_failed += 1;
    }

    fn skipped(&self, path: &Path, reason: String, summary: &mut BatchSummary) {
        self.reporter.report(&Event::VideoSkipped {
            path: path.to_path_buf(),
            reason,
        });
        summary.videos_skipped += 1;
    }

    fn materializer(&self) -> Materializer<'a> {
        Materializer::new(self.encoder, self.reporter).dry_run(self.dry_run)
    }

    fn prepare_output_dir(&self) -> Result<(), ReelcutError> {
        if !self.dry_run {
            fs::create_dir_all(&self.output_dir)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_merges_and_displays() {
        let mut total = BatchSummary {
            videos_processed: 1,
            outputs_written: 3,
            ..BatchSummary::default()
        };
        total.merge(&BatchSummary {
            videos_failed: 1,
            outputs_failed: 1,
            partial_samplings: 1,
            ..BatchSummary::default()
        });

        assert_eq!(total.videos_seen(), 2);
        assert_eq!(
            total.to_string(),
            "2 videos: 1 processed, 0 skipped, 1 failed; outputs: 3 written, 1 failed; 1 partial samplings"
        );
    }

    #[test]
    fn outcomes_are_tallied_by_kind() {
        let mut summary = BatchSummary::default();
        let outcome = |success, dry_run| EncodeOutcome {
            output: PathBuf::from("o.mp4"),
            success,
            error: None,
            dry_run,
        };
        summary.record(&outcome(true, false));
        summary.record(&outcome(true, true));
        summary.record(&outcome(false, false));
        assert_eq!(
            (summary.outputs_written, summary.outputs_planned, summary.outputs_failed),
            (1, 1, 1)
        );
    }
}
