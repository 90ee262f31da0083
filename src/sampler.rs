//! Constrained random clip sampling.
//!
//! Given the scene boundaries of one source video, [`ClipSampler`] draws a
//! target clip count `T` from `[min_clips, max_clips]` and then repeatedly
//! picks a random start boundary (any but the last) and a random end boundary
//! (any but the first). A candidate is accepted only when
//!
//! - the end boundary comes after the start boundary,
//! - its duration lies inside `[min_duration, max_duration]`,
//! - the exact same range has not been accepted already (and, under
//!   [`OverlapPolicy::RejectOverlapping`], it does not overlap any accepted
//!   range), and
//! - no file with its output name already exists in the output directory.
//!
//! Every rejection is reported. Attempts are capped at
//! `T × attempts_per_clip`; when the cap is hit the clips accepted so far are
//! returned in a [`ClipPlan`] flagged as exhausted.
//!
//! Randomness comes from a [`RandomSource`], implemented for every
//! [`rand::Rng`] and by [`ScriptedRandom`] for replaying fixed picks.
//!
//! # Example
//!
//! ```
//! use std::path::Path;
//!
//! use rand::SeedableRng;
//! use rand::rngs::StdRng;
//! use reelcut::{ClipSampler, ClipSamplerOptions, SilentReporter};
//!
//! let options = ClipSamplerOptions::new()
//!     .duration_range(3.0, 8.0)
//!     .clip_count_range(1, 2);
//! let sampler = ClipSampler::new(options)?;
//! let mut rng = StdRng::seed_from_u64(7);
//! let output_dir = tempfile::tempdir()?;
//!
//! let plan = sampler.sample(
//!     Path::new("talk.mp4"),
//!     &[10, 50, 90, 140],
//!     10.0,
//!     output_dir.path(),
//!     &mut rng,
//!     &SilentReporter,
//! )?;
//! for clip in &plan.clips {
//!     assert!((3.0..=8.0).contains(&clip.range.duration()));
//! }
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

use std::collections::HashSet;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::{Path, PathBuf};
use std::time::Duration;

use rand::Rng;

use crate::encode::Transform;
use crate::error::ReelcutError;
use crate::naming::clip_file_name;
use crate::range::TimeRange;
use crate::report::{Event, Reporter};

/// Source of the sampler's random choices.
pub trait RandomSource {
    /// A uniformly chosen index in `0..len`. `len` is never zero.
    fn pick_index(&mut self, len: usize) -> usize;

    /// A uniformly chosen count in `min..=max`. `min <= max` always holds.
    fn pick_count(&mut self, min: usize, max: usize) -> usize;
}

impl<R: Rng + ?Sized> RandomSource for R {
    fn pick_index(&mut self, len: usize) -> usize {
        self.gen_range(0..len)
    }

    fn pick_count(&mut self, min: usize, max: usize) -> usize {
        self.gen_range(min..=max)
    }
}

/// Replays a fixed sequence of picks.
///
/// Index picks cycle through `indices` (each reduced modulo the requested
/// length); count picks cycle through `counts` (each clamped into the
/// requested range). An empty list always yields the lowest value.
#[derive(Debug, Clone, Default)]
pub struct ScriptedRandom {
    counts: Vec<usize>,
    indices: Vec<usize>,
    next_count: usize,
    next_index: usize,
}

impl ScriptedRandom {
    /// Replay `counts` for target draws and `indices` for boundary draws.
    pub fn new(counts: Vec<usize>, indices: Vec<usize>) -> Self {
        Self {
            counts,
            indices,
            next_count: 0,
            next_index: 0,
        }
    }
}

impl RandomSource for ScriptedRandom {
    fn pick_index(&mut self, len: usize) -> usize {
        if self.indices.is_empty() {
            return 0;
        }
        let value = self.indices[self.next_index % self.indices.len()];
        self.next_index += 1;
        value % len
    }

    fn pick_count(&mut self, min: usize, max: usize) -> usize {
        if self.counts.is_empty() {
            return min;
        }
        let value = self.counts[self.next_count % self.counts.len()];
        self.next_count += 1;
        value.clamp(min, max)
    }
}

/// How accepted clips must relate to each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverlapPolicy {
    /// Only reject a candidate whose start and end are bit-identical to an
    /// accepted clip. Overlapping clips are allowed.
    #[default]
    ExactDuplicate,
    /// Also reject candidates that overlap any accepted clip.
    RejectOverlapping,
}

/// Clip sampling settings.
#[derive(Debug, Clone)]
pub struct ClipSamplerOptions {
    /// Shortest accepted clip, in seconds. Default: 25.
    pub min_duration: f64,
    /// Longest accepted clip, in seconds. Default: 60.
    pub max_duration: f64,
    /// Lower bound of the per-video target count. Default: 4.
    pub min_clips: usize,
    /// Upper bound of the per-video target count. Default: 10.
    pub max_clips: usize,
    /// Attempt budget per targeted clip. Default: 1000.
    pub attempts_per_clip: u64,
    /// Relation required between accepted clips.
    pub overlap_policy: OverlapPolicy,
    /// Length of the fade applied at both ends of each clip. Default: 1 s.
    pub fade: Duration,
}

impl Default for ClipSamplerOptions {
    fn default() -> Self {
        Self {
            min_duration: 25.0,
            max_duration: 60.0,
            min_clips: 4,
            max_clips: 10,
            attempts_per_clip: 1000,
            overlap_policy: OverlapPolicy::ExactDuplicate,
            fade: Duration::from_secs(1),
        }
    }
}

impl ClipSamplerOptions {
    /// Create sampling settings with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the accepted clip duration window, in seconds.
    pub fn duration_range(mut self, min: f64, max: f64) -> Self {
        self.min_duration = min;
        self.max_duration = max;
        self
    }

    /// Set the range the per-video target count is drawn from.
    pub fn clip_count_range(mut self, min: usize, max: usize) -> Self {
        self.min_clips = min;
        self.max_clips = max;
        self
    }

    /// Set the attempt budget per targeted clip.
    pub fn attempts_per_clip(mut self, attempts: u64) -> Self {
        self.attempts_per_clip = attempts;
        self
    }

    /// Set the overlap policy.
    pub fn overlap_policy(mut self, policy: OverlapPolicy) -> Self {
        self.overlap_policy = policy;
        self
    }

    /// Set the fade length. [`Duration::ZERO`] disables fades.
    pub fn fade(mut self, fade: Duration) -> Self {
        self.fade = fade;
        self
    }

    /// Check the bounds for consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ReelcutError::InvalidConfiguration`] when a duration bound
    /// is negative or not finite, when a lower bound exceeds its upper bound,
    /// or when the attempt budget is zero.
    pub fn validate(&self) -> Result<(), ReelcutError> {
        let invalid = |message: String| Err(ReelcutError::InvalidConfiguration(message));

        if !self.min_duration.is_finite()
            || !self.max_duration.is_finite()
            || self.min_duration < 0.0
            || self.max_duration <= 0.0
        {
            return invalid(format!(
                "clip durations must be finite and positive, got {}..{}",
                self.min_duration, self.max_duration
            ));
        }
        if self.min_duration > self.max_duration {
            return invalid(format!(
                "minimum clip duration {} exceeds maximum {}",
                self.min_duration, self.max_duration
            ));
        }
        if self.min_clips > self.max_clips {
            return invalid(format!(
                "minimum clip count {} exceeds maximum {}",
                self.min_clips, self.max_clips
            ));
        }
        if self.attempts_per_clip == 0 {
            return invalid("attempts per clip must be at least 1".to_string());
        }
        Ok(())
    }

    fn transforms(&self) -> Vec<Transform> {
        if self.fade.is_zero() {
            Vec::new()
        } else {
            vec![Transform::FadeIn(self.fade), Transform::FadeOut(self.fade)]
        }
    }
}

/// Why a sampled candidate was rejected.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Rejection {
    /// The end boundary does not come after the start boundary.
    EndNotAfterStart {
        /// Start boundary frame index.
        start_frame: u64,
        /// End boundary frame index.
        end_frame: u64,
    },
    /// The candidate is shorter or longer than allowed.
    DurationOutOfRange {
        /// Candidate duration in seconds.
        duration: f64,
    },
    /// The exact range was already accepted for this video.
    AlreadyUsed {
        /// The duplicated range.
        range: TimeRange,
    },
    /// The range overlaps an accepted clip.
    Overlapping {
        /// The candidate range.
        range: TimeRange,
        /// The accepted range it overlaps.
        existing: TimeRange,
    },
    /// A file with the candidate's output name already exists.
    OutputExists {
        /// Existing output path.
        path: PathBuf,
    },
}

impl Display for Rejection {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Rejection::EndNotAfterStart {
                start_frame,
                end_frame,
            } => write!(
                f,
                "End scene (frame {end_frame}) is not after start scene (frame {start_frame}). Skipping."
            ),
            Rejection::DurationOutOfRange { duration } => write!(
                f,
                "Generated clip duration is not within the specified range: {duration:.2} seconds. Skipping."
            ),
            Rejection::AlreadyUsed { range } => {
                write!(f, "Time range {range} has already been used. Skipping this clip.")
            }
            Rejection::Overlapping { range, existing } => write!(
                f,
                "Time range {range} overlaps accepted clip {existing}. Skipping this clip."
            ),
            Rejection::OutputExists { path } => {
                write!(f, "Short already exists: {}. Skipping.", path.display())
            }
        }
    }
}

/// Rejection tallies for one sampling run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RejectionCounts {
    /// End boundary not after start boundary.
    pub end_not_after_start: u64,
    /// Duration outside the window.
    pub duration_out_of_range: u64,
    /// Exact duplicate of an accepted range.
    pub already_used: u64,
    /// Overlapping an accepted range.
    pub overlapping: u64,
    /// Output file already present.
    pub output_exists: u64,
}

impl RejectionCounts {
    fn record(&mut self, rejection: &Rejection) {
        match rejection {
            Rejection::EndNotAfterStart { .. } => self.end_not_after_start += 1,
            Rejection::DurationOutOfRange { .. } => self.duration_out_of_range += 1,
            Rejection::AlreadyUsed { .. } => self.already_used += 1,
            Rejection::Overlapping { .. } => self.overlapping += 1,
            Rejection::OutputExists { .. } => self.output_exists += 1,
        }
    }

    /// Total number of rejected candidates.
    pub fn total(&self) -> u64 {
        self.end_not_after_start
            + self.duration_out_of_range
            + self.already_used
            + self.overlapping
            + self.output_exists
    }
}

/// An accepted clip, ready to be materialized.
#[derive(Debug, Clone, PartialEq)]
pub struct ClipSpec {
    /// Source video.
    pub source: PathBuf,
    /// Range to export.
    pub range: TimeRange,
    /// One-based acceptance ordinal.
    pub ordinal: usize,
    /// `short_<base>_<ordinal>.mp4`.
    pub output_name: String,
    /// Full output path inside the output directory.
    pub output: PathBuf,
    /// Visual transforms requested for the export.
    pub transforms: Vec<Transform>,
}

/// Outcome of sampling one video.
#[derive(Debug, Clone)]
pub struct ClipPlan {
    /// Accepted clips in acceptance order.
    pub clips: Vec<ClipSpec>,
    /// Target count drawn for this video.
    pub target: usize,
    /// Candidates drawn, accepted or not.
    pub attempts: u64,
    /// Why candidates were rejected.
    pub rejections: RejectionCounts,
    /// `true` when the attempt cap stopped sampling early.
    pub exhausted: bool,
}

impl ClipPlan {
    /// `true` when fewer clips than the target were accepted.
    pub fn is_partial(&self) -> bool {
        self.clips.len() < self.target
    }
}

/// Draws duration-bounded, non-duplicate clips from scene boundaries.
#[derive(Debug, Clone)]
pub struct ClipSampler {
    options: ClipSamplerOptions,
}

impl ClipSampler {
    /// Create a sampler after validating `options`.
    ///
    /// # Errors
    ///
    /// Returns [`ReelcutError::InvalidConfiguration`] if the options are
    /// inconsistent.
    pub fn new(options: ClipSamplerOptions) -> Result<Self, ReelcutError> {
        options.validate()?;
        Ok(Self { options })
    }

    /// The sampler's settings.
    pub fn options(&self) -> &ClipSamplerOptions {
        &self.options
    }

    /// Sample clips for one source video.
    ///
    /// `boundaries` are frame indices from the scene detector and
    /// `frames_per_second` converts them to seconds. Output names are checked
    /// against existing files in `output_dir`.
    ///
    /// # Errors
    ///
    /// - [`ReelcutError::InsufficientScenes`] with fewer than two boundaries.
    /// - [`ReelcutError::InvalidFrameRate`] for a non-positive frame rate.
    pub fn sample<R: RandomSource + ?Sized>(
        &self,
        source: &Path,
        boundaries: &[u64],
        frames_per_second: f64,
        output_dir: &Path,
        rng: &mut R,
        reporter: &dyn Reporter,
    ) -> Result<ClipPlan, ReelcutError> {
        if boundaries.len() < 2 {
            return Err(ReelcutError::InsufficientScenes {
                found: boundaries.len(),
            });
        }
        if !(frames_per_second > 0.0) || !frames_per_second.is_finite() {
            return Err(ReelcutError::InvalidFrameRate(frames_per_second));
        }

        let options = &self.options;
        let target = rng.pick_count(options.min_clips, options.max_clips);
        let max_attempts = (target as u64).saturating_mul(options.attempts_per_clip);
        let candidates = boundaries.len() - 1;

        log::debug!(
            "Sampling {target} clips from {} boundaries of {} (cap {max_attempts} attempts)",
            boundaries.len(),
            source.display()
        );

        let mut plan = ClipPlan {
            clips: Vec::with_capacity(target),
            target,
            attempts: 0,
            rejections: RejectionCounts::default(),
            exhausted: false,
        };
        let mut used: HashSet<(u64, u64)> = HashSet::new();

        while plan.clips.len() < target {
            if plan.attempts >= max_attempts {
                plan.exhausted = true;
                reporter.report(&Event::SamplingExhausted {
                    accepted: plan.clips.len(),
                    target,
                    attempts: plan.attempts,
                });
                break;
            }
            plan.attempts += 1;

            let start_frame = boundaries[rng.pick_index(candidates)];
            let end_frame = boundaries[1 + rng.pick_index(candidates)];

            match self.check_candidate(
                source,
                start_frame,
                end_frame,
                frames_per_second,
                output_dir,
                &plan.clips,
                &used,
            ) {
                Ok(clip) => {
                    used.insert(clip.range.key());
                    reporter.report(&Event::ClipAccepted {
                        output: clip.output.clone(),
                        range: clip.range,
                    });
                    plan.clips.push(clip);
                }
                Err(rejection) => {
                    plan.rejections.record(&rejection);
                    reporter.report(&Event::ClipRejected(rejection));
                }
            }
        }

        Ok(plan)
    }

    #[allow(clippy::too_many_arguments)]
    fn check_candidate(
        &self,
        source: &Path,
        start_frame: u64,
        end_frame: u64,
        frames_per_second: f64,
        output_dir: &Path,
        accepted: &[ClipSpec],
        used: &HashSet<(u64, u64)>,
    ) -> Result<ClipSpec, Rejection> {
        let options = &self.options;

        if end_frame <= start_frame {
            return Err(Rejection::EndNotAfterStart {
                start_frame,
                end_frame,
            });
        }

        // Frames that collapse to the same instant are a degenerate window.
        let range = TimeRange::from_frames(start_frame, end_frame, frames_per_second)
            .map_err(|_| Rejection::DurationOutOfRange { duration: 0.0 })?;

        let duration = range.duration();
        if duration < options.min_duration || duration > options.max_duration {
            return Err(Rejection::DurationOutOfRange { duration });
        }

        if used.contains(&range.key()) {
            return Err(Rejection::AlreadyUsed { range });
        }

        if options.overlap_policy == OverlapPolicy::RejectOverlapping {
            if let Some(existing) = accepted.iter().find(|clip| clip.range.overlaps(&range)) {
                return Err(Rejection::Overlapping {
                    range,
                    existing: existing.range,
                });
            }
        }

        let ordinal = accepted.len() + 1;
        let output_name = clip_file_name(source, ordinal);
        let output = output_dir.join(&output_name);
        if output.exists() {
            return Err(Rejection::OutputExists { path: output });
        }

        Ok(ClipSpec {
            source: source.to_path_buf(),
            range,
            ordinal,
            output_name,
            output,
            transforms: options.transforms(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{MemoryReporter, SilentReporter};

    fn sampler(min_duration: f64, max_duration: f64, min_clips: usize, max_clips: usize) -> ClipSampler {
        ClipSampler::new(
            ClipSamplerOptions::new()
                .duration_range(min_duration, max_duration)
                .clip_count_range(min_clips, max_clips),
        )
        .unwrap()
    }

    #[test]
    fn defaults_are_short_form_sized() {
        let options = ClipSamplerOptions::default();
        assert_eq!(options.min_duration, 25.0);
        assert_eq!(options.max_duration, 60.0);
        assert_eq!((options.min_clips, options.max_clips), (4, 10));
        assert_eq!(options.fade, Duration::from_secs(1));
        assert!(options.validate().is_ok());
    }

    #[test]
    fn validate_rejects_inverted_bounds() {
        assert!(ClipSamplerOptions::new().duration_range(10.0, 5.0).validate().is_err());
        assert!(ClipSamplerOptions::new().clip_count_range(5, 4).validate().is_err());
        assert!(ClipSamplerOptions::new().duration_range(-1.0, 5.0).validate().is_err());
        assert!(ClipSamplerOptions::new().attempts_per_clip(0).validate().is_err());
    }

    #[test]
    fn scripted_random_cycles_and_clamps() {
        let mut rng = ScriptedRandom::new(vec![99], vec![1, 5]);
        assert_eq!(rng.pick_count(2, 4), 4);
        assert_eq!(rng.pick_index(3), 1);
        assert_eq!(rng.pick_index(3), 2);
        assert_eq!(rng.pick_index(3), 1);

        let mut empty = ScriptedRandom::default();
        assert_eq!(empty.pick_count(3, 9), 3);
        assert_eq!(empty.pick_index(4), 0);
    }

    #[test]
    fn accepts_scripted_pair() {
        let dir = tempfile::tempdir().unwrap();
        // Boundaries [10, 50, 90, 140]: start index 1 -> 50, end index 1 -> 1 + 1 -> 90.
        let mut rng = ScriptedRandom::new(vec![1], vec![1, 1]);
        let plan = sampler(3.0, 8.0, 1, 1)
            .sample(
                Path::new("talk.mp4"),
                &[10, 50, 90, 140],
                10.0,
                dir.path(),
                &mut rng,
                &SilentReporter,
            )
            .unwrap();

        assert_eq!(plan.target, 1);
        assert_eq!(plan.attempts, 1);
        let clip = &plan.clips[0];
        assert_eq!((clip.range.start(), clip.range.end()), (5.0, 9.0));
        assert_eq!(clip.output_name, "short_talk_1.mp4");
        assert_eq!(clip.output, dir.path().join("short_talk_1.mp4"));
        assert_eq!(
            clip.transforms,
            vec![
                Transform::FadeIn(Duration::from_secs(1)),
                Transform::FadeOut(Duration::from_secs(1))
            ]
        );
    }

    #[test]
    fn rejects_too_long_pair_then_accepts() {
        let dir = tempfile::tempdir().unwrap();
        let reporter = MemoryReporter::new();
        // First candidate (10, 140) = 13 s, second (50, 90) = 4 s.
        let mut rng = ScriptedRandom::new(vec![1], vec![0, 2, 1, 1]);
        let plan = sampler(3.0, 8.0, 1, 1)
            .sample(
                Path::new("talk.mp4"),
                &[10, 50, 90, 140],
                10.0,
                dir.path(),
                &mut rng,
                &reporter,
            )
            .unwrap();

        assert_eq!(plan.attempts, 2);
        assert_eq!(plan.rejections.duration_out_of_range, 1);
        assert!(matches!(
            reporter.events()[0],
            Event::ClipRejected(Rejection::DurationOutOfRange { duration }) if (duration - 13.0).abs() < 1e-9
        ));
    }

    #[test]
    fn insufficient_boundaries_abort() {
        let dir = tempfile::tempdir().unwrap();
        for boundaries in [&[][..], &[42][..]] {
            let result = sampler(1.0, 2.0, 1, 1).sample(
                Path::new("a.mp4"),
                boundaries,
                30.0,
                dir.path(),
                &mut ScriptedRandom::default(),
                &SilentReporter,
            );
            assert!(matches!(
                result,
                Err(ReelcutError::InsufficientScenes { found }) if found == boundaries.len()
            ));
        }
    }

    #[test]
    fn zero_target_returns_immediately() {
        let dir = tempfile::tempdir().unwrap();
        let plan = sampler(1.0, 2.0, 0, 0)
            .sample(
                Path::new("a.mp4"),
                &[1, 2, 3],
                1.0,
                dir.path(),
                &mut ScriptedRandom::default(),
                &SilentReporter,
            )
            .unwrap();
        assert_eq!(plan.target, 0);
        assert_eq!(plan.attempts, 0);
        assert!(!plan.is_partial());
    }

    #[test]
    fn invalid_frame_rate_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let result = sampler(1.0, 2.0, 1, 1).sample(
            Path::new("a.mp4"),
            &[1, 2, 3],
            0.0,
            dir.path(),
            &mut ScriptedRandom::default(),
            &SilentReporter,
        );
        assert!(matches!(result, Err(ReelcutError::InvalidFrameRate(_))));
    }

    #[test]
    fn fade_can_be_disabled() {
        let options = ClipSamplerOptions::new().fade(Duration::ZERO);
        assert!(options.transforms().is_empty());
    }

    #[test]
    fn rejection_counts_total() {
        let mut counts = RejectionCounts::default();
        counts.record(&Rejection::DurationOutOfRange { duration: 1.0 });
        counts.record(&Rejection::EndNotAfterStart {
            start_frame: 2,
            end_frame: 1,
        });
        counts.record(&Rejection::OutputExists {
            path: PathBuf::from("x.mp4"),
        });
        assert_eq!(counts.total(), 3);
        assert_eq!(counts.output_exists, 1);
    }
}
