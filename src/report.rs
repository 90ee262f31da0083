//! Event reporting and progress snapshots.
//!
//! Components never write to a global logger for operational messages.
//! Instead they receive a [`Reporter`] and hand it typed [`Event`] values:
//! rejected clip candidates, written outputs, skipped videos, and so on.
//! [`LogReporter`] forwards events to the [`log`] facade; the CLI installs a
//! colored terminal reporter; tests use [`MemoryReporter`] to assert on what
//! was reported.
//!
//! # Example
//!
//! ```
//! use reelcut::{Event, MemoryReporter, Reporter, Severity};
//!
//! let reporter = MemoryReporter::new();
//! reporter.report(&Event::ScenesDetected { count: 3, frames: 120 });
//! assert_eq!(reporter.events().len(), 1);
//! assert_eq!(reporter.events()[0].severity(), Severity::Info);
//! ```

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::metadata::VideoMetadata;
use crate::range::TimeRange;
use crate::sampler::Rejection;

/// How loudly an event should be surfaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    /// Normal progress.
    Info,
    /// Something was skipped or rejected; processing continues.
    Warning,
    /// A video or output failed; processing continues with the next one.
    Error,
}

/// An operational event emitted by the detector, segmenter, sampler,
/// materializer, or pipeline.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum Event {
    /// Processing of a source video began.
    VideoStarted {
        /// Source path.
        path: PathBuf,
    },
    /// Properties of an opened source.
    VideoProperties {
        /// Source path.
        path: PathBuf,
        /// Probed metadata.
        metadata: VideoMetadata,
    },
    /// The source could not be opened or yielded no frames.
    SourceUnreadable {
        /// Source path.
        path: PathBuf,
        /// Why the source was unreadable.
        reason: String,
    },
    /// A source was skipped for the current mode.
    VideoSkipped {
        /// Source path.
        path: PathBuf,
        /// Why it was skipped.
        reason: String,
    },
    /// A detection pass finished.
    ScenesDetected {
        /// Number of boundaries found.
        count: usize,
        /// Number of frames consumed.
        frames: u64,
    },
    /// The segmenter met a non-positive window and stopped.
    SegmentSkipped {
        /// Window start in seconds.
        start: f64,
        /// Window end in seconds.
        end: f64,
    },
    /// A sampled clip candidate was rejected.
    ClipRejected(Rejection),
    /// A clip candidate was accepted.
    ClipAccepted {
        /// Planned output path.
        output: PathBuf,
        /// Accepted range.
        range: TimeRange,
    },
    /// The sampler hit its attempt cap before reaching the target count.
    SamplingExhausted {
        /// Clips accepted before giving up.
        accepted: usize,
        /// Target clip count for the video.
        target: usize,
        /// Attempts spent.
        attempts: u64,
    },
    /// An output file was encoded.
    OutputWritten {
        /// Output path.
        output: PathBuf,
        /// Exported range.
        range: TimeRange,
    },
    /// An output was planned but not encoded because of `--dry-run`.
    OutputPlanned {
        /// Output path.
        output: PathBuf,
        /// Range that would be exported.
        range: TimeRange,
    },
    /// The encoder failed for one output.
    OutputFailed {
        /// Output path.
        output: PathBuf,
        /// Encoder diagnostic.
        detail: String,
    },
}

impl Event {
    /// Severity of this event.
    pub fn severity(&self) -> Severity {
        match self {
            Event::VideoStarted { .. }
            | Event::VideoProperties { .. }
            | Event::ScenesDetected { .. }
            | Event::ClipAccepted { .. }
            | Event::OutputWritten { .. }
            | Event::OutputPlanned { .. }
            | Event::ClipRejected(Rejection::EndNotAfterStart { .. }) => Severity::Info,
            Event::VideoSkipped { .. }
            | Event::SegmentSkipped { .. }
            | Event::ClipRejected(_)
            | Event::SamplingExhausted { .. } => Severity::Warning,
            Event::SourceUnreadable { .. } | Event::OutputFailed { .. } => Severity::Error,
        }
    }
}

impl Display for Event {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Event::VideoStarted { path } => write!(f, "Processing video: {}", path.display()),
            Event::VideoProperties { path, metadata } => {
                write!(f, "{}: {metadata}", path.display())
            }
            Event::SourceUnreadable { path, reason } => {
                write!(f, "Failed to read video {}: {reason}", path.display())
            }
            Event::VideoSkipped { path, reason } => {
                write!(f, "Skipping {}: {reason}", path.display())
            }
            Event::ScenesDetected { count, frames } => {
                write!(f, "Detected {count} scenes in {frames} frames")
            }
            Event::SegmentSkipped { start, end } => {
                write!(f, "Skipping invalid segment from {start} to {end}")
            }
            Event::ClipRejected(rejection) => write!(f, "{rejection}"),
            Event::ClipAccepted { output, range } => {
                write!(f, "Accepted clip {} ({range})", output.display())
            }
            Event::SamplingExhausted {
                accepted,
                target,
                attempts,
            } => write!(
                f,
                "Gave up after {attempts} attempts with {accepted} of {target} clips accepted"
            ),
            Event::OutputWritten { output, range } => {
                write!(f, "Created {} from {range}", output.display())
            }
            Event::OutputPlanned { output, range } => {
                write!(f, "Would create {} from {range}", output.display())
            }
            Event::OutputFailed { output, detail } => {
                write!(f, "Error creating {}: {detail}", output.display())
            }
        }
    }
}

/// A snapshot of detection progress.
#[derive(Debug, Clone)]
pub struct ProgressInfo {
    /// Frames consumed so far.
    pub current: u64,
    /// Total frames expected, if known ahead of time.
    pub total: Option<u64>,
    /// Completion percentage (0.0 – 100.0), if `total` is known.
    pub percentage: Option<f32>,
    /// Wall-clock time elapsed since the pass started.
    pub elapsed: Duration,
}

/// Receiver for operational events.
///
/// Implementations must be [`Send`] and [`Sync`] so a single reporter can be
/// shared behind an `Arc`. Reporting is infallible: a reporter observes but
/// cannot halt processing.
pub trait Reporter: Send + Sync {
    /// Called once per event.
    fn report(&self, event: &Event);

    /// Called at the configured cadence during a detection pass.
    fn on_progress(&self, _info: &ProgressInfo) {}
}

/// Forwards events to the [`log`] facade at a level matching their severity.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogReporter;

impl Reporter for LogReporter {
    fn report(&self, event: &Event) {
        match event.severity() {
            Severity::Info => log::info!("{event}"),
            Severity::Warning => log::warn!("{event}"),
            Severity::Error => log::error!("{event}"),
        }
    }

    fn on_progress(&self, info: &ProgressInfo) {
        log::trace!("detection progress: {} frames", info.current);
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl Reporter for SilentReporter {
    fn report(&self, _event: &Event) {}
}

/// Keeps every event in memory, in order.
#[derive(Debug, Default)]
pub struct MemoryReporter {
    events: Mutex<Vec<Event>>,
    progress_calls: Mutex<u64>,
}

impl MemoryReporter {
    /// Create an empty reporter.
    pub fn new() -> Self {
        Self::default()
    }

    /// A copy of all events reported so far.
    pub fn events(&self) -> Vec<Event> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Number of events with the given severity.
    pub fn count(&self, severity: Severity) -> usize {
        self.events()
            .iter()
            .filter(|event| event.severity() == severity)
            .count()
    }

    /// Number of progress snapshots received.
    pub fn progress_calls(&self) -> u64 {
        self.progress_calls.lock().map(|calls| *calls).unwrap_or(0)
    }
}

impl Reporter for MemoryReporter {
    fn report(&self, event: &Event) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }

    fn on_progress(&self, _info: &ProgressInfo) {
        if let Ok(mut calls) = self.progress_calls.lock() {
            *calls += 1;
        }
    }
}

/// Tracks detection throughput and fires [`Reporter::on_progress`] every
/// `batch_size` frames.
pub(crate) struct ProgressTracker<'a> {
    reporter: &'a dyn Reporter,
    total: Option<u64>,
    current: u64,
    batch_size: u64,
    start_time: Instant,
    since_last_report: u64,
}

impl<'a> ProgressTracker<'a> {
    pub(crate) fn new(reporter: &'a dyn Reporter, total: Option<u64>, batch_size: u64) -> Self {
        Self {
            reporter,
            total,
            current: 0,
            batch_size: batch_size.max(1),
            start_time: Instant::now(),
            since_last_report: 0,
        }
    }

    pub(crate) fn advance(&mut self) {
        self.current += 1;
        self.since_last_report += 1;
        if self.since_last_report >= self.batch_size {
            self.emit();
            self.since_last_report = 0;
        }
    }

    pub(crate) fn finish(&mut self) {
        if self.since_last_report > 0 {
            self.emit();
            self.since_last_report = 0;
        }
    }

    fn emit(&self) {
        let percentage = self
            .total
            .filter(|&total| total > 0)
            .map(|total| (self.current as f32 / total as f32 * 100.0).min(100.0));
        self.reporter.on_progress(&ProgressInfo {
            current: self.current,
            total: self.total,
            percentage,
            elapsed: self.start_time.elapsed(),
        });
    }
}
