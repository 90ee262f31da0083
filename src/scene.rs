//! Scene boundary detection by frame differencing.
//!
//! Each frame is reduced to a single intensity channel and compared with the
//! previous frame. When the number of pixels whose intensity changed at all
//! exceeds a fixed threshold, the comparison is recorded as a scene boundary.
//! There is no smoothing and no minimum gap: consecutive comparisons may both
//! be flagged.
//!
//! Boundary indices count comparisons, not decoded frames: the comparison
//! between frame 0 and frame 1 is index 0.
//!
//! # Example
//!
//! ```
//! use image::{DynamicImage, GrayImage, Luma};
//! use reelcut::{SceneDetectionOptions, SilentReporter, detect_scene_boundaries};
//!
//! let dark = DynamicImage::ImageLuma8(GrayImage::from_pixel(8, 8, Luma([0])));
//! let light = DynamicImage::ImageLuma8(GrayImage::from_pixel(8, 8, Luma([255])));
//! let frames = vec![Ok(dark.clone()), Ok(dark), Ok(light)];
//!
//! let options = SceneDetectionOptions::new().threshold(10);
//! let scan = detect_scene_boundaries(frames, &options, &SilentReporter);
//! assert_eq!(scan.boundaries, vec![1]);
//! ```

use image::{DynamicImage, GrayImage};

use crate::frame::FrameResult;
use crate::report::{Event, ProgressTracker, Reporter};

/// Default number of changed pixels above which a comparison counts as a cut.
pub const DEFAULT_THRESHOLD: u64 = 10_000;

/// Scene detection settings.
#[derive(Debug, Clone)]
pub struct SceneDetectionOptions {
    /// A comparison is a boundary when strictly more than this many pixels
    /// changed intensity. Default: 10 000.
    pub threshold: u64,
    /// Fire a progress snapshot every this many frames. Default: 250.
    pub progress_batch: u64,
    /// Expected frame count, used only for progress percentages.
    pub expected_frames: Option<u64>,
}

impl Default for SceneDetectionOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            progress_batch: 250,
            expected_frames: None,
        }
    }
}

impl SceneDetectionOptions {
    /// Create a new scene detection configuration with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the changed-pixel threshold.
    pub fn threshold(mut self, threshold: u64) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set the progress cadence in frames. Zero is treated as one.
    pub fn progress_batch(mut self, frames: u64) -> Self {
        self.progress_batch = frames.max(1);
        self
    }

    /// Set the expected frame count for progress percentages.
    pub fn expected_frames(mut self, frames: u64) -> Self {
        self.expected_frames = Some(frames);
        self
    }
}

/// Result of one detection pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SceneScan {
    /// Strictly increasing comparison indices at which a cut was detected.
    pub boundaries: Vec<u64>,
    /// Number of frames successfully read from the stream.
    pub frames_read: u64,
    /// Decoder error that ended the pass early, if any.
    pub decode_error: Option<String>,
}

impl SceneScan {
    /// `true` when the stream produced no frame at all.
    pub fn read_failed(&self) -> bool {
        self.frames_read == 0
    }
}

/// Run a single detection pass over `frames`.
///
/// Never fails: an empty stream yields an empty scan whose
/// [`read_failed`](SceneScan::read_failed) is `true`, and a decode error
/// mid-stream ends the pass with the boundaries found so far and the error
/// recorded in [`SceneScan::decode_error`]. Callers decide whether either
/// condition should skip the video.
pub fn detect_scene_boundaries<I>(
    frames: I,
    options: &SceneDetectionOptions,
    reporter: &dyn Reporter,
) -> SceneScan
where
    I: IntoIterator<Item = FrameResult>,
{
    let mut frames = frames.into_iter();
    let mut scan = SceneScan::default();
    let mut tracker = ProgressTracker::new(reporter, options.expected_frames, options.progress_batch);

    log::debug!("Detecting scenes (threshold={})", options.threshold);

    let mut previous = match frames.next() {
        Some(Ok(frame)) => intensity(frame),
        Some(Err(error)) => {
            log::warn!("Failed to read first frame: {error}");
            scan.decode_error = Some(error.to_string());
            return scan;
        }
        None => return scan,
    };
    scan.frames_read = 1;
    tracker.advance();

    let mut comparison: u64 = 0;
    for item in frames {
        let current = match item {
            Ok(frame) => intensity(frame),
            Err(error) => {
                log::warn!(
                    "Decode error after {} frames, ending detection: {error}",
                    scan.frames_read
                );
                scan.decode_error = Some(error.to_string());
                break;
            }
        };
        scan.frames_read += 1;

        if changed_pixel_count(&previous, &current) > options.threshold {
            scan.boundaries.push(comparison);
        }

        previous = current;
        comparison += 1;
        tracker.advance();
    }
    tracker.finish();

    reporter.report(&Event::ScenesDetected {
        count: scan.boundaries.len(),
        frames: scan.frames_read,
    });
    scan
}

/// Reduce a frame to one 8-bit intensity channel. Grayscale frames pass
/// through without conversion.
fn intensity(frame: DynamicImage) -> GrayImage {
    match frame {
        DynamicImage::ImageLuma8(gray) => gray,
        other => other.to_luma8(),
    }
}

/// Number of pixels whose intensity differs between the two frames.
///
/// Frames of different dimensions count every pixel of `current` as changed.
pub(crate) fn changed_pixel_count(previous: &GrayImage, current: &GrayImage) -> u64 {
    if previous.dimensions() != current.dimensions() {
        return u64::from(current.width()) * u64::from(current.height());
    }
    previous
        .as_raw()
        .iter()
        .zip(current.as_raw())
        .filter(|(a, b)| a != b)
        .count() as u64
}
