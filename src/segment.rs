//! Fixed-interval segmentation.
//!
//! Splits a source's total duration into consecutive windows of at most
//! [`SegmentOptions::max_segment_length`] seconds. The windows tile
//! `[0, duration)` exactly: each window ends where the next one starts and
//! the last one ends at the total duration. Planning is deterministic.
//!
//! # Example
//!
//! ```
//! use std::path::Path;
//!
//! use reelcut::{SegmentOptions, SilentReporter, plan_segments};
//!
//! let segments = plan_segments(
//!     Path::new("talk.mp4"),
//!     1500.0,
//!     &SegmentOptions::new(),
//!     &SilentReporter,
//! )?;
//! let bounds: Vec<(f64, f64)> = segments.iter().map(|s| (s.start(), s.end())).collect();
//! assert_eq!(bounds, vec![(0.0, 600.0), (600.0, 1200.0), (1200.0, 1500.0)]);
//! assert_eq!(segments[2].output_name, "talk_part_2.mp4");
//! # Ok::<(), reelcut::ReelcutError>(())
//! ```

use std::path::{Path, PathBuf};

use crate::error::ReelcutError;
use crate::naming::segment_file_name;
use crate::range::TimeRange;
use crate::report::{Event, Reporter};

/// Default maximum segment length in seconds.
pub const DEFAULT_MAX_SEGMENT_SECONDS: f64 = 600.0;

/// Segmenter settings.
#[derive(Debug, Clone)]
pub struct SegmentOptions {
    /// Longest allowed window, in seconds. Default: 600.
    pub max_segment_length: f64,
}

impl Default for SegmentOptions {
    fn default() -> Self {
        Self {
            max_segment_length: DEFAULT_MAX_SEGMENT_SECONDS,
        }
    }
}

impl SegmentOptions {
    /// Create segmenter settings with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum segment length in seconds.
    pub fn max_segment_length(mut self, seconds: f64) -> Self {
        self.max_segment_length = seconds;
        self
    }

    /// Check that the maximum length is positive and finite.
    ///
    /// # Errors
    ///
    /// Returns [`ReelcutError::InvalidConfiguration`] otherwise.
    pub fn validate(&self) -> Result<(), ReelcutError> {
        if !(self.max_segment_length > 0.0) || !self.max_segment_length.is_finite() {
            return Err(ReelcutError::InvalidConfiguration(format!(
                "maximum segment length must be a positive number of seconds, got {}",
                self.max_segment_length
            )));
        }
        Ok(())
    }
}

/// One planned window of the fixed-interval split.
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentDescriptor {
    /// Source video.
    pub source: PathBuf,
    /// Window covered by this segment.
    pub range: TimeRange,
    /// Zero-based position of the segment.
    pub ordinal: usize,
    /// `<base>_part_<ordinal>.mp4`.
    pub output_name: String,
}

impl SegmentDescriptor {
    /// Window start in seconds.
    pub fn start(&self) -> f64 {
        self.range.start()
    }

    /// Window end in seconds.
    pub fn end(&self) -> f64 {
        self.range.end()
    }
}

/// Plan the fixed-interval split of a source of `total_duration` seconds.
///
/// A non-positive (or NaN) duration produces no segments; the degenerate
/// window is reported as [`Event::SegmentSkipped`] and planning stops for
/// this source.
///
/// # Errors
///
/// Returns [`ReelcutError::InvalidConfiguration`] if `options` is invalid.
pub fn plan_segments(
    source: &Path,
    total_duration: f64,
    options: &SegmentOptions,
    reporter: &dyn Reporter,
) -> Result<Vec<SegmentDescriptor>, ReelcutError> {
    options.validate()?;
    let max_length = options.max_segment_length;

    if !(total_duration > 0.0) {
        reporter.report(&Event::SegmentSkipped {
            start: 0.0,
            end: total_duration,
        });
        return Ok(Vec::new());
    }

    let mut segments = Vec::new();
    let mut ordinal: usize = 0;
    loop {
        // Both ends are computed from the ordinal so that one window's end is
        // bit-identical to the next window's start.
        let start = ordinal as f64 * max_length;
        if start >= total_duration {
            break;
        }
        let end = ((ordinal + 1) as f64 * max_length).min(total_duration);

        let Ok(range) = TimeRange::new(start, end) else {
            reporter.report(&Event::SegmentSkipped { start, end });
            break;
        };

        segments.push(SegmentDescriptor {
            source: source.to_path_buf(),
            range,
            ordinal,
            output_name: segment_file_name(source, ordinal),
        });
        ordinal += 1;
    }

    log::debug!(
        "Planned {} segments for {} ({total_duration:.2}s, max {max_length}s)",
        segments.len(),
        source.display()
    );
    Ok(segments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::report::{MemoryReporter, SilentReporter};

    fn bounds(segments: &[SegmentDescriptor]) -> Vec<(f64, f64)> {
        segments.iter().map(|s| (s.start(), s.end())).collect()
    }

    #[test]
    fn shorter_than_one_window() {
        let segments =
            plan_segments(Path::new("a.mp4"), 42.5, &SegmentOptions::new(), &SilentReporter)
                .unwrap();
        assert_eq!(bounds(&segments), vec![(0.0, 42.5)]);
    }

    #[test]
    fn exact_multiple_has_no_empty_tail() {
        let options = SegmentOptions::new().max_segment_length(300.0);
        let segments = plan_segments(Path::new("a.mp4"), 900.0, &options, &SilentReporter).unwrap();
        assert_eq!(
            bounds(&segments),
            vec![(0.0, 300.0), (300.0, 600.0), (600.0, 900.0)]
        );
    }

    #[test]
    fn ordinals_and_names_are_sequential() {
        let options = SegmentOptions::new().max_segment_length(10.0);
        let segments = plan_segments(Path::new("dir/show.webm"), 25.0, &options, &SilentReporter)
            .unwrap();
        let names: Vec<&str> = segments.iter().map(|s| s.output_name.as_str()).collect();
        assert_eq!(names, vec!["show_part_0.mp4", "show_part_1.mp4", "show_part_2.mp4"]);
        assert_eq!(segments[1].ordinal, 1);
    }

    #[test]
    fn degenerate_duration_is_skipped_and_reported() {
        let reporter = MemoryReporter::new();
        let segments =
            plan_segments(Path::new("a.mp4"), 0.0, &SegmentOptions::new(), &reporter).unwrap();
        assert!(segments.is_empty());
        assert_eq!(
            reporter.events(),
            vec![Event::SegmentSkipped {
                start: 0.0,
                end: 0.0
            }]
        );
    }

    #[test]
    fn invalid_max_length_is_rejected() {
        for bad in [0.0, -5.0, f64::NAN, f64::INFINITY] {
            let options = SegmentOptions::new().max_segment_length(bad);
            let result = plan_segments(Path::new("a.mp4"), 100.0, &options, &SilentReporter);
            assert!(matches!(result, Err(ReelcutError::InvalidConfiguration(_))));
        }
    }
}
