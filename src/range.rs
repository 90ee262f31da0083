//! Time ranges in seconds.

use std::fmt::{Display, Formatter, Result as FmtResult};

use crate::error::ReelcutError;

/// A half-open span `[start, end)` of a source video, in seconds.
///
/// Construction through [`TimeRange::new`] guarantees `start < end` and that
/// both ends are finite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeRange {
    start: f64,
    end: f64,
}

impl TimeRange {
    /// Create a range, rejecting empty, reversed, or non-finite spans.
    ///
    /// # Errors
    ///
    /// Returns [`ReelcutError::InvalidRange`] unless `start < end`.
    pub fn new(start: f64, end: f64) -> Result<Self, ReelcutError> {
        if !start.is_finite() || !end.is_finite() || start >= end {
            return Err(ReelcutError::InvalidRange { start, end });
        }
        Ok(Self { start, end })
    }

    /// Convert a pair of frame indices to seconds at `frames_per_second`.
    ///
    /// # Errors
    ///
    /// Returns [`ReelcutError::InvalidFrameRate`] for a non-positive rate and
    /// [`ReelcutError::InvalidRange`] unless `start_frame < end_frame`.
    pub fn from_frames(
        start_frame: u64,
        end_frame: u64,
        frames_per_second: f64,
    ) -> Result<Self, ReelcutError> {
        if !(frames_per_second > 0.0) || !frames_per_second.is_finite() {
            return Err(ReelcutError::InvalidFrameRate(frames_per_second));
        }
        Self::new(
            start_frame as f64 / frames_per_second,
            end_frame as f64 / frames_per_second,
        )
    }

    /// Start of the range in seconds.
    pub fn start(&self) -> f64 {
        self.start
    }

    /// End of the range in seconds.
    pub fn end(&self) -> f64 {
        self.end
    }

    /// Length of the range in seconds. Always positive.
    pub fn duration(&self) -> f64 {
        self.end - self.start
    }

    /// Whether the two ranges share any instant. Ranges that only touch
    /// (`a.end == b.start`) do not overlap.
    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.start < other.end && other.start < self.end
    }

    /// Bit patterns of both ends; equal keys mean bit-for-bit identical ranges.
    pub(crate) fn key(&self) -> (u64, u64) {
        (self.start.to_bits(), self.end.to_bits())
    }
}

impl Display for TimeRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{:.2}s..{:.2}s", self.start, self.end)
    }
}
