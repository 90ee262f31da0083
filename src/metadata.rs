//! Source video metadata.
//!
//! [`VideoMetadata`] is read once when a source is opened and handed to the
//! segmenter (duration) and the clip sampler (frame rate). In-memory sources
//! build it directly with [`VideoMetadata::new`].

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::time::Duration;

use serde_json::{Value, json};

/// Global properties of a source video.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct VideoMetadata {
    /// Total duration of the container.
    pub duration: Duration,
    /// Frames per second (approximate for variable-frame-rate content).
    pub frames_per_second: f64,
    /// Frame width in pixels.
    pub width: u32,
    /// Frame height in pixels.
    pub height: u32,
    /// Estimated total number of frames, computed from duration and frame rate.
    pub frame_count: u64,
    /// Codec name (e.g. `"h264"`, `"vp9"`), or `"unknown"`.
    pub codec: String,
}

impl VideoMetadata {
    /// Build metadata for a source with the given duration, frame rate and
    /// dimensions. The frame count is derived from the first two.
    pub fn new(duration: Duration, frames_per_second: f64, width: u32, height: u32) -> Self {
        let frame_count = if frames_per_second > 0.0 {
            (duration.as_secs_f64() * frames_per_second) as u64
        } else {
            0
        };
        Self {
            duration,
            frames_per_second,
            width,
            height,
            frame_count,
            codec: "unknown".to_string(),
        }
    }

    /// Set the codec name.
    pub fn with_codec(mut self, codec: impl Into<String>) -> Self {
        self.codec = codec.into();
        self
    }

    /// Duration in fractional seconds.
    pub fn duration_seconds(&self) -> f64 {
        self.duration.as_secs_f64()
    }

    /// Machine-readable form used by `reelcut probe --json`.
    pub fn to_json(&self) -> Value {
        json!({
            "duration_seconds": self.duration_seconds(),
            "fps": self.frames_per_second,
            "width": self.width,
            "height": self.height,
            "frame_count": self.frame_count,
            "codec": self.codec,
        })
    }
}

impl Display for VideoMetadata {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(
            f,
            "Duration: {:.2} seconds, Resolution: {}x{}, FPS: {:.2} [{}]",
            self.duration_seconds(),
            self.width,
            self.height,
            self.frames_per_second,
            self.codec,
        )
    }
}
