//! Error types for the `reelcut` crate.
//!
//! This module defines [`ReelcutError`], the unified error type returned by
//! all fallible operations in the crate. Variants carry the context needed to
//! report a failure (paths, counts, upstream messages) without extra logging
//! at the call site.

use std::{io::Error as IoError, path::PathBuf};

use thiserror::Error;

/// The unified error type for all `reelcut` operations.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ReelcutError {
    /// The source video could not be opened.
    #[error("Failed to open video at {path}: {reason}")]
    FileOpen {
        /// Path that was passed to the opener.
        path: PathBuf,
        /// Underlying reason the open failed.
        reason: String,
    },

    /// The file does not contain a video stream.
    #[error("No video stream found in file")]
    NoVideoStream,

    /// A video frame could not be decoded.
    #[error("Failed to decode video frame: {0}")]
    VideoDecodeError(String),

    /// The frame rate is zero, negative, or not a number.
    #[error("Invalid frame rate: {0}")]
    InvalidFrameRate(f64),

    /// A range's start value is greater than or equal to its end value.
    #[error("Invalid range: start ({start}) must be less than end ({end})")]
    InvalidRange {
        /// The start of the range, in seconds.
        start: f64,
        /// The end of the range, in seconds.
        end: f64,
    },

    /// Options were rejected by `validate()`.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Fewer than two scene boundaries were detected, so no clip can be
    /// formed from a pair of them.
    #[error("Not enough scenes detected to create clips ({found} found, at least 2 required)")]
    InsufficientScenes {
        /// Number of boundaries that were found.
        found: usize,
    },

    /// The encoder failed to produce an output file.
    #[error("Failed to encode {output}: {reason}")]
    EncodeError {
        /// Output path that was being written.
        output: PathBuf,
        /// Encoder diagnostic (usually the tail of its stderr).
        reason: String,
    },

    /// An error originating from the FFmpeg libraries.
    #[error("FFmpeg error: {0}")]
    FfmpegError(String),

    /// An I/O error occurred while reading or writing files.
    #[error("I/O error: {0}")]
    IoError(#[from] IoError),
}

#[cfg(feature = "ffmpeg")]
impl From<ffmpeg_next::Error> for ReelcutError {
    fn from(error: ffmpeg_next::Error) -> Self {
        ReelcutError::FfmpegError(error.to_string())
    }
}
