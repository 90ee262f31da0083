//! Frame sources.
//!
//! A [`FrameSource`] is anything that can report [`VideoMetadata`] and hand
//! out a sequential stream of decoded frames. The scene detector only ever
//! sees the stream as an iterator of [`FrameResult`]s, so it runs the same way
//! against FFmpeg-decoded files ([`MediaFile`](crate::MediaFile), feature
//! `ffmpeg`) and against synthetic frames held in memory
//! ([`MemoryFrameSource`]).

use image::DynamicImage;

use crate::error::ReelcutError;
use crate::metadata::VideoMetadata;

/// One item of a frame stream.
pub type FrameResult = Result<DynamicImage, ReelcutError>;

/// A boxed, borrowed frame stream.
pub type FrameStream<'a> = Box<dyn Iterator<Item = FrameResult> + 'a>;

/// A decodable video: global metadata plus a sequential frame stream.
///
/// Dropping the source releases whatever decoding context backs it.
pub trait FrameSource {
    /// Metadata read when the source was opened.
    fn metadata(&self) -> &VideoMetadata;

    /// Start a pass over the frames from the beginning of the stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the decoder for the stream cannot be created.
    fn frames(&mut self) -> Result<FrameStream<'_>, ReelcutError>;
}

/// A frame source backed by frames already in memory.
#[derive(Debug, Clone)]
pub struct MemoryFrameSource {
    metadata: VideoMetadata,
    frames: Vec<DynamicImage>,
}

impl MemoryFrameSource {
    /// Wrap `frames` with the given metadata.
    pub fn new(metadata: VideoMetadata, frames: Vec<DynamicImage>) -> Self {
        Self { metadata, frames }
    }

    /// Number of frames held.
    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Whether no frames are held.
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl FrameSource for MemoryFrameSource {
    fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }

    fn frames(&mut self) -> Result<FrameStream<'_>, ReelcutError> {
        Ok(Box::new(self.frames.iter().cloned().map(Ok)))
    }
}
