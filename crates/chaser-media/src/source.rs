//! Frame source abstraction.
//!
//! The engine never talks to ffmpeg directly. It asks a [`VideoOpener`] for
//! a [`FrameSource`] and pulls frames until the source is exhausted, which
//! keeps decoding swappable for the synthetic source used in demos and tests.

use chaser_core::{ChaserError, FrameBuffer, Result, SharedFrame};
use std::path::Path;
use std::sync::Arc;

/// A stream of decoded frames.
pub trait FrameSource {
    /// Decode the next frame.
    ///
    /// `Ok(None)` marks the end of the stream. An `Err` means the stream broke
    /// mid-way; frames returned before it remain valid.
    fn decode_frame(&mut self) -> Result<Option<SharedFrame>>;
}

/// Opens video files as frame sources.
pub trait VideoOpener: Send {
    /// Open `path` for decoding.
    fn open(&self, path: &Path) -> Result<Box<dyn FrameSource>>;
}

/// Opener producing test-pattern frames without touching the filesystem.
///
/// Every frame is a colour-bar pattern with a per-index shade in the top-left
/// pixel so consecutive frames are distinguishable.
#[derive(Debug, Clone)]
pub struct SyntheticOpener {
    frame_count: usize,
    width: u32,
    height: u32,
    fail_after: Option<usize>,
}

impl SyntheticOpener {
    /// Create an opener yielding `frame_count` frames of `width` x `height`.
    pub fn new(frame_count: usize, width: u32, height: u32) -> Self {
        Self {
            frame_count,
            width,
            height,
            fail_after: None,
        }
    }

    /// Make every opened stream fail after `frames` frames, simulating
    /// corruption near the end of a file.
    pub fn failing_after(mut self, frames: usize) -> Self {
        self.fail_after = Some(frames);
        self
    }

    /// Number of frames each stream yields when not failing.
    pub fn frame_count(&self) -> usize {
        self.frame_count
    }
}

impl Default for SyntheticOpener {
    fn default() -> Self {
        Self::new(120, 320, 240)
    }
}

impl VideoOpener for SyntheticOpener {
    fn open(&self, _path: &Path) -> Result<Box<dyn FrameSource>> {
        Ok(Box::new(SyntheticSource {
            opener: self.clone(),
            next: 0,
        }))
    }
}

struct SyntheticSource {
    opener: SyntheticOpener,
    next: usize,
}

impl FrameSource for SyntheticSource {
    fn decode_frame(&mut self) -> Result<Option<SharedFrame>> {
        if self.opener.fail_after == Some(self.next) {
            return Err(ChaserError::Decoder(format!(
                "synthetic stream broken at frame {}",
                self.next
            )));
        }
        if self.next >= self.opener.frame_count {
            return Ok(None);
        }

        let frame = FrameBuffer::test_pattern(self.opener.width, self.opener.height)?;
        let mut data = frame.data().to_vec();
        data[0] = (self.next % 256) as u8;
        let frame = FrameBuffer::from_rgb(self.opener.width, self.opener.height, data)?;

        self.next += 1;
        Ok(Some(Arc::new(frame)))
    }
}
