//! Video decoder using FFmpeg via ffmpeg-sidecar.

use crate::source::{FrameSource, VideoOpener};
use chaser_core::{ChaserError, FrameBuffer, Result, SharedFrame};
use ffmpeg_sidecar::child::FfmpegChild;
use ffmpeg_sidecar::command::FfmpegCommand;
use ffmpeg_sidecar::event::{FfmpegEvent, LogLevel};
use ffmpeg_sidecar::iter::FfmpegIterator;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Progress through one ffmpeg event stream.
///
/// Errors ffmpeg logs mid-stream do not stop decoding. They are counted and
/// surfaced once as a [`ChaserError::Decoder`] after the last frame, so the
/// caller learns the file was damaged.
#[derive(Debug)]
struct StreamState {
    path: String,
    frames_decoded: u64,
    errors_seen: u64,
    last_error: Option<String>,
    finished: bool,
}

impl StreamState {
    fn new(path: String) -> Self {
        Self {
            path,
            frames_decoded: 0,
            errors_seen: 0,
            last_error: None,
            finished: false,
        }
    }

    fn next_frame<I>(&mut self, events: &mut I) -> Result<Option<SharedFrame>>
    where
        I: Iterator<Item = FfmpegEvent>,
    {
        if self.finished {
            return Ok(None);
        }

        for event in events.by_ref() {
            match event {
                FfmpegEvent::OutputFrame(frame) => {
                    let buffer = FrameBuffer::from_rgb(frame.width, frame.height, frame.data)?;
                    self.frames_decoded += 1;
                    return Ok(Some(Arc::new(buffer)));
                }
                FfmpegEvent::Error(msg)
                | FfmpegEvent::Log(LogLevel::Error | LogLevel::Fatal, msg) => {
                    self.errors_seen += 1;
                    warn!(path = %self.path, frame = self.frames_decoded, "ffmpeg: {}", msg);
                    self.last_error = Some(msg);
                }
                FfmpegEvent::Done => break,
                _ => {}
            }
        }

        self.finished = true;
        debug!(
            path = %self.path,
            frames = self.frames_decoded,
            errors = self.errors_seen,
            "End of video stream"
        );
        match self.last_error.take() {
            Some(last) => Err(ChaserError::Decoder(format!(
                "ffmpeg reported {} errors, last: {}",
                self.errors_seen, last
            ))),
            None => Ok(None),
        }
    }
}

/// Video decoder using FFmpeg.
///
/// Uses ffmpeg-sidecar to spawn FFmpeg as a subprocess that writes raw
/// `rgb24` frames to stdout. This approach works without system FFmpeg
/// development headers.
pub struct VideoDecoder {
    child: FfmpegChild,
    events: FfmpegIterator,
    stream: StreamState,
}

impl VideoDecoder {
    /// Open a video file for decoding.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path.to_string_lossy().to_string();

        if !path.is_file() {
            return Err(ChaserError::NotFound(format!("File not found: {}", path_str)));
        }

        info!("Opening video file: {}", path_str);

        let mut child = FfmpegCommand::new()
            .hide_banner()
            .input(&path_str)
            .rawvideo()
            .spawn()
            .map_err(|e| ChaserError::Decoder(format!("Failed to spawn ffmpeg: {e}")))?;

        let events = child
            .iter()
            .map_err(|e| ChaserError::Decoder(format!("Failed to read ffmpeg output: {e}")))?;

        Ok(Self {
            child,
            events,
            stream: StreamState::new(path_str),
        })
    }

    /// Get the file path.
    pub fn path(&self) -> &str {
        &self.stream.path
    }

    /// Number of frames decoded so far.
    pub fn frames_decoded(&self) -> u64 {
        self.stream.frames_decoded
    }

    /// Number of errors ffmpeg reported so far.
    pub fn errors_seen(&self) -> u64 {
        self.stream.errors_seen
    }
}

impl FrameSource for VideoDecoder {
    fn decode_frame(&mut self) -> Result<Option<SharedFrame>> {
        self.stream.next_frame(&mut self.events)
    }
}

impl Drop for VideoDecoder {
    fn drop(&mut self) {
        if !self.stream.finished {
            let _ = self.child.kill();
        }
        let _ = self.child.wait();
    }
}

/// [`VideoOpener`] backed by [`VideoDecoder`].
#[derive(Debug, Clone, Copy, Default)]
pub struct FfmpegOpener;

impl VideoOpener for FfmpegOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn FrameSource>> {
        Ok(Box::new(VideoDecoder::open(path)?))
    }
}
