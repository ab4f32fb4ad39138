//! Offline splitter that chops a recording into fixed-size clips.
//!
//! Frames come from any [`VideoOpener`]; each clip is encoded by piping raw
//! RGB frames into an `ffmpeg` process. Clips are named `0.mp4`, `1.mp4`, ...
//! and keep the source dimensions at a constant output frame rate.

use crate::discover::is_supported_video;
use crate::source::VideoOpener;
use chaser_core::{ChaserError, FrameBuffer, Result};
use serde::{Deserialize, Serialize};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdin, Command, Stdio};
use tracing::{info, warn};

/// Default output frame rate of split clips.
pub const DEFAULT_SPLIT_FPS: u32 = 10;

/// Default FFmpeg encoder (MPEG-4 Part 2, the `mp4v` fourcc).
pub const DEFAULT_SPLIT_CODEC: &str = "mpeg4";

/// Progress of a split run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SplitProgress {
    /// Frames written so far.
    pub frames_written: u64,
    /// Clips completed so far.
    pub chunks_written: usize,
}

/// A split job configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitJob {
    /// Source recording.
    pub input: PathBuf,
    /// Frames per output clip.
    pub frames_per_chunk: usize,
    /// Directory receiving the clips.
    pub output_dir: PathBuf,
    /// Constant output frame rate.
    pub fps: u32,
    /// FFmpeg encoder name.
    pub codec: String,
}

impl SplitJob {
    /// Create a new split job writing next to the current directory.
    pub fn new(input: impl Into<PathBuf>, frames_per_chunk: usize) -> Self {
        Self {
            input: input.into(),
            frames_per_chunk,
            output_dir: PathBuf::from("."),
            fps: DEFAULT_SPLIT_FPS,
            codec: DEFAULT_SPLIT_CODEC.to_string(),
        }
    }

    /// Set the output directory.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Set the output frame rate.
    pub fn with_fps(mut self, fps: u32) -> Self {
        self.fps = fps;
        self
    }

    fn validate(&self) -> Result<()> {
        if !is_supported_video(&self.input) {
            return Err(ChaserError::UnsupportedFormat(self.input.display().to_string()));
        }
        if self.frames_per_chunk == 0 {
            return Err(ChaserError::InvalidParameter(
                "frames per chunk must be at least 1".into(),
            ));
        }
        if self.fps == 0 {
            return Err(ChaserError::InvalidParameter(
                "output frame rate must be at least 1".into(),
            ));
        }
        Ok(())
    }

    /// Clip index receiving the zero-based `frame_number`.
    pub fn chunk_index(&self, frame_number: u64) -> usize {
        (frame_number / self.frames_per_chunk.max(1) as u64) as usize
    }

    /// Output path of clip `index`.
    pub fn chunk_path(&self, index: usize) -> PathBuf {
        self.output_dir.join(format!("{}.mp4", index))
    }

    /// Build the FFmpeg command arguments for one clip.
    pub fn encoder_args(&self, width: u32, height: u32, output: &Path) -> Vec<String> {
        vec![
            "-y".into(),
            "-hide_banner".into(),
            "-loglevel".into(),
            "error".into(),
            // Input from pipe (raw frames)
            "-f".into(),
            "rawvideo".into(),
            "-pixel_format".into(),
            "rgb24".into(),
            "-video_size".into(),
            format!("{}x{}", width, height),
            "-framerate".into(),
            self.fps.to_string(),
            "-i".into(),
            "pipe:0".into(),
            "-c:v".into(),
            self.codec.clone(),
            "-pix_fmt".into(),
            "yuv420p".into(),
            output.to_string_lossy().into_owned(),
        ]
    }

    /// Run the split.
    ///
    /// Returns the number of clips written. A decode failure part-way through
    /// ends the run early; clips completed before it are kept.
    pub fn run(
        &self,
        opener: &dyn VideoOpener,
        mut on_progress: impl FnMut(SplitProgress),
    ) -> Result<usize> {
        self.validate()?;
        std::fs::create_dir_all(&self.output_dir)?;

        let mut source = opener.open(&self.input)?;
        let mut writer: Option<ChunkWriter> = None;
        let mut dimensions: Option<(u32, u32)> = None;
        let mut frames_written: u64 = 0;
        let mut chunks_written = 0usize;

        loop {
            let frame = match source.decode_frame() {
                Ok(Some(frame)) => frame,
                Ok(None) => break,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(frames = frames_written, "Decode stopped early: {}", e);
                    break;
                }
            };

            match dimensions {
                Some((w, h)) => frame.ensure_dimensions(w, h)?,
                None => dimensions = Some(frame.dimensions()),
            }

            if writer.is_none() {
                let index = self.chunk_index(frames_written);
                writer = Some(ChunkWriter::spawn(self, &frame, self.chunk_path(index))?);
            }
            if let Some(w) = writer.as_mut() {
                w.write_frame(&frame)?;
            }
            frames_written += 1;

            if frames_written % self.frames_per_chunk as u64 == 0 {
                if let Some(w) = writer.take() {
                    w.finish()?;
                    chunks_written += 1;
                }
                on_progress(SplitProgress {
                    frames_written,
                    chunks_written,
                });
            }
        }

        if let Some(w) = writer.take() {
            w.finish()?;
            chunks_written += 1;
            on_progress(SplitProgress {
                frames_written,
                chunks_written,
            });
        }

        info!(
            input = %self.input.display(),
            frames = frames_written,
            chunks = chunks_written,
            "Split complete"
        );
        Ok(chunks_written)
    }
}

/// One running encoder process.
///
/// Dropped without [`ChunkWriter::finish`], the process is killed and reaped.
struct ChunkWriter {
    child: Child,
    stdin: Option<ChildStdin>,
    path: PathBuf,
    finished: bool,
}

impl ChunkWriter {
    fn spawn(job: &SplitJob, first: &FrameBuffer, path: PathBuf) -> Result<Self> {
        let (width, height) = first.dimensions();
        // Same binary the decoder side resolves through ffmpeg-sidecar
        let mut command = Command::new(ffmpeg_sidecar::paths::ffmpeg_path());
        command.args(job.encoder_args(width, height, &path));
        Self::start(command, path)
    }

    fn start(mut command: Command, path: PathBuf) -> Result<Self> {
        let mut child = command
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| ChaserError::Encoder(format!("Failed to spawn ffmpeg: {e}")))?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| ChaserError::Encoder("Failed to open ffmpeg stdin".into()))?;

        Ok(Self {
            child,
            stdin: Some(stdin),
            path,
            finished: false,
        })
    }

    fn write_frame(&mut self, frame: &FrameBuffer) -> Result<()> {
        let stdin = self
            .stdin
            .as_mut()
            .ok_or_else(|| ChaserError::Encoder("Encoder stdin already closed".into()))?;
        stdin
            .write_all(frame.data())
            .map_err(|e| ChaserError::Encoder(format!("Failed to write frame: {e}")))
    }

    fn finish(mut self) -> Result<()> {
        // Close stdin to signal end-of-stream
        drop(self.stdin.take());

        let status = self
            .child
            .wait()
            .map_err(|e| ChaserError::Encoder(format!("Failed to wait for ffmpeg: {e}")))?;
        self.finished = true;

        if !status.success() {
            return Err(ChaserError::Encoder(format!(
                "ffmpeg exited with status {} while writing {}",
                status,
                self.path.display()
            )));
        }
        Ok(())
    }
}

impl Drop for ChunkWriter {
    fn drop(&mut self) {
        if self.finished {
            return;
        }
        drop(self.stdin.take());
        if let Err(e) = self.child.kill() {
            warn!(path = %self.path.display(), "Failed to stop encoder: {}", e);
        }
        let _ = self.child.wait();
    }
}
