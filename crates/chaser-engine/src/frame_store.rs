//! Decoded frames of the loaded video.

use chaser_core::{ChaserError, Result, SharedFrame};
use chaser_media::VideoOpener;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Every frame of one video, randomly indexable.
///
/// Immutable once built. A reload builds a new store and replaces the old
/// one only after decoding succeeded.
#[derive(Debug, Clone)]
pub struct FrameStore {
    path: PathBuf,
    frames: Vec<SharedFrame>,
    truncated: bool,
}

impl FrameStore {
    /// Decode `path` into memory.
    ///
    /// `on_progress` receives a loading notice every `progress_interval`
    /// frames. If decoding breaks part-way the frames decoded so far are
    /// kept and a final notice reports the failure. Fails when nothing could
    /// be decoded, or with a fatal [`ChaserError::ShapeMismatch`] when frame
    /// dimensions change mid-stream.
    pub fn load(
        opener: &dyn VideoOpener,
        path: &Path,
        progress_interval: usize,
        mut on_progress: impl FnMut(String),
    ) -> Result<Self> {
        let interval = progress_interval.max(1);
        let mut source = opener.open(path)?;
        let mut frames: Vec<SharedFrame> = Vec::new();
        let mut truncated = false;

        loop {
            match source.decode_frame() {
                Ok(Some(frame)) => {
                    if let Some(first) = frames.first() {
                        let (w, h) = first.dimensions();
                        frame.ensure_dimensions(w, h)?;
                    }
                    if frames.len() % interval == 0 {
                        on_progress(format!("loading : {}frames loaded", frames.len()));
                    }
                    frames.push(frame);
                }
                Ok(None) => break,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    warn!(
                        path = %path.display(),
                        frames = frames.len(),
                        "Decode failed mid-stream, keeping decoded frames: {}",
                        e
                    );
                    on_progress(format!(
                        "loading : stopped after {}frames ({})",
                        frames.len(),
                        e
                    ));
                    truncated = true;
                    break;
                }
            }
        }

        if frames.is_empty() {
            return Err(ChaserError::EmptyVideo(path.display().to_string()));
        }

        info!(
            path = %path.display(),
            frames = frames.len(),
            bytes = frames.iter().map(|f| f.memory_size()).sum::<usize>(),
            width = frames[0].width(),
            height = frames[0].height(),
            truncated,
            "Video loaded"
        );

        Ok(Self {
            path: path.to_path_buf(),
            frames,
            truncated,
        })
    }

    /// Source video path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of frames.
    pub fn frame_count(&self) -> usize {
        self.frames.len()
    }

    /// Frame at `index`.
    pub fn get(&self, index: usize) -> Option<&SharedFrame> {
        self.frames.get(index)
    }

    /// Frame dimensions shared by every frame.
    pub fn dimensions(&self) -> (u32, u32) {
        self.frames[0].dimensions()
    }

    /// Whether decoding stopped early because of a stream error.
    pub fn is_truncated(&self) -> bool {
        self.truncated
    }
}
