//! Discovery of annotatable videos in a directory.

use chaser_core::{ChaserError, Result};
use std::path::{Path, PathBuf};

/// Container extensions accepted for annotation (lowercase, no dot).
pub const VIDEO_EXTENSIONS: &[&str] = &["h264", "mp4", "avi", "mkv", "mov"];

/// Whether `path` has one of the supported container extensions.
pub fn is_supported_video(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| {
            let e = e.to_ascii_lowercase();
            VIDEO_EXTENSIONS.contains(&e.as_str())
        })
        .unwrap_or(false)
}

/// List supported videos directly inside `dir`, sorted by file name.
///
/// Subdirectories (including the `save/` output folder) are not descended
/// into.
pub fn discover_videos(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        return Err(ChaserError::NotFound(format!(
            "Not a directory: {}",
            dir.display()
        )));
    }

    let mut videos = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && is_supported_video(&path) {
            videos.push(path);
        }
    }
    videos.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(videos)
}
