//! Save files with versioning, and the numbered save folder.
//!
//! Layout:
//! ```text
//! <video dir>/
//!   save/
//!     0.json    # first save
//!     1.json    # second save, full ledger again
//! ```
//!
//! Every save writes the whole ledger into a new file. The file number is the
//! count of entries already in the folder, so renaming or deleting files by
//! hand changes the next number.

use crate::record::AnnotationRecord;
use chaser_core::{ChaserError, Result};
use serde::{Deserialize, Serialize};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

/// Current schema version.
pub const CURRENT_VERSION: u32 = 1;

/// Extension of save files.
pub const SAVE_EXTENSION: &str = "json";

/// Versioned save file wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveFile {
    /// Schema version for migration.
    pub version: u32,
    /// Application version that wrote this file.
    pub app_version: String,
    /// Video the records were taken from.
    pub video: PathBuf,
    /// Frames in the video (records may cover fewer).
    pub frame_count: usize,
    /// One record per visited frame, in frame order.
    pub records: Vec<AnnotationRecord>,
}

impl SaveFile {
    /// Create a new save file from a ledger snapshot.
    pub fn new(
        video: impl Into<PathBuf>,
        frame_count: usize,
        records: Vec<AnnotationRecord>,
    ) -> Self {
        Self {
            version: CURRENT_VERSION,
            app_version: env!("CARGO_PKG_VERSION").to_string(),
            video: video.into(),
            frame_count,
            records,
        }
    }

    /// Stream the JSON form into `writer`.
    pub fn write_to<W: Write>(&self, writer: W) -> Result<()> {
        serde_json::to_writer(writer, self)
            .map_err(|e| ChaserError::Serialization(format!("Failed to serialize save: {}", e)))
    }

    /// Deserialize from JSON bytes, applying migrations if needed.
    pub fn from_json(data: &[u8]) -> Result<Self> {
        let raw: serde_json::Value = serde_json::from_slice(data)
            .map_err(|e| ChaserError::Serialization(format!("Invalid JSON: {}", e)))?;

        let version = raw.get("version").and_then(|v| v.as_u64()).unwrap_or(0) as u32;

        if version > CURRENT_VERSION {
            return Err(ChaserError::Serialization(format!(
                "Save file version {} is newer than supported version {}",
                version, CURRENT_VERSION
            )));
        }

        let migrated = migrate(raw, version)?;

        serde_json::from_value(migrated)
            .map_err(|e| ChaserError::Serialization(format!("Failed to parse save: {}", e)))
    }

    /// Load a save file from disk.
    pub fn load_from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        Self::from_json(&data)
    }
}

/// Apply sequential migrations from `from_version` to CURRENT_VERSION.
fn migrate(mut data: serde_json::Value, from_version: u32) -> Result<serde_json::Value> {
    let mut version = from_version;

    while version < CURRENT_VERSION {
        match version {
            0 => {
                // v0 → v1: bare record list without a wrapper
                if data.is_array() {
                    let frame_count = data.as_array().map_or(0, |a| a.len());
                    data = serde_json::json!({
                        "version": 1,
                        "app_version": "0.0.0",
                        "video": "",
                        "frame_count": frame_count,
                        "records": data,
                    });
                }
                version = 1;
            }
            _ => {
                return Err(ChaserError::Serialization(format!(
                    "No migration path from version {}",
                    version
                )));
            }
        }
    }

    Ok(data)
}

/// Numbered save folder next to a video.
#[derive(Debug, Clone)]
pub struct SaveStore {
    save_dir: PathBuf,
}

impl SaveStore {
    /// Save store for videos in `video_dir`, writing into `video_dir/dir_name`.
    pub fn new(video_dir: &Path, dir_name: &str) -> Self {
        Self {
            save_dir: video_dir.join(dir_name),
        }
    }

    /// The save folder.
    pub fn dir(&self) -> &Path {
        &self.save_dir
    }

    /// Ensure the save folder exists.
    pub fn ensure_dir(&self) -> Result<()> {
        std::fs::create_dir_all(&self.save_dir)?;
        Ok(())
    }

    /// Path the next save will be written to.
    pub fn next_path(&self) -> Result<PathBuf> {
        let count = if self.save_dir.exists() {
            std::fs::read_dir(&self.save_dir)?.count()
        } else {
            0
        };
        Ok(self.save_dir.join(format!("{}.{}", count, SAVE_EXTENSION)))
    }

    /// Write `file` as the next numbered save and return its path.
    ///
    /// The data goes to a temporary file in the save folder first and is
    /// renamed into place once fully written, so a failed save never leaves
    /// a truncated file under a numbered name. An existing file with the
    /// computed name is never overwritten.
    pub fn save(&self, file: &SaveFile) -> Result<PathBuf> {
        self.ensure_dir()?;
        let path = self.next_path()?;

        let mut tmp = tempfile::Builder::new()
            .prefix(".saving-")
            .tempfile_in(&self.save_dir)?;
        let mut writer = BufWriter::new(tmp.as_file_mut());
        file.write_to(&mut writer)?;
        writer.flush()?;
        drop(writer);
        tmp.as_file().sync_all()?;
        tmp.persist_noclobber(&path).map_err(|e| ChaserError::Io(e.error))?;

        info!(path = %path.display(), records = file.records.len(), "Annotations saved");
        Ok(path)
    }

    /// Numbered saves in the folder, ordered by number.
    pub fn list(&self) -> Result<Vec<PathBuf>> {
        if !self.save_dir.exists() {
            return Ok(Vec::new());
        }
        let mut numbered = Vec::new();
        for entry in std::fs::read_dir(&self.save_dir)? {
            let path = entry?.path();
            let number = path
                .file_stem()
                .and_then(|s| s.to_str())
                .and_then(|s| s.parse::<u64>().ok());
            if let Some(n) = number {
                numbered.push((n, path));
            }
        }
        numbered.sort_by_key(|(n, _)| *n);
        Ok(numbered.into_iter().map(|(_, p)| p).collect())
    }
}
