//! The engine: sole owner of frames and annotations.
//!
//! Every mutating operation returns whether visible state changed (the dirty
//! bit). The worker loop ORs those bits together and publishes once per tick.

use crate::config::EngineConfig;
use crate::frame_store::FrameStore;
use crate::protocol::{offer, Event, RenderFrame, Status};
use chaser_annotation::{
    AnnotationLedger, AnnotationRecord, Arity, MarkerCycler, MarkerKind, SaveFile, SaveStore,
};
use chaser_core::{ChaserError, Point, Result};
use chaser_media::VideoOpener;
use crossbeam_channel::Sender;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace};

/// State of a loaded video.
struct Session {
    frames: FrameStore,
    ledger: AnnotationLedger,
    cycler: MarkerCycler,
    current: usize,
}

/// Annotation state machine.
///
/// Idle until the first successful [`Engine::load`]; from then on always has
/// a video. A failed load leaves the current state untouched.
pub struct Engine {
    opener: Box<dyn VideoOpener>,
    config: EngineConfig,
    status: Sender<Status>,
    session: Option<Session>,
}

impl Engine {
    /// Create an idle engine decoding through `opener` and reporting on
    /// `status`.
    pub fn new(
        opener: Box<dyn VideoOpener>,
        config: EngineConfig,
        status: Sender<Status>,
    ) -> Self {
        Self {
            opener,
            config,
            status,
            session: None,
        }
    }

    fn notify(&self, status: Status) {
        offer(&self.status, status, "status");
    }

    /// Whether a video is loaded.
    pub fn is_active(&self) -> bool {
        self.session.is_some()
    }

    /// Index of the displayed frame.
    pub fn current_index(&self) -> Option<usize> {
        self.session.as_ref().map(|s| s.current)
    }

    /// Frames in the loaded video (0 when idle).
    pub fn frame_count(&self) -> usize {
        self.session.as_ref().map_or(0, |s| s.frames.frame_count())
    }

    /// Record of the displayed frame.
    pub fn current(&self) -> Option<&AnnotationRecord> {
        let s = self.session.as_ref()?;
        s.ledger.get(s.current)
    }

    /// The annotation ledger.
    pub fn ledger(&self) -> Option<&AnnotationLedger> {
        self.session.as_ref().map(|s| &s.ledger)
    }

    /// Path of the loaded video.
    pub fn video_path(&self) -> Option<&Path> {
        self.session.as_ref().map(|s| s.frames.path())
    }

    // ── Loading ────────────────────────────────────────────────

    /// Decode `path` and start a fresh session on it.
    ///
    /// On success the ledger holds a single seed record and the pointer is at
    /// frame 0. On failure the previous session (or idleness) is kept.
    pub fn load(&mut self, path: &Path) -> Result<bool> {
        info!(path = %path.display(), "Loading video");
        let status = self.status.clone();
        let frames = FrameStore::load(
            self.opener.as_ref(),
            path,
            self.config.progress_interval,
            |msg| offer(&status, Status::Progress(msg), "status"),
        )?;

        let first = frames
            .get(0)
            .cloned()
            .ok_or_else(|| ChaserError::EmptyVideo(path.display().to_string()))?;

        self.session = Some(Session {
            ledger: AnnotationLedger::new(first),
            cycler: MarkerCycler::new(),
            current: 0,
            frames,
        });
        self.announce_position();
        Ok(true)
    }

    // ── Navigation ─────────────────────────────────────────────

    fn announce_position(&self) {
        if let Some(s) = &self.session {
            let last = s.frames.frame_count() - 1;
            self.notify(Status::FramePosition(format!("{}/{}", s.current, last)));
        }
    }

    /// Move the pointer to `target`, which must be at most one past the last
    /// record. Creates the record by carry-forward when needed.
    fn seek(&mut self, target: usize) -> bool {
        let Some(s) = self.session.as_mut() else {
            return false;
        };
        if target == s.current {
            return false;
        }
        if let Some(image) = s.frames.get(target) {
            if s.ledger.ensure(target, image.clone()) {
                debug!(frame = target, "Created record by carry-forward");
            }
        }
        s.current = target;
        s.cycler.reset();
        self.announce_position();
        true
    }

    /// Step forward one frame, clamped at the last frame.
    pub fn advance(&mut self) -> bool {
        let Some(s) = self.session.as_ref() else {
            return false;
        };
        let target = (s.current + 1).min(s.frames.frame_count() - 1);
        self.seek(target)
    }

    /// Step back one frame, clamped at frame 0. Never creates records.
    pub fn retreat(&mut self) -> bool {
        let Some(s) = self.session.as_ref() else {
            return false;
        };
        let target = s.current.saturating_sub(1);
        self.seek(target)
    }

    // ── Markers ────────────────────────────────────────────────

    /// Place a marker on the current frame.
    ///
    /// Single-instance kinds are overwritten. Multi-instance kinds overwrite
    /// the slot the cycler picks, wrapped by the current slot count.
    pub fn update_marker(&mut self, kind: MarkerKind, point: Point) -> bool {
        let Some(s) = self.session.as_mut() else {
            return false;
        };
        let Some(record) = s.ledger.get_mut(s.current) else {
            return false;
        };
        match kind.arity() {
            Arity::Single => record.markers.set_single(kind, point),
            Arity::Multi => {
                let count = record.markers.count(kind);
                match s.cycler.next_slot(kind, count) {
                    Some(slot) => record.markers.set_slot(kind, slot, point),
                    None => false,
                }
            }
        }
    }

    /// Append a slot to a multi-instance marker on the current frame.
    pub fn add_slot(&mut self, kind: MarkerKind, point: Point) -> bool {
        self.current_record_mut()
            .map_or(false, |r| r.markers.push_slot(kind, point))
    }

    /// Drop the last slot of a multi-instance marker. No-op when empty.
    pub fn remove_slot(&mut self, kind: MarkerKind) -> bool {
        self.current_record_mut()
            .map_or(false, |r| r.markers.pop_slot(kind))
    }

    fn current_record_mut(&mut self) -> Option<&mut AnnotationRecord> {
        let s = self.session.as_mut()?;
        s.ledger.get_mut(s.current)
    }

    /// Apply one input event.
    pub fn handle_event(&mut self, event: Event) -> bool {
        match event {
            Event::Marker(kind, p) => self.update_marker(kind, p),
            Event::AddSlot(kind, p) => self.add_slot(kind, p),
            Event::RemoveSlot(kind) => self.remove_slot(kind),
            Event::NextFrame => self.advance(),
            Event::PrevFrame => self.retreat(),
            Event::Raw(raw) => {
                trace!(?raw, "Ignoring raw input");
                false
            }
        }
    }

    // ── Persistence ────────────────────────────────────────────

    /// Write the whole ledger as the next numbered save under `directory`.
    pub fn save(&self, directory: &Path) -> Result<PathBuf> {
        let s = self.session.as_ref().ok_or(ChaserError::NoVideoLoaded)?;
        let file = SaveFile::new(
            s.frames.path(),
            s.frames.frame_count(),
            s.ledger.records().to_vec(),
        );
        let store = SaveStore::new(directory, &self.config.save_dir_name);
        let path = store.save(&file)?;
        self.notify(Status::Notice("saved".into()));
        Ok(path)
    }

    // ── Publishing ─────────────────────────────────────────────

    /// Snapshot of the current record for the display.
    pub fn render_frame(&self) -> Option<RenderFrame> {
        let s = self.session.as_ref()?;
        Some(RenderFrame {
            record: s.ledger.get(s.current)?.clone(),
            frame_count: s.frames.frame_count(),
        })
    }

    /// `"Marked until <n> (idx)"` for the current ledger.
    pub fn marked_status(&self) -> Option<Status> {
        let ledger = self.ledger()?;
        Some(Status::Marked(format!(
            "Marked until {} (idx)",
            ledger.annotated_through()
        )))
    }
}
