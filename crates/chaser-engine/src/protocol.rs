//! Messages exchanged between the engine and its peer workers.
//!
//! Every payload is an owned value. Frames travel as `Arc<FrameBuffer>`, which
//! is immutable, so no peer can change state the engine owns.

use chaser_annotation::{AnnotationRecord, MarkerKind};
use chaser_core::Point;
use crossbeam_channel::{Sender, TrySendError};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing::{debug, trace};

/// Control-panel → engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Decode a video and start a fresh annotation session on it.
    LoadVideo(PathBuf),
    /// Write the ledger into `<dir>/save/<n>.json`.
    Save(PathBuf),
    /// Stop the engine after the current tick.
    Terminate,
}

/// Display/input → engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    /// Place a marker. Multi-instance kinds move the next slot in rotation.
    Marker(MarkerKind, Point),
    /// Append a slot to a multi-instance marker.
    AddSlot(MarkerKind, Point),
    /// Drop the last slot of a multi-instance marker.
    RemoveSlot(MarkerKind),
    NextFrame,
    PrevFrame,
    /// Input the engine has no use for. Consumed and discarded.
    Raw(RawInput),
}

/// Untranslated input from the display worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawInput {
    MouseDown(Point),
    MouseDownRight(Point),
    MouseUp(Point),
    MousePos(Point),
    Key(u32),
}

/// Engine → control-panel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Status {
    /// `"<index>/<last index>"` after every frame change.
    FramePosition(String),
    /// Loading progress.
    Progress(String),
    /// `"Marked until <n> (idx)"` after every dirty tick.
    Marked(String),
    /// Modal-style notice, e.g. `"saved"` or a load failure.
    Notice(String),
}

impl Status {
    /// The message text.
    pub fn text(&self) -> &str {
        match self {
            Self::FramePosition(s) | Self::Progress(s) | Self::Marked(s) | Self::Notice(s) => s,
        }
    }
}

/// Engine → display: what to draw.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderFrame {
    /// Current record (image and every marker position).
    pub record: AnnotationRecord,
    /// Frames in the loaded video.
    pub frame_count: usize,
}

/// Queue a message without blocking. A full queue drops the message; a
/// disconnected peer is ignored.
pub(crate) fn offer<T>(tx: &Sender<T>, msg: T, queue: &'static str) {
    match tx.try_send(msg) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => debug!(queue, "Output queue full, dropping message"),
        Err(TrySendError::Disconnected(_)) => trace!(queue, "Peer disconnected"),
    }
}

/// Key codes as sent by the input worker: ASCII key numbers + 1000, mouse
/// events in the 400 range.
pub mod keys {
    /// Offset added to ASCII key numbers.
    pub const KEY_OFFSET: u32 = 1000;

    /// Code for an ASCII key.
    pub const fn code(c: char) -> u32 {
        KEY_OFFSET + c as u32
    }

    pub const K_1: u32 = code('1');
    pub const K_2: u32 = code('2');
    pub const K_B: u32 = code('b');
    pub const K_D: u32 = code('d');
    pub const K_E: u32 = code('e');
    pub const K_F: u32 = code('f');
    pub const K_H: u32 = code('h');
    pub const K_I: u32 = code('i');
    pub const K_L: u32 = code('l');
    pub const K_R: u32 = code('r');
    pub const K_W: u32 = code('w');
    pub const K_Z: u32 = code('z');
    pub const K_ENTER: u32 = KEY_OFFSET + 13;

    pub const MOUSEDOWN: u32 = 401;
    pub const MOUSEUP: u32 = 402;
    pub const MOUSEPOS: u32 = 403;
    pub const MOUSEDOWN_RIGHT: u32 = 404;
}

/// What a bound key does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binding {
    Marker(MarkerKind),
    AddSlot(MarkerKind),
    RemoveSlot(MarkerKind),
    NextFrame,
    PrevFrame,
}

/// Translates raw key codes into engine events.
///
/// The input worker does not know which keys matter; it forwards every code
/// with the cursor position and the key map decides.
#[derive(Debug, Clone)]
pub struct KeyMap {
    bindings: HashMap<u32, Binding>,
}

impl Default for KeyMap {
    fn default() -> Self {
        use keys::*;
        let bindings = HashMap::from([
            (K_F, Binding::Marker(MarkerKind::Food)),
            (K_E, Binding::Marker(MarkerKind::Ear)),
            (K_R, Binding::Marker(MarkerKind::Nose)),
            (K_D, Binding::Marker(MarkerKind::Tail)),
            (K_H, Binding::Marker(MarkerKind::Head)),
            (K_W, Binding::Marker(MarkerKind::Water)),
            (K_B, Binding::Marker(MarkerKind::Block)),
            (K_I, Binding::AddSlot(MarkerKind::Food)),
            (K_L, Binding::RemoveSlot(MarkerKind::Food)),
            (K_1, Binding::PrevFrame),
            (K_2, Binding::NextFrame),
        ]);
        Self { bindings }
    }
}

impl KeyMap {
    /// Binding for `code`.
    pub fn binding(&self, code: u32) -> Option<Binding> {
        self.bindings.get(&code).copied()
    }

    /// Translate a key press at `position`.
    ///
    /// Unbound codes, and positional bindings pressed without a cursor
    /// position, come back as [`Event::Raw`].
    pub fn translate(&self, code: u32, position: Option<Point>) -> Event {
        let raw = Event::Raw(RawInput::Key(code));
        match (self.binding(code), position) {
            (Some(Binding::Marker(kind)), Some(p)) => Event::Marker(kind, p),
            (Some(Binding::AddSlot(kind)), Some(p)) => Event::AddSlot(kind, p),
            (Some(Binding::RemoveSlot(kind)), _) => Event::RemoveSlot(kind),
            (Some(Binding::NextFrame), _) => Event::NextFrame,
            (Some(Binding::PrevFrame), _) => Event::PrevFrame,
            _ => raw,
        }
    }

    /// Translate a mouse event tag. Mouse input never maps to an engine
    /// action; unknown tags are treated as key codes.
    pub fn translate_mouse(&self, tag: u32, position: Point) -> Event {
        match tag {
            keys::MOUSEDOWN => Event::Raw(RawInput::MouseDown(position)),
            keys::MOUSEUP => Event::Raw(RawInput::MouseUp(position)),
            keys::MOUSEPOS => Event::Raw(RawInput::MousePos(position)),
            keys::MOUSEDOWN_RIGHT => Event::Raw(RawInput::MouseDownRight(position)),
            other => self.translate(other, Some(position)),
        }
    }
}
