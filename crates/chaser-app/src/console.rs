//! Line-oriented console peer.
//!
//! Stands in for both the control panel and the input worker: every stdin
//! line becomes an engine command, an engine event, or a video switch.

use anyhow::{anyhow, bail, Context, Result};
use chaser_annotation::MarkerKind;
use chaser_core::Point;
use chaser_engine::{Command, EngineHandle, Event, KeyMap};
use crossbeam_channel::{Sender, TrySendError};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

pub const HELP: &str = "\
commands:
  next | n                 next frame
  prev | p                 previous frame
  mark <kind> <x> <y>      place a marker (nose head tail water block ear food)
  add <kind> <x> <y>       add a slot to ear or food
  remove <kind>            drop the last ear or food slot
  key <code> [<x> <y>]     send a raw key code through the key map
  save                     write the next numbered save
  video next | prev        switch to another video in the folder
  help                     this text
  quit                     stop";

/// Which way to cycle the video list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Forward,
    Back,
}

/// A parsed console line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Event(Event),
    Save,
    Video(Step),
    Help,
    Quit,
}

fn point(x: Option<&str>, y: Option<&str>) -> Result<Point> {
    let x = x.ok_or_else(|| anyhow!("missing x"))?;
    let y = y.ok_or_else(|| anyhow!("missing y"))?;
    Ok(Point::new(
        x.parse().with_context(|| format!("bad x: {x}"))?,
        y.parse().with_context(|| format!("bad y: {y}"))?,
    ))
}

fn kind(word: Option<&str>) -> Result<MarkerKind> {
    Ok(word.ok_or_else(|| anyhow!("missing marker kind"))?.parse()?)
}

/// Parse one console line. Blank lines give `None`.
pub fn parse_line(line: &str, keymap: &KeyMap) -> Result<Option<Line>> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(None);
    };

    let parsed = match head.to_ascii_lowercase().as_str() {
        "next" | "n" => Line::Event(Event::NextFrame),
        "prev" | "p" => Line::Event(Event::PrevFrame),
        "mark" | "m" => {
            let kind = kind(words.next())?;
            Line::Event(Event::Marker(kind, point(words.next(), words.next())?))
        }
        "add" => {
            let kind = kind(words.next())?;
            Line::Event(Event::AddSlot(kind, point(words.next(), words.next())?))
        }
        "remove" => Line::Event(Event::RemoveSlot(kind(words.next())?)),
        "key" => {
            let code = words.next().ok_or_else(|| anyhow!("missing key code"))?;
            let code: u32 = code.parse().with_context(|| format!("bad key code: {code}"))?;
            let position = match words.next() {
                Some(x) => Some(point(Some(x), words.next())?),
                None => None,
            };
            Line::Event(match position {
                Some(p) => keymap.translate_mouse(code, p),
                None => keymap.translate(code, None),
            })
        }
        "save" | "s" => Line::Save,
        "video" => match words.next() {
            Some("next") => Line::Video(Step::Forward),
            Some("prev") => Line::Video(Step::Back),
            other => bail!("expected 'video next' or 'video prev', got {:?}", other),
        },
        "help" | "?" => Line::Help,
        "quit" | "q" | "exit" => Line::Quit,
        other => bail!("unknown command: {other}"),
    };

    if let Some(extra) = words.next() {
        bail!("unexpected argument: {extra}");
    }
    Ok(Some(parsed))
}

/// Hand `item` to the engine without blocking the console.
///
/// A full queue drops the item with a notice; only a stopped engine is an
/// error.
fn submit<T>(queue: &Sender<T>, item: T, what: &str) -> Result<()> {
    match queue.try_send(item) {
        Ok(()) => Ok(()),
        Err(TrySendError::Full(_)) => {
            warn!(queue = what, "Engine busy, input dropped");
            eprintln!("engine busy, {what} dropped");
            Ok(())
        }
        Err(TrySendError::Disconnected(_)) => bail!("engine stopped"),
    }
}

/// The video list and the queues into the engine.
pub struct Console {
    videos: Vec<PathBuf>,
    current: usize,
    save_root: PathBuf,
    keymap: KeyMap,
    handle: EngineHandle,
}

impl Console {
    /// `videos` must not be empty. Saves go next to the current video, or
    /// under `save_root` for videos without a parent folder.
    pub fn new(videos: Vec<PathBuf>, save_root: PathBuf, handle: EngineHandle) -> Self {
        Self {
            videos,
            current: 0,
            save_root,
            keymap: KeyMap::default(),
            handle,
        }
    }

    fn current_video(&self) -> Option<&Path> {
        self.videos.get(self.current).map(PathBuf::as_path)
    }

    /// Folder the next save goes into.
    pub fn save_dir(&self) -> PathBuf {
        self.current_video()
            .and_then(Path::parent)
            .filter(|p| !p.as_os_str().is_empty())
            .map_or_else(|| self.save_root.clone(), Path::to_path_buf)
    }

    fn command(&self, command: Command) -> Result<()> {
        submit(&self.handle.commands, command, "command")
    }

    /// Ask the engine to stop. The shared signal covers a full command queue.
    fn stop_engine(&self) {
        // Engine may already be gone; nothing left to stop then
        let _ = self.handle.commands.try_send(Command::Terminate);
        self.handle.termination.trigger();
    }

    /// Ask the engine to load the current video.
    pub fn load_current(&self) -> Result<()> {
        let video = self
            .current_video()
            .ok_or_else(|| anyhow!("no videos to annotate"))?;
        info!(video = %video.display(), "Requesting load");
        self.command(Command::LoadVideo(video.to_path_buf()))
    }

    /// Move through the video list, wrapping at both ends, and load.
    pub fn switch(&mut self, step: Step) -> Result<()> {
        let n = self.videos.len();
        if n == 0 {
            bail!("no videos to annotate");
        }
        self.current = match step {
            Step::Forward => (self.current + 1) % n,
            Step::Back => (self.current + n - 1) % n,
        };
        self.load_current()
    }

    /// Act on one parsed line. Returns false once the console should stop.
    pub fn dispatch(&mut self, line: Line) -> Result<bool> {
        match line {
            Line::Event(event) => submit(&self.handle.events, event, "event")?,
            Line::Save => self.command(Command::Save(self.save_dir()))?,
            Line::Video(step) => self.switch(step)?,
            Line::Help => println!("{HELP}"),
            Line::Quit => {
                self.stop_engine();
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Read lines until `quit`, end of input, or engine shutdown.
    pub fn run(mut self, input: impl BufRead) -> Result<()> {
        self.load_current()?;
        for line in input.lines() {
            if self.handle.termination.is_triggered() {
                break;
            }
            let line = line?;
            match parse_line(&line, &self.keymap) {
                Ok(Some(parsed)) => {
                    if !self.dispatch(parsed)? {
                        return Ok(());
                    }
                }
                Ok(None) => {}
                Err(e) => eprintln!("{e:#}"),
            }
        }
        debug!("Console input closed");
        self.stop_engine();
        Ok(())
    }
}
