//! The engine worker thread and its queues.

use crate::config::EngineConfig;
use crate::engine::Engine;
use crate::protocol::{offer, Command, Event, RenderFrame, Status};
use chaser_core::Result;
use chaser_media::VideoOpener;
use crossbeam_channel::{bounded, Receiver, Sender, TryRecvError};
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

/// Shutdown flag shared by every worker and the supervisor.
#[derive(Debug, Clone)]
pub struct TerminationSignal(Arc<AtomicBool>);

impl TerminationSignal {
    /// Create a new, untriggered signal.
    pub fn new() -> Self {
        Self(Arc::new(AtomicBool::new(false)))
    }

    /// Ask every holder to stop.
    pub fn trigger(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Check if shutdown was requested.
    pub fn is_triggered(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

impl Default for TerminationSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Fixed-rate loop pacing. Sleeps only for what is left of the period.
#[derive(Debug)]
pub struct Ticker {
    period: Duration,
    next: Instant,
}

impl Ticker {
    pub fn new(period: Duration) -> Self {
        Self {
            period,
            next: Instant::now() + period,
        }
    }

    /// Block until the next tick is due. A late tick does not try to catch
    /// up on missed ones.
    pub fn tick(&mut self) {
        let now = Instant::now();
        if let Some(remaining) = self.next.checked_duration_since(now) {
            std::thread::sleep(remaining);
        }
        self.next = self.next.max(now) + self.period;
    }
}

/// Peer-side ends of the engine's queues.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    pub commands: Sender<Command>,
    pub events: Sender<Event>,
    pub status: Receiver<Status>,
    pub render: Receiver<RenderFrame>,
    pub termination: TerminationSignal,
}

/// What one tick did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// A render frame was published.
    pub published: bool,
    /// Termination was requested.
    pub terminated: bool,
}

/// Owns the [`Engine`] and drives it from its queues.
pub struct EngineWorker {
    engine: Engine,
    config: EngineConfig,
    commands: Receiver<Command>,
    events: Receiver<Event>,
    status: Sender<Status>,
    render: Sender<RenderFrame>,
    termination: TerminationSignal,
}

impl EngineWorker {
    /// Create a worker and the handle its peers talk through. Every queue is
    /// bounded by `config.channel_capacity`.
    pub fn new(opener: Box<dyn VideoOpener>, config: EngineConfig) -> (Self, EngineHandle) {
        let capacity = config.channel_capacity.max(1);
        let (command_tx, command_rx) = bounded(capacity);
        let (event_tx, event_rx) = bounded(capacity);
        let (status_tx, status_rx) = bounded(capacity);
        let (render_tx, render_rx) = bounded(capacity);
        let termination = TerminationSignal::new();

        let worker = Self {
            engine: Engine::new(opener, config.clone(), status_tx.clone()),
            config,
            commands: command_rx,
            events: event_rx,
            status: status_tx,
            render: render_tx,
            termination: termination.clone(),
        };
        let handle = EngineHandle {
            commands: command_tx,
            events: event_tx,
            status: status_rx,
            render: render_rx,
            termination,
        };
        (worker, handle)
    }

    /// The engine, for inspection.
    pub fn engine(&self) -> &Engine {
        &self.engine
    }

    /// The shared termination flag.
    pub fn termination(&self) -> &TerminationSignal {
        &self.termination
    }

    /// Run one iteration of the loop.
    ///
    /// Only a fatal engine error is returned. Load and save failures are
    /// reported on the status queue and the loop goes on.
    pub fn tick(&mut self) -> Result<TickOutcome> {
        let limit = self.config.max_drain_per_tick.max(1);
        let mut dirty = false;
        let mut loaded = false;
        let mut terminated = self.termination.is_triggered();

        for _ in 0..limit {
            let command = match self.commands.try_recv() {
                Ok(command) => command,
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    debug!("Command queue disconnected, terminating");
                    terminated = true;
                    break;
                }
            };
            match command {
                Command::LoadVideo(path) => {
                    loaded = true;
                    dirty |= self.load(&path)?;
                }
                Command::Save(dir) => self.save(&dir),
                Command::Terminate => {
                    terminated = true;
                    break;
                }
            }
        }

        if loaded {
            // Queued events wait for the next tick so they apply to the
            // state the load left behind, whether it succeeded or not
            if !self.events.is_empty() {
                debug!(pending = self.events.len(), "Deferring events queued behind load");
            }
        } else {
            for event in self.events.try_iter().take(limit) {
                dirty |= self.engine.handle_event(event);
            }
        }

        if dirty {
            self.publish();
        }

        if terminated {
            self.termination.trigger();
        }
        Ok(TickOutcome {
            published: dirty,
            terminated,
        })
    }

    fn load(&mut self, path: &Path) -> Result<bool> {
        match self.engine.load(path) {
            Ok(dirty) => Ok(dirty),
            Err(e) if e.is_fatal() => Err(e),
            Err(e) => {
                warn!(path = %path.display(), "Load failed: {}", e);
                offer(&self.status, Status::Notice(format!("load failed: {e}")), "status");
                Ok(false)
            }
        }
    }

    fn save(&self, dir: &Path) {
        if let Err(e) = self.engine.save(dir) {
            error!(dir = %dir.display(), "Save failed: {}", e);
            offer(&self.status, Status::Notice(format!("save failed: {e}")), "status");
        }
    }

    fn publish(&self) {
        if let Some(frame) = self.engine.render_frame() {
            offer(&self.render, frame, "render");
        }
        if let Some(marked) = self.engine.marked_status() {
            offer(&self.status, marked, "status");
        }
    }

    /// Tick until terminated. The termination signal is raised on every exit
    /// path, including a fatal error, so peers always wind down.
    pub fn run(mut self) -> Result<()> {
        info!(tick_rate_hz = self.config.tick_rate_hz, "Engine started");
        let mut ticker = Ticker::new(self.config.tick_period());
        let result = loop {
            match self.tick() {
                Ok(outcome) if outcome.terminated => break Ok(()),
                Ok(_) => ticker.tick(),
                Err(e) => break Err(e),
            }
        };
        self.termination.trigger();
        match &result {
            Ok(()) => info!("Engine stopped"),
            Err(e) => error!("Engine stopped on fatal error: {}", e),
        }
        result
    }

    /// Run on a new thread named `engine`.
    pub fn spawn(self) -> std::io::Result<JoinHandle<Result<()>>> {
        std::thread::Builder::new()
            .name("engine".into())
            .spawn(move || self.run())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chaser_annotation::MarkerKind;
    use chaser_core::{ChaserError, FrameBuffer, Point, SharedFrame};
    use chaser_media::{FrameSource, SyntheticOpener};
    use std::path::PathBuf;

    fn worker(frames: usize) -> (EngineWorker, EngineHandle) {
        EngineWorker::new(
            Box::new(SyntheticOpener::new(frames, 8, 6)),
            EngineConfig::default(),
        )
    }

    fn statuses(handle: &EngineHandle) -> Vec<Status> {
        handle.status.try_iter().collect()
    }

    #[test]
    fn test_termination_signal() {
        let signal = TerminationSignal::new();
        let peer = signal.clone();
        assert!(!peer.is_triggered());
        signal.trigger();
        assert!(peer.is_triggered());
    }

    #[test]
    fn test_ticker_does_not_accumulate_debt() {
        let mut ticker = Ticker::new(Duration::from_millis(1));
        std::thread::sleep(Duration::from_millis(20));
        let start = Instant::now();
        ticker.tick();
        ticker.tick();
        // One late tick returns at once, the next waits a single period
        assert!(start.elapsed() < Duration::from_millis(15));
    }

    #[test]
    fn test_idle_tick_publishes_nothing() {
        let (mut worker, handle) = worker(3);
        handle.events.send(Event::NextFrame).unwrap();
        let outcome = worker.tick().unwrap();
        assert_eq!(outcome, TickOutcome::default());
        assert!(handle.render.try_recv().is_err());
    }

    #[test]
    fn test_load_publishes_first_frame() {
        let (mut worker, handle) = worker(3);
        handle
            .commands
            .send(Command::LoadVideo(PathBuf::from("a.mp4")))
            .unwrap();
        assert!(worker.tick().unwrap().published);

        let frame = handle.render.try_recv().unwrap();
        assert_eq!(frame.record.frame_index, 0);
        assert_eq!(frame.frame_count, 3);
        let status = statuses(&handle);
        assert!(status.contains(&Status::FramePosition("0/2".into())));
        assert!(status.contains(&Status::Marked("Marked until 0 (idx)".into())));
    }

    #[test]
    fn test_events_behind_load_wait_for_next_tick() {
        let (mut worker, handle) = worker(5);
        handle
            .commands
            .send(Command::LoadVideo(PathBuf::from("a.mp4")))
            .unwrap();
        handle.events.send(Event::NextFrame).unwrap();
        handle
            .events
            .send(Event::Marker(MarkerKind::Nose, Point::new(4, 4)))
            .unwrap();

        worker.tick().unwrap();
        assert_eq!(worker.engine().current_index(), Some(0));
        assert_eq!(handle.events.len(), 2);

        assert!(worker.tick().unwrap().published);
        assert_eq!(worker.engine().current_index(), Some(1));
        assert_eq!(
            worker.engine().current().unwrap().markers.nose,
            Point::new(4, 4)
        );
    }

    /// Opens everything through a synthetic source except `missing.mp4`.
    struct PickyOpener(SyntheticOpener);

    impl VideoOpener for PickyOpener {
        fn open(&self, path: &Path) -> Result<Box<dyn FrameSource>> {
            if path == Path::new("missing.mp4") {
                return Err(ChaserError::NotFound(path.display().to_string()));
            }
            self.0.open(path)
        }
    }

    #[test]
    fn test_events_behind_failed_load_apply_to_loaded_video() {
        let (mut worker, handle) = EngineWorker::new(
            Box::new(PickyOpener(SyntheticOpener::new(4, 8, 6))),
            EngineConfig::default(),
        );
        handle
            .commands
            .send(Command::LoadVideo(PathBuf::from("good.mp4")))
            .unwrap();
        worker.tick().unwrap();

        handle
            .events
            .send(Event::Marker(MarkerKind::Nose, Point::new(7, 7)))
            .unwrap();
        handle
            .commands
            .send(Command::LoadVideo(PathBuf::from("missing.mp4")))
            .unwrap();
        worker.tick().unwrap();
        worker.tick().unwrap();

        let engine = worker.engine();
        assert_eq!(engine.video_path(), Some(Path::new("good.mp4")));
        assert_eq!(engine.current().unwrap().markers.nose, Point::new(7, 7));
    }

    #[test]
    fn test_failed_load_reports_and_continues() {
        let (mut worker, handle) = EngineWorker::new(
            Box::new(SyntheticOpener::new(0, 8, 6)),
            EngineConfig::default(),
        );
        handle
            .commands
            .send(Command::LoadVideo(PathBuf::from("empty.mp4")))
            .unwrap();
        let outcome = worker.tick().unwrap();
        assert!(!outcome.published);
        assert!(!outcome.terminated);
        assert!(!worker.engine().is_active());
        assert!(statuses(&handle)
            .iter()
            .any(|s| matches!(s, Status::Notice(t) if t.starts_with("load failed"))));
    }

    #[test]
    fn test_one_publish_per_dirty_tick() {
        let (mut worker, handle) = worker(5);
        handle
            .commands
            .send(Command::LoadVideo(PathBuf::from("a.mp4")))
            .unwrap();
        worker.tick().unwrap();
        handle.render.try_iter().for_each(drop);

        let p = Point::new(2, 3);
        handle.events.send(Event::Marker(MarkerKind::Nose, p)).unwrap();
        handle.events.send(Event::NextFrame).unwrap();
        handle.events.send(Event::NextFrame).unwrap();
        assert!(worker.tick().unwrap().published);

        let frames: Vec<_> = handle.render.try_iter().collect();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].record.frame_index, 2);
        assert_eq!(frames[0].record.markers.nose, p);
    }

    #[test]
    fn test_save_failure_is_reported() {
        let tmp = tempfile::tempdir().expect("failed to create tempdir");
        std::fs::write(tmp.path().join("save"), b"in the way").unwrap();

        let (mut worker, handle) = worker(2);
        handle
            .commands
            .send(Command::LoadVideo(PathBuf::from("a.mp4")))
            .unwrap();
        handle
            .commands
            .send(Command::Save(tmp.path().to_path_buf()))
            .unwrap();
        let outcome = worker.tick().unwrap();
        assert!(!outcome.terminated);
        assert!(statuses(&handle)
            .iter()
            .any(|s| matches!(s, Status::Notice(t) if t.starts_with("save failed"))));
    }

    #[test]
    fn test_terminate_command() {
        let (mut worker, handle) = worker(2);
        handle.commands.send(Command::Terminate).unwrap();
        assert!(worker.tick().unwrap().terminated);
        assert!(handle.termination.is_triggered());
    }

    #[test]
    fn test_disconnected_commands_terminate() {
        let (mut worker, handle) = worker(2);
        let termination = handle.termination.clone();
        drop(handle);
        assert!(worker.tick().unwrap().terminated);
        assert!(termination.is_triggered());
    }

    #[test]
    fn test_full_render_queue_does_not_block() {
        let config = EngineConfig {
            channel_capacity: 1,
            ..Default::default()
        };
        let (mut worker, handle) =
            EngineWorker::new(Box::new(SyntheticOpener::new(10, 8, 6)), config);
        handle
            .commands
            .send(Command::LoadVideo(PathBuf::from("a.mp4")))
            .unwrap();
        worker.tick().unwrap();
        for _ in 0..5 {
            handle.events.send(Event::NextFrame).unwrap();
            worker.tick().unwrap();
        }
        assert_eq!(worker.engine().current_index(), Some(5));
        assert_eq!(handle.render.len(), 1);
    }

    struct ResizingSource {
        next: u32,
    }

    impl FrameSource for ResizingSource {
        fn decode_frame(&mut self) -> Result<Option<SharedFrame>> {
            self.next += 1;
            if self.next > 3 {
                return Ok(None);
            }
            Ok(Some(std::sync::Arc::new(FrameBuffer::solid(self.next, 2, [0; 3])?)))
        }
    }

    struct ResizingOpener;

    impl VideoOpener for ResizingOpener {
        fn open(&self, _path: &Path) -> Result<Box<dyn FrameSource>> {
            Ok(Box::new(ResizingSource { next: 0 }))
        }
    }

    #[test]
    fn test_shape_mismatch_stops_run() {
        let (worker, handle) = EngineWorker::new(Box::new(ResizingOpener), EngineConfig::default());
        handle
            .commands
            .send(Command::LoadVideo(PathBuf::from("a.mp4")))
            .unwrap();
        let join = worker.spawn().unwrap();
        let result = join.join().unwrap();
        assert!(matches!(result, Err(ChaserError::ShapeMismatch { .. })));
        assert!(handle.termination.is_triggered());
    }
}
