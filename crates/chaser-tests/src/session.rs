//! Integration tests for an annotation session.
//!
//! Exercises chaser-engine's worker together with chaser-media's synthetic
//! source and chaser-annotation's records, over the real queues.

use chaser_annotation::MarkerKind;
use chaser_core::{ChaserError, Point, Result};
use chaser_engine::{
    keys, Command, EngineConfig, EngineHandle, EngineWorker, Event, KeyMap, RenderFrame, Status,
};
use chaser_media::{FrameSource, SyntheticOpener, VideoOpener};
use std::path::{Path, PathBuf};
use std::time::Duration;

// ── Helpers ────────────────────────────────────────────────────

fn worker(frames: usize) -> (EngineWorker, EngineHandle) {
    EngineWorker::new(
        Box::new(SyntheticOpener::new(frames, 16, 12)),
        EngineConfig::default(),
    )
}

fn load(worker: &mut EngineWorker, handle: &EngineHandle, name: &str) {
    handle
        .commands
        .send(Command::LoadVideo(PathBuf::from(name)))
        .unwrap();
    worker.tick().unwrap();
}

fn step(worker: &mut EngineWorker, handle: &EngineHandle, event: Event) -> Option<RenderFrame> {
    handle.events.send(event).unwrap();
    worker.tick().unwrap();
    handle.render.try_iter().last()
}

fn positions(handle: &EngineHandle) -> Vec<String> {
    handle
        .status
        .try_iter()
        .filter_map(|s| match s {
            Status::FramePosition(p) => Some(p),
            _ => None,
        })
        .collect()
}

// ── Navigation ─────────────────────────────────────────────────

#[test]
fn three_frame_walk_grows_ledger_and_clamps() {
    let (mut worker, handle) = worker(3);
    load(&mut worker, &handle, "walk.mp4");
    let mut lengths = vec![worker.engine().ledger().unwrap().len()];
    let mut pointers = vec![worker.engine().current_index().unwrap()];

    for _ in 0..3 {
        step(&mut worker, &handle, Event::NextFrame);
        lengths.push(worker.engine().ledger().unwrap().len());
        pointers.push(worker.engine().current_index().unwrap());
    }

    assert_eq!(lengths, [1, 2, 3, 3]);
    assert_eq!(pointers, [0, 1, 2, 2]);
    assert_eq!(positions(&handle), ["0/2", "1/2", "2/2"]);
}

#[test]
fn markers_carry_forward_and_revisits_keep_edits() {
    let (mut worker, handle) = worker(10);
    load(&mut worker, &handle, "carry.mp4");

    step(&mut worker, &handle, Event::Marker(MarkerKind::Head, Point::new(7, 7)));
    let frame = step(&mut worker, &handle, Event::NextFrame).unwrap();
    assert_eq!(frame.record.frame_index, 1);
    assert_eq!(frame.record.markers.head, Point::new(7, 7));

    step(&mut worker, &handle, Event::Marker(MarkerKind::Head, Point::new(8, 8)));
    let back = step(&mut worker, &handle, Event::PrevFrame).unwrap();
    assert_eq!(back.record.markers.head, Point::new(7, 7));

    let again = step(&mut worker, &handle, Event::NextFrame).unwrap();
    assert_eq!(again.record.markers.head, Point::new(8, 8));
    assert_eq!(worker.engine().ledger().unwrap().len(), 2);
}

#[test]
fn render_frames_show_the_decoded_image() {
    let (mut worker, handle) = worker(4);
    load(&mut worker, &handle, "images.mp4");
    let first = handle.render.try_recv().unwrap();
    let second = step(&mut worker, &handle, Event::NextFrame).unwrap();

    assert_eq!(first.record.image.dimensions(), (16, 12));
    assert_eq!(first.record.image.data()[0], 0);
    assert_eq!(second.record.image.data()[0], 1);
}

// ── Multi-instance markers ─────────────────────────────────────

#[test]
fn food_slots_cycle_add_and_remove() {
    let (mut worker, handle) = worker(2);
    load(&mut worker, &handle, "food.mp4");

    step(&mut worker, &handle, Event::AddSlot(MarkerKind::Food, Point::new(0, 0)));
    for x in 1..=4 {
        step(&mut worker, &handle, Event::Marker(MarkerKind::Food, Point::new(x, 0)));
    }
    let food = worker.engine().current().unwrap().markers.food.clone();
    // Fourth update wraps back onto the first slot
    assert_eq!(
        food.as_slice(),
        [Point::new(4, 0), Point::new(2, 0), Point::new(3, 0)]
    );

    step(&mut worker, &handle, Event::RemoveSlot(MarkerKind::Food));
    assert_eq!(worker.engine().current().unwrap().markers.food.len(), 2);
}

#[test]
fn key_codes_route_through_keymap() {
    let (mut worker, handle) = worker(3);
    load(&mut worker, &handle, "keys.mp4");
    let map = KeyMap::default();
    let at = Point::new(11, 5);

    step(&mut worker, &handle, map.translate(keys::K_W, Some(at)));
    step(&mut worker, &handle, map.translate(keys::K_2, None));
    let frame = step(&mut worker, &handle, map.translate(keys::K_B, Some(at))).unwrap();

    assert_eq!(frame.record.frame_index, 1);
    assert_eq!(frame.record.markers.water, at);
    assert_eq!(frame.record.markers.block, at);

    // Unbound keys and mouse motion leave nothing to publish
    assert!(step(&mut worker, &handle, map.translate(keys::K_Z, None)).is_none());
    assert!(step(&mut worker, &handle, map.translate_mouse(keys::MOUSEPOS, at)).is_none());
}

// ── Reload ─────────────────────────────────────────────────────

#[test]
fn reload_resets_state_and_later_events_reach_new_video() {
    let (mut worker, handle) = worker(6);
    load(&mut worker, &handle, "first.mp4");
    step(&mut worker, &handle, Event::NextFrame);
    step(&mut worker, &handle, Event::Marker(MarkerKind::Nose, Point::new(2, 2)));

    handle
        .commands
        .send(Command::LoadVideo(PathBuf::from("second.mp4")))
        .unwrap();
    handle.events.send(Event::NextFrame).unwrap();
    worker.tick().unwrap();

    let engine = worker.engine();
    assert_eq!(engine.video_path(), Some(Path::new("second.mp4")));
    assert_eq!(engine.current_index(), Some(0));
    assert_eq!(engine.ledger().unwrap().len(), 1);
    assert_eq!(engine.current().unwrap().markers.nose, Point::ZERO);

    // The step queued behind the load lands on the new video
    let nose = Event::Marker(MarkerKind::Nose, Point::new(5, 5));
    let frame = step(&mut worker, &handle, nose).unwrap();
    assert_eq!(frame.record.frame_index, 1);
    assert_eq!(frame.record.markers.nose, Point::new(5, 5));
    assert_eq!(worker.engine().ledger().unwrap().len(), 2);
}

/// Opener that refuses one path and decodes everything else synthetically.
struct RejectingOpener {
    inner: SyntheticOpener,
    rejected: PathBuf,
}

impl VideoOpener for RejectingOpener {
    fn open(&self, path: &Path) -> Result<Box<dyn FrameSource>> {
        if path == self.rejected {
            return Err(ChaserError::NotFound(path.display().to_string()));
        }
        self.inner.open(path)
    }
}

#[test]
fn failed_reload_keeps_session_and_queued_edits() {
    let (mut worker, handle) = EngineWorker::new(
        Box::new(RejectingOpener {
            inner: SyntheticOpener::new(4, 8, 8),
            rejected: PathBuf::from("gone.mp4"),
        }),
        EngineConfig::default(),
    );
    load(&mut worker, &handle, "kept.mp4");
    step(&mut worker, &handle, Event::NextFrame);

    handle
        .events
        .send(Event::Marker(MarkerKind::Tail, Point::new(1, 2)))
        .unwrap();
    handle
        .commands
        .send(Command::LoadVideo(PathBuf::from("gone.mp4")))
        .unwrap();
    worker.tick().unwrap();

    let failures: Vec<_> = handle
        .status
        .try_iter()
        .filter(|s| matches!(s, Status::Notice(t) if t.starts_with("load failed")))
        .collect();
    assert_eq!(failures.len(), 1);
    assert_eq!(handle.events.len(), 1);

    worker.tick().unwrap();
    let engine = worker.engine();
    assert_eq!(engine.video_path(), Some(Path::new("kept.mp4")));
    assert_eq!(engine.current_index(), Some(1));
    assert_eq!(engine.current().unwrap().markers.tail, Point::new(1, 2));
}

#[test]
fn truncated_video_still_loads() {
    let (mut worker, handle) = EngineWorker::new(
        Box::new(SyntheticOpener::new(10, 8, 8).failing_after(3)),
        EngineConfig::default(),
    );
    load(&mut worker, &handle, "broken.mp4");
    assert_eq!(worker.engine().frame_count(), 3);

    let progress: Vec<_> = handle
        .status
        .try_iter()
        .filter(|s| matches!(s, Status::Progress(_)))
        .collect();
    assert_eq!(progress.len(), 2);
    assert!(progress[1].text().contains("stopped after 3frames"));
}

// ── Threads ────────────────────────────────────────────────────

#[test]
fn spawned_worker_serves_peers_until_terminated() {
    let (worker, handle) = EngineWorker::new(
        Box::new(SyntheticOpener::new(5, 8, 8)),
        EngineConfig {
            tick_rate_hz: 500,
            ..Default::default()
        },
    );
    let engine = worker.spawn().unwrap();

    handle
        .commands
        .send(Command::LoadVideo(PathBuf::from("live.mp4")))
        .unwrap();
    let first = handle.render.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(first.record.frame_index, 0);

    handle.events.send(Event::NextFrame).unwrap();
    let next = handle.render.recv_timeout(Duration::from_secs(5)).unwrap();
    assert_eq!(next.record.frame_index, 1);

    handle.commands.send(Command::Terminate).unwrap();
    engine.join().unwrap().unwrap();
    assert!(handle.termination.is_triggered());
}

#[test]
fn supervisor_signal_stops_worker() {
    let (worker, handle) = worker(2);
    let engine = worker.spawn().unwrap();
    handle.termination.trigger();
    engine.join().unwrap().unwrap();
}
