//! Integration tests for saving sessions and finding videos.

use chaser_annotation::{MarkerKind, SaveFile, SaveStore};
use chaser_core::Point;
use chaser_engine::{Command, EngineConfig, EngineHandle, EngineWorker, Event, Status};
use chaser_media::{discover_videos, SyntheticOpener};
use std::path::Path;

fn active_worker(frames: usize, video: &Path) -> (EngineWorker, EngineHandle) {
    let (mut worker, handle) = EngineWorker::new(
        Box::new(SyntheticOpener::new(frames, 6, 4)),
        EngineConfig::default(),
    );
    handle
        .commands
        .send(Command::LoadVideo(video.to_path_buf()))
        .unwrap();
    worker.tick().unwrap();
    (worker, handle)
}

fn notices(handle: &EngineHandle) -> Vec<String> {
    handle
        .status
        .try_iter()
        .filter_map(|s| match s {
            Status::Notice(n) => Some(n),
            _ => None,
        })
        .collect()
}

#[test]
fn two_saves_write_numbered_full_ledgers() {
    let tmp = tempfile::tempdir().expect("failed to create tempdir");
    let video = tmp.path().join("trial.mp4");
    let (mut worker, handle) = active_worker(4, &video);

    handle
        .events
        .send(Event::Marker(MarkerKind::Tail, Point::new(3, 1)))
        .unwrap();
    handle.events.send(Event::NextFrame).unwrap();
    worker.tick().unwrap();
    handle
        .commands
        .send(Command::Save(tmp.path().to_path_buf()))
        .unwrap();
    worker.tick().unwrap();

    handle.events.send(Event::NextFrame).unwrap();
    worker.tick().unwrap();
    handle
        .commands
        .send(Command::Save(tmp.path().to_path_buf()))
        .unwrap();
    worker.tick().unwrap();

    assert_eq!(notices(&handle), ["saved", "saved"]);

    let store = SaveStore::new(tmp.path(), "save");
    let saves = store.list().unwrap();
    assert_eq!(saves.len(), 2);

    let first = SaveFile::load_from_file(&saves[0]).unwrap();
    let second = SaveFile::load_from_file(&saves[1]).unwrap();
    assert_eq!(first.records.len(), 2);
    assert_eq!(second.records.len(), 3);
    assert_eq!(second.video, video);
    assert_eq!(second.frame_count, 4);
    assert!(second.records.iter().all(|r| r.markers.tail == Point::new(3, 1)));
    assert_eq!(second.records[2].image.dimensions(), (6, 4));
}

#[test]
fn save_round_trips_images_and_slots() {
    let tmp = tempfile::tempdir().expect("failed to create tempdir");
    let (mut worker, handle) = active_worker(2, &tmp.path().join("a.mp4"));
    handle
        .events
        .send(Event::AddSlot(MarkerKind::Ear, Point::new(9, 9)))
        .unwrap();
    handle
        .commands
        .send(Command::Save(tmp.path().to_path_buf()))
        .unwrap();
    worker.tick().unwrap();

    // Commands run before events within a tick, so this save predates the slot
    let saves = SaveStore::new(tmp.path(), "save").list().unwrap();
    let saved = SaveFile::load_from_file(&saves[0]).unwrap();
    assert_eq!(saved.records[0].markers.ear.len(), 2);
    assert_eq!(
        saved.records[0].image,
        worker.engine().ledger().unwrap().records()[0].image
    );
    assert_eq!(worker.engine().current().unwrap().markers.ear.len(), 3);
}

#[test]
fn save_with_custom_folder_name() {
    let tmp = tempfile::tempdir().expect("failed to create tempdir");
    let (mut worker, handle) = EngineWorker::new(
        Box::new(SyntheticOpener::new(2, 4, 4)),
        EngineConfig {
            save_dir_name: "labels".into(),
            ..Default::default()
        },
    );
    handle
        .commands
        .send(Command::LoadVideo(tmp.path().join("a.mp4")))
        .unwrap();
    handle
        .commands
        .send(Command::Save(tmp.path().to_path_buf()))
        .unwrap();
    worker.tick().unwrap();
    assert!(tmp.path().join("labels").join("0.json").is_file());
}

#[test]
fn save_while_idle_reports_failure() {
    let tmp = tempfile::tempdir().expect("failed to create tempdir");
    let (mut worker, handle) = EngineWorker::new(
        Box::new(SyntheticOpener::new(2, 4, 4)),
        EngineConfig::default(),
    );
    handle
        .commands
        .send(Command::Save(tmp.path().to_path_buf()))
        .unwrap();
    worker.tick().unwrap();

    let notices = notices(&handle);
    assert_eq!(notices.len(), 1);
    assert!(notices[0].starts_with("save failed"));
    assert!(!tmp.path().join("save").exists());
}

#[test]
fn discovered_videos_load_in_name_order() {
    let tmp = tempfile::tempdir().expect("failed to create tempdir");
    for name in ["b.MP4", "a.avi", "notes.txt", "c.mkv"] {
        std::fs::write(tmp.path().join(name), b"").unwrap();
    }
    std::fs::create_dir(tmp.path().join("save")).unwrap();

    let videos = discover_videos(tmp.path()).unwrap();
    let names: Vec<_> = videos
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(names, ["a.avi", "b.MP4", "c.mkv"]);

    let (worker, _handle) = active_worker(3, &videos[1]);
    assert_eq!(worker.engine().video_path(), Some(videos[1].as_path()));
}
