use std::path::PathBuf;
use std::sync::Arc;
use std::sync::mpsc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use notify::EventKind;
use notify::event::{
    AccessKind, AccessMode, CreateKind, DataChange, MetadataKind, ModifyKind, RemoveKind,
    RenameMode,
};
use tempfile::TempDir;

use super::debouncer::TriggerGate;
use super::settle::SettleQueue;
use super::*;
use crate::utils::path::normalize_path;

const POOL: &str = "/srv/repo/debian/dists";

fn timing() -> WatchTiming {
    WatchTiming {
        min_trigger_interval: Duration::from_millis(1000),
        settle_delay: Duration::from_millis(500),
        poll_interval: Duration::from_millis(50),
    }
}

fn dispatcher() -> EventDispatcher {
    EventDispatcher::new(
        DistExtractor::new("dists/", "pool"),
        ["jammy", "noble"],
        timing(),
    )
}

fn make_event(path: &str, kind: EventKind) -> notify::Event {
    notify::Event {
        kind,
        paths: vec![PathBuf::from(path)],
        attrs: Default::default(),
    }
}

fn pool_file(dist: &str, name: &str) -> String {
    format!("{POOL}/{dist}/pool/main/{name}")
}

fn modify_kind() -> EventKind {
    EventKind::Modify(ModifyKind::Data(DataChange::Any))
}

fn create_kind() -> EventKind {
    EventKind::Create(CreateKind::File)
}

#[test]
fn test_event_classification() {
    assert_eq!(RepoEvent::from_kind(&create_kind()), RepoEvent::Create);
    assert_eq!(
        RepoEvent::from_kind(&EventKind::Remove(RemoveKind::File)),
        RepoEvent::Delete
    );
    assert_eq!(RepoEvent::from_kind(&modify_kind()), RepoEvent::Modify);
    assert_eq!(
        RepoEvent::from_kind(&EventKind::Modify(ModifyKind::Name(RenameMode::From))),
        RepoEvent::MovedFrom
    );
    assert_eq!(
        RepoEvent::from_kind(&EventKind::Modify(ModifyKind::Name(RenameMode::To))),
        RepoEvent::MovedTo
    );
}

#[test]
fn test_read_only_events_ignored() {
    let ignored = [
        EventKind::Access(AccessKind::Open(AccessMode::Read)),
        EventKind::Access(AccessKind::Read),
        EventKind::Access(AccessKind::Close(AccessMode::Read)),
        EventKind::Modify(ModifyKind::Metadata(MetadataKind::Permissions)),
        EventKind::Any,
        EventKind::Other,
    ];
    for kind in ignored {
        assert!(RepoEvent::from_kind(&kind).is_ignored(), "{kind:?}");
    }
}

#[test]
fn test_ignored_events_do_not_touch_clock() {
    let mut dispatcher = dispatcher();
    let now = Instant::now();

    let access = make_event(
        &pool_file("jammy", "a.deb"),
        EventKind::Access(AccessKind::Open(AccessMode::Read)),
    );
    assert_eq!(dispatcher.handle_at(&access, now), None);
    assert!(dispatcher.last_scheduled().is_none());

    let write = make_event(&pool_file("jammy", "a.deb"), modify_kind());
    assert_eq!(dispatcher.handle_at(&write, now).as_deref(), Some("jammy"));
}

#[test]
fn test_burst_schedules_exactly_one_trigger() {
    let mut dispatcher = dispatcher();
    let start = Instant::now();

    let scheduled: Vec<_> = (0..50)
        .filter_map(|i| {
            let event = make_event(&pool_file("jammy", &format!("pkg{i}.deb")), create_kind());
            dispatcher.handle_at(&event, start + Duration::from_millis(i * 15))
        })
        .collect();

    assert_eq!(scheduled, vec!["jammy".to_string()]);
    assert_eq!(dispatcher.pending(), 1);

    // Nothing fires before the settle delay.
    assert!(dispatcher.take_due(start + Duration::from_millis(499)).is_empty());

    let fired = dispatcher.take_due(start + Duration::from_millis(500));
    assert_eq!(fired.len(), 1);
    assert_eq!(fired[0].dist, "jammy");
    assert_eq!(dispatcher.pending(), 0);
}

#[test]
fn test_interval_measured_from_last_scheduled_trigger() {
    let mut dispatcher = dispatcher();
    let start = Instant::now();
    let event = make_event(&pool_file("jammy", "a.deb"), modify_kind());

    assert!(dispatcher.handle_at(&event, start).is_some());
    // Still within the burst even though the trigger already fired.
    dispatcher.take_due(start + Duration::from_millis(600));
    assert!(dispatcher.handle_at(&event, start + Duration::from_millis(900)).is_none());

    assert!(dispatcher.handle_at(&event, start + Duration::from_millis(1000)).is_some());
}

#[test]
fn test_clock_shared_across_distributions() {
    let mut dispatcher = dispatcher();
    let start = Instant::now();

    let jammy = make_event(&pool_file("jammy", "a.deb"), create_kind());
    let noble = make_event(&pool_file("noble", "b.deb"), create_kind());

    assert!(dispatcher.handle_at(&jammy, start).is_some());
    assert!(dispatcher.handle_at(&noble, start + Duration::from_millis(100)).is_none());
    assert_eq!(
        dispatcher.handle_at(&noble, start + Duration::from_millis(1100)).as_deref(),
        Some("noble")
    );
}

#[test]
fn test_unknown_or_unmapped_paths_ignored() {
    let mut dispatcher = dispatcher();
    let now = Instant::now();

    let unknown = make_event(&pool_file("sid", "a.deb"), create_kind());
    assert!(dispatcher.handle_at(&unknown, now).is_none());

    let outside = make_event("/srv/repo/debian/dists/jammy/Release", create_kind());
    assert!(dispatcher.handle_at(&outside, now).is_none());

    // Neither consumed the burst window.
    assert!(dispatcher.last_scheduled().is_none());
}

#[test]
fn test_trigger_gate() {
    let mut gate = TriggerGate::new(Duration::from_secs(1));
    let start = Instant::now();

    assert!(gate.try_schedule_at(start));
    assert!(!gate.try_schedule_at(start + Duration::from_millis(999)));
    assert!(gate.try_schedule_at(start + Duration::from_secs(1)));
    assert_eq!(gate.last_scheduled(), Some(start + Duration::from_secs(1)));
}

#[test]
fn test_settle_queue_supersedes_same_dist() {
    let mut queue = SettleQueue::default();
    let start = Instant::now();

    queue.schedule("jammy".into(), start + Duration::from_millis(500));
    queue.schedule("noble".into(), start + Duration::from_millis(300));
    queue.schedule("jammy".into(), start + Duration::from_millis(800));

    assert_eq!(queue.len(), 2);
    assert_eq!(queue.next_deadline(), Some(start + Duration::from_millis(300)));

    let due = queue.take_due(start + Duration::from_millis(600));
    assert_eq!(due.len(), 1);
    assert_eq!(due[0].dist, "noble");

    let due = queue.take_due(start + Duration::from_millis(800));
    assert_eq!(due[0].dist, "jammy");
    assert_eq!(queue.next_deadline(), None);
}

#[test]
fn test_watcher_triggers_rebuild_and_stops_on_shutdown() {
    let temp = TempDir::new().unwrap();
    let root = normalize_path(temp.path());
    let pool = root.join("debian/dists/jammy/pool");
    std::fs::create_dir_all(&pool).unwrap();

    let rebuilds = Arc::new(AtomicUsize::new(0));
    let rebuild = {
        let rebuilds = Arc::clone(&rebuilds);
        move |_: &str| -> anyhow::Result<()> {
            rebuilds.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    };
    let coordinator = Arc::new(UpdateCoordinator::new(["jammy"], 2, Arc::new(rebuild)));

    let timing = WatchTiming {
        min_trigger_interval: Duration::from_secs(5),
        settle_delay: Duration::from_millis(50),
        poll_interval: Duration::from_millis(50),
    };
    let dispatcher = EventDispatcher::new(DistExtractor::new("dists/", "pool"), ["jammy"], timing);
    let watcher =
        ChangeWatcher::new(vec![pool.clone()], dispatcher, coordinator, timing.poll_interval)
            .unwrap();

    let shutdown = Shutdown::new();
    let handle = {
        let shutdown = shutdown.clone();
        std::thread::spawn(move || watcher.run(&shutdown))
    };

    for i in 0..5 {
        std::fs::write(pool.join(format!("pkg{i}.deb")), b"deb").unwrap();
    }

    let deadline = Instant::now() + Duration::from_secs(10);
    while rebuilds.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(20));
    }
    // Give a second trigger a chance to show up if the burst were not coalesced.
    std::thread::sleep(Duration::from_millis(300));
    assert_eq!(rebuilds.load(Ordering::SeqCst), 1);

    let stop = Instant::now();
    shutdown.trigger();
    handle.join().unwrap();
    assert!(stop.elapsed() < Duration::from_secs(2));
}

#[test]
fn test_notify_error_does_not_stop_watcher() {
    let rebuilds = Arc::new(AtomicUsize::new(0));
    let rebuild = {
        let rebuilds = Arc::clone(&rebuilds);
        move |_: &str| -> anyhow::Result<()> {
            rebuilds.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    };
    let coordinator = Arc::new(UpdateCoordinator::new(["jammy"], 2, Arc::new(rebuild)));

    let timing = WatchTiming {
        min_trigger_interval: Duration::from_secs(5),
        settle_delay: Duration::from_millis(50),
        poll_interval: Duration::from_millis(50),
    };
    let dispatcher = EventDispatcher::new(DistExtractor::new("dists/", "pool"), ["jammy"], timing);
    let (tx, rx) = mpsc::channel();
    let watcher = ChangeWatcher::with_channel(
        tx.clone(),
        rx,
        Vec::new(),
        dispatcher,
        coordinator,
        timing.poll_interval,
    )
    .unwrap();

    tx.send(Err(notify::Error::generic("queue overflow"))).unwrap();
    tx.send(Ok(make_event(&pool_file("jammy", "hello.deb"), create_kind())))
        .unwrap();

    let shutdown = Shutdown::new();
    let handle = {
        let shutdown = shutdown.clone();
        std::thread::spawn(move || watcher.run(&shutdown))
    };

    let deadline = Instant::now() + Duration::from_secs(10);
    while rebuilds.load(Ordering::SeqCst) == 0 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(20));
    }
    assert_eq!(rebuilds.load(Ordering::SeqCst), 1);

    shutdown.trigger();
    handle.join().unwrap();
}
