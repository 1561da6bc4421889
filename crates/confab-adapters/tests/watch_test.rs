//! Live-watch tests. These drive real filesystem notifications, so waits
//! are generous to stay stable on slow CI machines.

use confab_adapters::claude::ClaudeAdapter;
use confab_adapters::copilot::CopilotAdapter;
use confab_adapters::traits::Adapter;
use confab_testing::{FlatLogStore, SessionStateStore};
use confab_types::{ChangeEvent, ChangeKind};
use std::path::Path;
use std::sync::mpsc::Receiver;
use std::time::{Duration, Instant};
use tempfile::tempdir;

const PROJECT: &str = "/home/u/repo";

fn drain_for(rx: &Receiver<ChangeEvent>, window: Duration) -> Vec<ChangeEvent> {
    let deadline = Instant::now() + window;
    let mut events = Vec::new();
    while let Some(remaining) = deadline.checked_duration_since(Instant::now()) {
        match rx.recv_timeout(remaining) {
            Ok(event) => events.push(event),
            Err(_) => break,
        }
    }
    events
}

#[test]
fn test_append_burst_coalesces_to_single_event() {
    let dir = tempdir().unwrap();
    let store = FlatLogStore::new(dir.path());
    let adapter = ClaudeAdapter::with_home(dir.path().to_path_buf());

    store
        .write_session(
            PROJECT,
            "s1",
            &[FlatLogStore::user_line("u0", "2025-01-15T10:00:00Z", "start")],
        )
        .unwrap();

    let handle = adapter.watch(Path::new(PROJECT)).unwrap();
    // Give the watcher a moment to establish before writing.
    std::thread::sleep(Duration::from_millis(100));

    for i in 0..10 {
        store
            .append_record(
                PROJECT,
                "s1",
                &FlatLogStore::user_line(
                    &format!("u{}", i + 1),
                    "2025-01-15T10:00:01Z",
                    "burst",
                ),
            )
            .unwrap();
        std::thread::sleep(Duration::from_millis(10));
    }

    let events = drain_for(handle.events(), Duration::from_millis(700));
    assert_eq!(events.len(), 1, "burst within the window must coalesce");
    assert_eq!(events[0].kind, ChangeKind::MessageAdded);
    assert_eq!(events[0].session_id, "s1");

    handle.close();
}

#[test]
fn test_writes_after_quiet_period_emit_again() {
    let dir = tempdir().unwrap();
    let store = FlatLogStore::new(dir.path());
    let adapter = ClaudeAdapter::with_home(dir.path().to_path_buf());

    store
        .write_session(
            PROJECT,
            "s1",
            &[FlatLogStore::user_line("u0", "2025-01-15T10:00:00Z", "start")],
        )
        .unwrap();

    let handle = adapter.watch(Path::new(PROJECT)).unwrap();
    std::thread::sleep(Duration::from_millis(100));

    store
        .append_record(
            PROJECT,
            "s1",
            &FlatLogStore::user_line("u1", "2025-01-15T10:00:01Z", "first"),
        )
        .unwrap();
    let first = drain_for(handle.events(), Duration::from_millis(600));
    assert!(!first.is_empty());

    store
        .append_record(
            PROJECT,
            "s1",
            &FlatLogStore::user_line("u2", "2025-01-15T10:05:00Z", "second"),
        )
        .unwrap();
    let second = drain_for(handle.events(), Duration::from_millis(600));
    assert!(!second.is_empty(), "a write after the window emits again");

    handle.close();
}

#[test]
fn test_new_session_file_emits_session_created() {
    let dir = tempdir().unwrap();
    let store = FlatLogStore::new(dir.path());
    let adapter = ClaudeAdapter::with_home(dir.path().to_path_buf());

    // The project directory must exist for the watch to attach.
    std::fs::create_dir_all(store.project_dir(PROJECT)).unwrap();

    let handle = adapter.watch(Path::new(PROJECT)).unwrap();
    std::thread::sleep(Duration::from_millis(100));

    std::fs::File::create(store.session_path(PROJECT, "fresh")).unwrap();

    let events = drain_for(handle.events(), Duration::from_millis(700));
    assert!(!events.is_empty());
    assert_eq!(events[0].kind, ChangeKind::SessionCreated);
    assert_eq!(events[0].session_id, "fresh");

    handle.close();
}

#[test]
fn test_closer_closes_channel() {
    let dir = tempdir().unwrap();
    let store = FlatLogStore::new(dir.path());
    let adapter = ClaudeAdapter::with_home(dir.path().to_path_buf());

    std::fs::create_dir_all(store.project_dir(PROJECT)).unwrap();

    let handle = adapter.watch(Path::new(PROJECT)).unwrap();
    let closer = handle.closer();
    closer.close();

    match handle.events().recv_timeout(Duration::from_millis(300)) {
        Err(_) => {}
        Ok(event) => panic!("expected closed channel, got {:?}", event),
    }
}

#[test]
fn test_global_watch_filters_foreign_projects() {
    let dir = tempdir().unwrap();
    let store = SessionStateStore::new(dir.path());
    let adapter = CopilotAdapter::with_home(dir.path().to_path_buf());

    let mine = dir.path().join("mine");
    let theirs = dir.path().join("theirs");
    std::fs::create_dir_all(&mine).unwrap();
    std::fs::create_dir_all(&theirs).unwrap();
    let mine = mine.canonicalize().unwrap();
    let theirs = theirs.canonicalize().unwrap();

    for (session, project) in [("sess-mine", &mine), ("sess-theirs", &theirs)] {
        let project = project.to_string_lossy();
        store
            .write_workspace(
                session,
                &project,
                &project,
                "main",
                "watching",
                "2025-01-15T09:00:00Z",
                "2025-01-15T10:00:00Z",
            )
            .unwrap();
        store
            .write_events(
                session,
                &[SessionStateStore::user_event("m1", "2025-01-15T09:00:00Z", "hi")],
            )
            .unwrap();
    }

    let handle = adapter.watch(&mine).unwrap();
    std::thread::sleep(Duration::from_millis(150));

    store
        .append_event(
            "sess-theirs",
            &SessionStateStore::user_event("m2", "2025-01-15T10:01:00Z", "not yours"),
        )
        .unwrap();
    store
        .append_event(
            "sess-mine",
            &SessionStateStore::user_event("m2", "2025-01-15T10:01:00Z", "for you"),
        )
        .unwrap();

    let events = drain_for(handle.events(), Duration::from_millis(900));
    assert!(!events.is_empty());
    for event in &events {
        assert_eq!(event.session_id, "sess-mine", "foreign events must be filtered");
    }

    handle.close();
}
