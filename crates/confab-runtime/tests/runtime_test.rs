use confab_adapters::claude::ClaudeAdapter;
use confab_adapters::copilot::CopilotAdapter;
use confab_runtime::{BusEvent, EventBus, Registry, WatchDispatcher};
use confab_testing::{FlatLogStore, SessionStateStore};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::tempdir;

fn project_dir(root: &Path, name: &str) -> String {
    let dir = root.join(name);
    std::fs::create_dir_all(&dir).unwrap();
    dir.canonicalize().unwrap().to_string_lossy().into_owned()
}

/// Two adapters over two different stores, merged into one listing.
#[test]
fn test_registry_merges_listings_newest_first() {
    let dir = tempdir().unwrap();
    let project = project_dir(dir.path(), "repo");

    let claude_home = dir.path().join("claude-home");
    let flat = FlatLogStore::new(&claude_home);
    flat.write_session(
        &project,
        "claude-session",
        &[
            FlatLogStore::user_line("u1", "2025-01-15T09:00:00Z", "from claude"),
            FlatLogStore::assistant_text_line(
                "a1",
                "2025-01-15T09:30:00Z",
                "claude-sonnet-4",
                "ok",
                5,
                5,
            ),
        ],
    )
    .unwrap();

    let copilot_home = dir.path().join("copilot-home");
    let state = SessionStateStore::new(&copilot_home);
    state
        .write_workspace(
            "copilot-session",
            &project,
            &project,
            "main",
            "From copilot",
            "2025-01-15T10:00:00Z",
            "2025-01-15T11:00:00Z",
        )
        .unwrap();
    state
        .write_events(
            "copilot-session",
            &[SessionStateStore::user_event(
                "m1",
                "2025-01-15T10:00:00Z",
                "hello",
            )],
        )
        .unwrap();

    let registry = Registry::new(vec![
        Arc::new(ClaudeAdapter::with_home(claude_home)),
        Arc::new(CopilotAdapter::with_home(copilot_home)),
    ]);

    let available = registry.available(Path::new(&project));
    assert_eq!(available, ["claude", "copilot"]);

    let sessions = registry.sessions(Path::new(&project));
    assert_eq!(sessions.len(), 2);
    assert_eq!(sessions[0].adapter_id, "copilot");
    assert_eq!(sessions[1].adapter_id, "claude");

    let messages = registry
        .messages("claude", "claude-session")
        .unwrap();
    assert_eq!(messages.len(), 2);

    assert!(registry.messages("unknown", "x").is_err());
}

#[test]
fn test_registry_with_empty_stores_is_quiet() {
    let dir = tempdir().unwrap();
    let registry = Registry::new(vec![
        Arc::new(ClaudeAdapter::with_home(dir.path().join("a"))),
        Arc::new(CopilotAdapter::with_home(dir.path().join("b"))),
    ]);

    assert!(registry.available(Path::new("/nowhere")).is_empty());
    assert!(registry.sessions(Path::new("/nowhere")).is_empty());
}

#[test]
fn test_dispatcher_forwards_tagged_events() {
    let dir = tempdir().unwrap();
    let project = project_dir(dir.path(), "repo");

    let claude_home = dir.path().join("claude-home");
    let flat = FlatLogStore::new(&claude_home);
    flat.write_session(
        &project,
        "s1",
        &[FlatLogStore::user_line("u1", "2025-01-15T09:00:00Z", "start")],
    )
    .unwrap();

    let registry = Registry::new(vec![Arc::new(ClaudeAdapter::with_home(claude_home))]);
    let bus = Arc::new(EventBus::new());
    let subscription = bus.subscribe();

    let dispatcher = WatchDispatcher::start(&registry, Path::new(&project), Arc::clone(&bus));
    assert_eq!(dispatcher.watcher_count(), 1);
    std::thread::sleep(Duration::from_millis(100));

    flat.append_record(
        &project,
        "s1",
        &FlatLogStore::user_line("u2", "2025-01-15T09:01:00Z", "more"),
    )
    .unwrap();

    let event: BusEvent = subscription
        .events
        .recv_timeout(Duration::from_millis(800))
        .unwrap();
    assert_eq!(event.adapter_id, "claude");
    assert_eq!(event.change.session_id, "s1");

    dispatcher.stop();
}
