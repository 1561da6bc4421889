use assert_cmd::Command;
use confab_testing::FlatLogStore;
use predicates::prelude::*;
use tempfile::tempdir;

/// Isolate every store lookup inside the temporary home.
fn confab(home: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("confab").unwrap();
    cmd.env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env("XDG_DATA_HOME", home.join(".local/share"));
    cmd
}

#[test]
fn test_detect_with_no_stores_prints_none() {
    let home = tempdir().unwrap();

    confab(home.path())
        .args(["detect", "--project", "/home/u/repo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("none"));
}

#[test]
fn test_sessions_lists_seeded_store() {
    let home = tempdir().unwrap();
    let store = FlatLogStore::new(&home.path().join(".claude"));
    store
        .write_session(
            "/home/u/repo",
            "abc12345",
            &[
                FlatLogStore::user_line("u1", "2025-01-15T09:00:00Z", "fix the parser"),
                FlatLogStore::assistant_text_line(
                    "a1",
                    "2025-01-15T09:05:00Z",
                    "claude-sonnet-4",
                    "done",
                    100,
                    50,
                ),
            ],
        )
        .unwrap();

    confab(home.path())
        .args(["sessions", "--project", "/home/u/repo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("fix the parser"))
        .stdout(predicate::str::contains("claude"));

    confab(home.path())
        .args(["detect", "--project", "/home/u/repo"])
        .assert()
        .success()
        .stdout(predicate::str::contains("claude"));
}

#[test]
fn test_messages_renders_tool_output() {
    let home = tempdir().unwrap();
    let store = FlatLogStore::new(&home.path().join(".claude"));
    store
        .write_session(
            "/home/u/repo",
            "abc12345",
            &[
                FlatLogStore::assistant_tool_use_line(
                    "a1",
                    "2025-01-15T09:00:00Z",
                    "t1",
                    "view",
                    serde_json::json!({}),
                ),
                FlatLogStore::tool_result_line("u1", "2025-01-15T09:00:05Z", "t1", "OK", false),
            ],
        )
        .unwrap();

    confab(home.path())
        .args(["messages", "claude", "abc12345"])
        .assert()
        .success()
        .stdout(predicate::str::contains("view (ok): OK"));
}

#[test]
fn test_unknown_adapter_fails() {
    let home = tempdir().unwrap();

    confab(home.path())
        .args(["messages", "vim", "whatever"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown adapter"));
}

#[test]
fn test_usage_reports_totals() {
    let home = tempdir().unwrap();
    let store = FlatLogStore::new(&home.path().join(".claude"));
    store
        .write_session(
            "/home/u/repo",
            "abc12345",
            &[FlatLogStore::assistant_text_line(
                "a1",
                "2025-01-15T09:00:00Z",
                "claude-sonnet-4",
                "hi",
                1000,
                250,
            )],
        )
        .unwrap();

    confab(home.path())
        .args(["usage", "claude", "abc12345"])
        .assert()
        .success()
        .stdout(predicate::str::contains("input:        1000"))
        .stdout(predicate::str::contains("total:        1250"));
}
