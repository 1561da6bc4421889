//! Testing infrastructure for confab integration tests.
//!
//! Builders that materialize realistic on-disk stores for each supported
//! source format under a caller-provided directory:
//! - `FlatLogStore`: per-project folders of JSONL session logs
//! - `SessionStateStore`: per-session directories with workspace.yaml +
//!   events.jsonl
//! - `OpencodeStore`: SQLite database and/or JSON-fragment storage tree

pub mod fixtures;

pub use fixtures::{FlatLogStore, OpencodeStore, SessionStateStore};
