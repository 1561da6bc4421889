//! JSON-fragment storage tree, the fallback when the database is absent or
//! unreadable. One file per entity:
//!
//! ```text
//! storage/project/<project>.json
//! storage/session/<project>/<session>.json
//! storage/message/<session>/<message>.json
//! storage/part/<message>/<part>.json
//! ```

use serde::de::DeserializeOwned;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use super::schema::{MessageData, PartData, ProjectRecord, SessionRecord};

pub(crate) struct StorageTree {
    root: PathBuf,
}

impl StorageTree {
    pub fn new(data_dir: &Path) -> Self {
        Self {
            root: data_dir.join("storage"),
        }
    }

    pub fn exists(&self) -> bool {
        self.root.is_dir()
    }

    pub fn projects(&self) -> Vec<ProjectRecord> {
        read_dir_json(&self.root.join("project"))
    }

    pub fn sessions_for_project(&self, project_id: &str) -> Vec<SessionRecord> {
        read_dir_json(&self.root.join("session").join(project_id))
    }

    pub fn message_count(&self, session_id: &str) -> usize {
        let dir = self.root.join("message").join(session_id);
        fs::read_dir(&dir)
            .map(|entries| {
                entries
                    .filter_map(|e| e.ok())
                    .filter(|e| e.path().extension().is_some_and(|ext| ext == "json"))
                    .count()
            })
            .unwrap_or(0)
    }

    pub fn messages(&self, session_id: &str) -> Vec<(MessageData, Vec<PartData>)> {
        let mut messages: Vec<MessageData> =
            read_dir_json(&self.root.join("message").join(session_id));
        messages.sort_by(|a, b| {
            a.time_created
                .cmp(&b.time_created)
                .then_with(|| a.id.cmp(&b.id))
        });

        messages
            .into_iter()
            .map(|message| {
                let parts = self.parts_for_message(&message.id);
                (message, parts)
            })
            .collect()
    }

    fn parts_for_message(&self, message_id: &str) -> Vec<PartData> {
        let dir = self.root.join("part").join(message_id);
        let mut entries: Vec<PathBuf> = match fs::read_dir(&dir) {
            Ok(entries) => entries
                .filter_map(|e| e.ok())
                .map(|e| e.path())
                .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
                .collect(),
            Err(_) => return Vec::new(),
        };
        entries.sort();
        entries
            .iter()
            .filter_map(|path| read_json(path))
            .collect()
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let raw = fs::read_to_string(path).ok()?;
    match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(err) => {
            debug!(path = %path.display(), error = %err, "skipping bad fragment");
            None
        }
    }
}

/// Every decodable `*.json` in a directory; bad or unreadable entries are
/// skipped and enumeration continues.
fn read_dir_json<T: DeserializeOwned>(dir: &Path) -> Vec<T> {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(_) => return Vec::new(),
    };
    entries
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.extension().is_some_and(|ext| ext == "json"))
        .filter_map(|path| read_json(&path))
        .collect()
}
