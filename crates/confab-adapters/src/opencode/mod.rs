//! Adapter for the SQLite + JSON-fragment store
//! (`<data>/opencode.db` plus `<data>/storage/{project,session,message,part}`).
//!
//! Dual-path reads: when the database file is present it is the primary
//! source, and the JSON tree takes over on query error or empty result.
//! Without the database, the JSON tree is the only source.

mod db;
mod paths;
mod schema;
mod storage;

use crate::error::Result;
use crate::traits::{Adapter, sort_sessions};
use crate::watch::{self, FileOp, WatchHandle, WatchRules};
use chrono::{DateTime, TimeZone, Utc};
use confab_types::{
    Capabilities, ChangeEvent, ChangeKind, ContentBlock, Message, Role, Session, ToolUse,
    UsageStats, WatchScope,
};
use db::{Db, SessionRow};
use paths::DataDirHints;
use schema::{MessageData, PartData, ProjectRecord, SessionRecord};
use std::path::{Path, PathBuf};
use std::time::Duration;
use storage::StorageTree;
use tracing::debug;

const DB_FILE: &str = "opencode.db";
const DEBOUNCE_WINDOW: Duration = Duration::from_millis(150);

pub struct OpencodeAdapter {
    data_dir: PathBuf,
    db: Db,
    storage: StorageTree,
}

impl OpencodeAdapter {
    pub const ID: &'static str = "opencode";

    pub fn new() -> Self {
        let home = dirs::home_dir().unwrap_or_default();
        let data_dir = paths::discover_data_dir(&home, &DataDirHints::from_env());
        Self::with_data_dir(data_dir)
    }

    pub fn with_data_dir(data_dir: PathBuf) -> Self {
        Self {
            db: Db::new(data_dir.join(DB_FILE)),
            storage: StorageTree::new(&data_dir),
            data_dir,
        }
    }

    /// All known projects, database first, JSON tree as fallback.
    fn all_projects(&self) -> Vec<ProjectRecord> {
        if self.db.exists() {
            match self.db.projects() {
                Ok(projects) if !projects.is_empty() => return projects,
                Ok(_) => {}
                Err(err) => debug!(error = %err, "project query failed, using storage tree"),
            }
        }
        self.storage.projects()
    }

    /// Resolve a project root against the known worktrees: exact match
    /// first, then the closest worktree the root is strictly inside of
    /// (bare-repo layouts put `.bare`/worktree dirs under the registered
    /// root).
    fn resolve_project(&self, project_root: &Path) -> Option<ProjectRecord> {
        let root = clean_path(project_root);
        let projects = self.all_projects();

        if let Some(exact) = projects
            .iter()
            .find(|p| clean_path(Path::new(&p.worktree)) == root)
        {
            return Some(exact.clone());
        }

        projects.into_iter().find(|p| {
            let worktree = clean_path(Path::new(&p.worktree));
            root != worktree && root.starts_with(&worktree)
        })
    }

    /// Sibling worktrees of `main_worktree`, by the `repo` / `repo-<suffix>`
    /// basename convention. Database and JSON tree results are additive,
    /// deduplicated by cleaned path.
    pub fn discover_related_worktrees(&self, main_worktree: &Path) -> Vec<PathBuf> {
        let Some(repo_name) = main_worktree
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
        else {
            return Vec::new();
        };
        let prefix = format!("{}-", repo_name);

        let mut worktrees: Vec<String> = Vec::new();
        if self.db.exists()
            && let Ok(projects) = self.db.projects()
        {
            worktrees.extend(projects.into_iter().map(|p| p.worktree));
        }
        worktrees.extend(self.storage.projects().into_iter().map(|p| p.worktree));

        let mut related: Vec<PathBuf> = Vec::new();
        for worktree in worktrees {
            let path = clean_path(Path::new(&worktree));
            let Some(base) = path.file_name().map(|n| n.to_string_lossy().into_owned()) else {
                continue;
            };
            if (base == repo_name || base.starts_with(&prefix)) && !related.contains(&path) {
                related.push(path);
            }
        }
        related
    }

    fn session_rows(&self, project: &ProjectRecord) -> Vec<SessionRow> {
        if self.db.exists() {
            match self.db.sessions_for_project(&project.id) {
                Ok(rows) if !rows.is_empty() => return rows,
                Ok(_) => {}
                Err(err) => debug!(error = %err, "session query failed, using storage tree"),
            }
        }

        self.storage
            .sessions_for_project(&project.id)
            .into_iter()
            .map(|record| self.row_from_fragment(record))
            .collect()
    }

    fn row_from_fragment(&self, record: SessionRecord) -> SessionRow {
        let message_count = self.storage.message_count(&record.id);
        SessionRow {
            message_count,
            id: record.id,
            title: record.title,
            parent_id: record.parent_id,
            time_created: record.time_created,
            time_updated: record.time_updated,
        }
    }

    fn build_session(&self, row: SessionRow) -> Session {
        let name = row
            .title
            .clone()
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| row.id.chars().take(8).collect());

        let created_at = millis_to_datetime(row.time_created);
        Session {
            slug: row.id.chars().take(8).collect(),
            name,
            adapter_id: Self::ID,
            adapter_icon: "◆",
            created_at,
            updated_at: millis_to_datetime(row.time_updated).max(created_at),
            total_tokens: 0,
            estimated_cost: 0.0,
            is_sub_agent: row.parent_id.is_some(),
            message_count: row.message_count,
            file_size: self.db.file_size(),
            resource_path: Some(self.db.path().to_path_buf()),
            id: row.id,
        }
    }

    fn raw_messages(&self, session_id: &str) -> Vec<(MessageData, Vec<PartData>)> {
        if self.db.exists() {
            match self.db.messages(session_id) {
                Ok(rows) if !rows.is_empty() => return rows,
                Ok(_) => {}
                Err(err) => debug!(error = %err, "message query failed, using storage tree"),
            }
        }
        self.storage.messages(session_id)
    }
}

impl Default for OpencodeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Adapter for OpencodeAdapter {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn name(&self) -> &'static str {
        "OpenCode"
    }

    fn icon(&self) -> &'static str {
        "◆"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::full()
    }

    fn detect(&self, project_root: &Path) -> Result<bool> {
        if !self.data_dir.exists() {
            return Ok(false);
        }
        Ok(self.resolve_project(project_root).is_some())
    }

    fn sessions(&self, project_root: &Path) -> Result<Vec<Session>> {
        let Some(project) = self.resolve_project(project_root) else {
            return Ok(Vec::new());
        };

        let mut sessions: Vec<Session> = self
            .session_rows(&project)
            .into_iter()
            .map(|row| self.build_session(row))
            .collect();

        sort_sessions(&mut sessions);
        Ok(sessions)
    }

    fn messages(&self, session_id: &str) -> Result<Vec<Message>> {
        Ok(self
            .raw_messages(session_id)
            .into_iter()
            .map(|(data, parts)| assemble_message(data, parts))
            .collect())
    }

    fn usage(&self, session_id: &str) -> Result<UsageStats> {
        let messages = self.messages(session_id)?;
        Ok(UsageStats::from_messages(&messages))
    }

    /// Watches the database and its WAL sidecar. Writes cannot be mapped to
    /// a session from the outside, so events carry an empty session id.
    fn watch(&self, _project_root: &Path) -> Result<WatchHandle> {
        let rules = DatabaseRules {
            db_name: DB_FILE.to_string(),
            wal_name: format!("{}-wal", DB_FILE),
        };
        watch::spawn(
            vec![self.data_dir.clone()],
            Box::new(rules),
            DEBOUNCE_WINDOW,
        )
    }

    fn watch_scope(&self) -> WatchScope {
        WatchScope::Global
    }
}

fn millis_to_datetime(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_default()
}

/// Absolute, symlink-resolved, cleaned form of a path; falls back to the
/// input when resolution fails (e.g. the path no longer exists).
fn clean_path(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

/// Fold a message's parts into the normalized representation: texts
/// concatenate, tool parts become linked tool uses, file and patch parts
/// surface as reference lines.
fn assemble_message(data: MessageData, parts: Vec<PartData>) -> Message {
    let role = match data.role.as_deref() {
        Some("assistant") => Role::Assistant,
        _ => Role::User,
    };

    let mut message = Message::new(data.id, role, millis_to_datetime(data.time_created));
    message.model = data.model;
    if let Some(usage) = data.usage {
        message.usage = usage.to_usage();
    }

    let mut push_text = |message: &mut Message, text: String| {
        if !message.content.is_empty() {
            message.content.push('\n');
        }
        message.content.push_str(&text);
        message.blocks.push(ContentBlock::Text { text });
    };

    for part in parts {
        match part {
            PartData::Text { text } => push_text(&mut message, text),
            PartData::Tool {
                call_id,
                tool,
                state,
            } => {
                let id = call_id.unwrap_or_else(|| format!("tool-{}", message.tool_uses.len()));
                let is_error = state.status.as_deref() == Some("error");
                message.blocks.push(ContentBlock::ToolUse {
                    id: id.clone(),
                    name: tool.clone(),
                });
                message.tool_uses.push(ToolUse {
                    id,
                    name: tool,
                    input: state
                        .input
                        .map(|v| v.to_string())
                        .unwrap_or_else(|| "{}".to_string()),
                    output: state.output.unwrap_or_default(),
                    is_error,
                });
            }
            PartData::File { filename, url } => {
                let label = filename.or(url).unwrap_or_default();
                push_text(&mut message, format!("[file: {}]", label));
            }
            PartData::Patch { files } => {
                push_text(&mut message, format!("[patch: {}]", files.join(", ")));
            }
            PartData::Unknown => {}
        }
    }

    message
}

struct DatabaseRules {
    db_name: String,
    wal_name: String,
}

impl WatchRules for DatabaseRules {
    fn admits(&self, path: &Path) -> bool {
        path.file_name()
            .is_some_and(|name| name == self.db_name.as_str() || name == self.wal_name.as_str())
    }

    fn classify(&self, _path: &Path, op: FileOp) -> Option<ChangeEvent> {
        match op {
            FileOp::Remove => None,
            _ => Some(ChangeEvent::unscoped(ChangeKind::SessionUpdated)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_millis_conversion() {
        let ts = millis_to_datetime(1_736_935_200_000);
        assert_eq!(ts.timestamp_millis(), 1_736_935_200_000);
    }

    #[test]
    fn test_database_rules_admit_db_and_wal_only() {
        let rules = DatabaseRules {
            db_name: DB_FILE.to_string(),
            wal_name: format!("{}-wal", DB_FILE),
        };
        assert!(rules.admits(Path::new("/d/opencode.db")));
        assert!(rules.admits(Path::new("/d/opencode.db-wal")));
        assert!(!rules.admits(Path::new("/d/opencode.db-shm")));
    }

    #[test]
    fn test_assemble_message_with_parts() {
        let data: MessageData = serde_json::from_str(
            r#"{"id":"m1","role":"assistant","time_created":1000,"usage":{"input":10,"output":5}}"#,
        )
        .unwrap();
        let parts = vec![
            serde_json::from_str::<PartData>(r#"{"type":"text","text":"Applying"}"#).unwrap(),
            serde_json::from_str::<PartData>(
                r#"{"type":"tool","callID":"c1","tool":"edit","state":{"status":"completed","output":"ok"}}"#,
            )
            .unwrap(),
            serde_json::from_str::<PartData>(r#"{"type":"patch","files":["a.rs","b.rs"]}"#)
                .unwrap(),
        ];

        let message = assemble_message(data, parts);
        assert_eq!(message.role, Role::Assistant);
        assert_eq!(message.tool_uses.len(), 1);
        assert_eq!(message.tool_uses[0].output, "ok");
        assert!(message.content.contains("[patch: a.rs, b.rs]"));
        assert_eq!(message.usage.input, 10);
    }
}
