//! Adapter for per-session state directories
//! (`<home>/.copilot/session-state/<id>/{workspace.yaml, events.jsonl}`).
//!
//! A session belongs to a project when its workspace's `git_root` or `cwd`
//! equals the project root. The events log is parsed incrementally through
//! the message cache: an appended file resumes from the cached byte offset
//! instead of being re-read.

mod parser;
mod schema;

use crate::cache::{CachedMessages, FileStamp, MessageCache, MessageCacheProbe, StampedCache};
use crate::error::Result;
use crate::scan::{BufferPool, RecordReader};
use crate::traits::{Adapter, is_not_found, sort_sessions};
use crate::watch::{self, FileOp, WatchHandle, WatchRules};
use chrono::{DateTime, Utc};
use confab_types::{
    Capabilities, ChangeEvent, ChangeKind, Message, Role, Session, UsageStats, WatchScope,
    truncate_title,
};
use schema::Workspace;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const WORKSPACE_FILE: &str = "workspace.yaml";
const EVENTS_FILE: &str = "events.jsonl";
const WORKSPACE_CACHE_CAPACITY: usize = 256;
const DEBOUNCE_WINDOW: Duration = Duration::from_millis(120);
const NAME_MAX_CHARS: usize = 50;

pub struct CopilotAdapter {
    home: PathBuf,
    workspaces: Arc<StampedCache<Workspace>>,
    messages: MessageCache,
    pool: BufferPool,
}

impl CopilotAdapter {
    pub const ID: &'static str = "copilot";

    pub fn new() -> Self {
        let home = dirs::home_dir().unwrap_or_default().join(".copilot");
        Self::with_home(home)
    }

    pub fn with_home(home: PathBuf) -> Self {
        Self {
            home,
            workspaces: Arc::new(StampedCache::new(WORKSPACE_CACHE_CAPACITY)),
            messages: MessageCache::default(),
            pool: BufferPool::new(),
        }
    }

    fn state_dir(&self) -> PathBuf {
        self.home.join("session-state")
    }

    fn session_dir(&self, session_id: &str) -> PathBuf {
        self.state_dir().join(session_id)
    }

    fn load_workspace(&self, session_dir: &Path) -> Option<Workspace> {
        load_workspace_cached(&self.workspaces, session_dir)
    }

    /// Incremental load of one session's events log through the cache.
    fn load_messages(&self, events_path: &Path) -> Result<CachedMessages> {
        let stamp = match FileStamp::read(events_path) {
            Ok(stamp) => stamp,
            Err(err) if is_not_found(&err) => return Ok(CachedMessages::default()),
            Err(err) => return Err(err.into()),
        };

        let mut state = match self.messages.probe(events_path, stamp) {
            MessageCacheProbe::Fresh(state) => return Ok(state),
            MessageCacheProbe::Grown(state) => state,
            MessageCacheProbe::Stale => CachedMessages::default(),
        };

        let mut reader = RecordReader::open(events_path, state.offset, &self.pool)?;
        parser::apply_events(&mut state, &mut reader)?;

        self.messages.store(events_path, stamp, state.clone());
        Ok(state)
    }

    fn build_session(
        &self,
        session_id: String,
        session_dir: &Path,
        workspace: &Workspace,
    ) -> Result<Session> {
        let events_path = session_dir.join(EVENTS_FILE);
        let state = self.load_messages(&events_path)?;

        let file_stamp = FileStamp::read(&events_path).ok();
        let fallback: DateTime<Utc> = file_stamp
            .map(|stamp| stamp.mtime.into())
            .unwrap_or_default();

        let created_at = workspace
            .created_at
            .as_deref()
            .and_then(rfc3339)
            .unwrap_or(fallback);
        let updated_at = workspace
            .updated_at
            .as_deref()
            .and_then(rfc3339)
            .unwrap_or(fallback)
            .max(created_at);

        let name = workspace
            .summary
            .clone()
            .filter(|s| !s.is_empty())
            .or_else(|| {
                state
                    .messages
                    .iter()
                    .find(|m| m.role == Role::User && !m.content.is_empty())
                    .map(|m| truncate_title(&m.content, NAME_MAX_CHARS))
            })
            .unwrap_or_else(|| session_id.chars().take(8).collect());

        Ok(Session {
            slug: workspace
                .branch
                .clone()
                .unwrap_or_else(|| session_id.chars().take(8).collect()),
            name,
            adapter_id: Self::ID,
            adapter_icon: "⧉",
            created_at,
            updated_at,
            total_tokens: 0,
            estimated_cost: 0.0,
            is_sub_agent: false,
            message_count: state.messages.len(),
            file_size: file_stamp.map(|stamp| stamp.size),
            resource_path: Some(session_dir.to_path_buf()),
            id: session_id,
        })
    }
}

impl Default for CopilotAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Adapter for CopilotAdapter {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn name(&self) -> &'static str {
        "Copilot CLI"
    }

    fn icon(&self) -> &'static str {
        "⧉"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities {
            sessions: true,
            messages: true,
            usage: true,
            watch: true,
        }
    }

    fn detect(&self, project_root: &Path) -> Result<bool> {
        Ok(!self.sessions(project_root)?.is_empty())
    }

    fn sessions(&self, project_root: &Path) -> Result<Vec<Session>> {
        let state_dir = self.state_dir();
        let entries = match fs::read_dir(&state_dir) {
            Ok(entries) => entries,
            Err(err) if is_not_found(&err) => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let project = canonical(project_root);
        let mut sessions = Vec::new();

        for entry in entries.filter_map(|e| e.ok()) {
            let session_dir = entry.path();
            if !session_dir.is_dir() {
                continue;
            }
            let Some(workspace) = self.load_workspace(&session_dir) else {
                continue;
            };
            if !workspace_matches(&workspace, &project) {
                continue;
            }

            let session_id = workspace.id.clone().unwrap_or_else(|| {
                session_dir
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_default()
            });

            match self.build_session(session_id, &session_dir, &workspace) {
                Ok(session) => sessions.push(session),
                Err(err) => {
                    debug!(dir = %session_dir.display(), error = %err, "skipping session");
                }
            }
        }

        sort_sessions(&mut sessions);
        Ok(sessions)
    }

    fn messages(&self, session_id: &str) -> Result<Vec<Message>> {
        let events_path = self.session_dir(session_id).join(EVENTS_FILE);
        Ok(self.load_messages(&events_path)?.messages)
    }

    fn usage(&self, session_id: &str) -> Result<UsageStats> {
        // The events log carries no token counts; only the message count is
        // meaningful here.
        let messages = self.messages(session_id)?;
        Ok(UsageStats::from_messages(&messages))
    }

    /// Watches the whole state tree; events for sessions of other projects
    /// are suppressed before emission.
    fn watch(&self, project_root: &Path) -> Result<WatchHandle> {
        let rules = StateTreeRules {
            project: canonical(project_root),
            workspaces: Arc::clone(&self.workspaces),
        };
        watch::spawn(vec![self.state_dir()], Box::new(rules), DEBOUNCE_WINDOW)
    }

    fn watch_scope(&self) -> WatchScope {
        WatchScope::Global
    }
}

fn rfc3339(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

pub(crate) fn canonical(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| path.to_path_buf())
}

fn workspace_matches(workspace: &Workspace, project: &Path) -> bool {
    let matches = |field: &Option<String>| {
        field
            .as_deref()
            .is_some_and(|root| canonical(Path::new(root)) == *project)
    };
    matches(&workspace.git_root) || matches(&workspace.cwd)
}

fn load_workspace_cached(
    cache: &StampedCache<Workspace>,
    session_dir: &Path,
) -> Option<Workspace> {
    let workspace_path = session_dir.join(WORKSPACE_FILE);
    let stamp = FileStamp::read(&workspace_path).ok()?;

    if let Some(workspace) = cache.get(&workspace_path, stamp) {
        return Some(workspace);
    }

    let raw = fs::read_to_string(&workspace_path).ok()?;
    match serde_yaml::from_str::<Workspace>(&raw) {
        Ok(workspace) => {
            cache.put(&workspace_path, stamp, workspace.clone());
            Some(workspace)
        }
        Err(err) => {
            debug!(path = %workspace_path.display(), error = %err, "bad workspace file");
            None
        }
    }
}

/// Global-scope rules: admit only the two expected basenames, then check
/// that the session's workspace points at the watched project.
struct StateTreeRules {
    project: PathBuf,
    workspaces: Arc<StampedCache<Workspace>>,
}

impl StateTreeRules {
    fn session_matches(&self, session_dir: &Path) -> bool {
        load_workspace_cached(&self.workspaces, session_dir)
            .is_some_and(|workspace| workspace_matches(&workspace, &self.project))
    }
}

impl WatchRules for StateTreeRules {
    fn admits(&self, path: &Path) -> bool {
        path.file_name()
            .is_some_and(|name| name == WORKSPACE_FILE || name == EVENTS_FILE)
    }

    fn classify(&self, path: &Path, op: FileOp) -> Option<ChangeEvent> {
        let session_dir = path.parent()?;
        let session_id = session_dir.file_name()?.to_string_lossy().into_owned();

        let is_workspace = path.file_name().is_some_and(|n| n == WORKSPACE_FILE);

        // A workspace file just being created may be the only project
        // evidence there is; everything else must match the project.
        if !self.session_matches(session_dir) && !(is_workspace && op == FileOp::Create) {
            return None;
        }

        let kind = if is_workspace {
            match op {
                FileOp::Create => ChangeKind::SessionCreated,
                _ => ChangeKind::SessionUpdated,
            }
        } else {
            match op {
                FileOp::Remove => return None,
                _ => ChangeKind::MessageAdded,
            }
        };

        Some(ChangeEvent::new(kind, session_id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_match_on_either_field() {
        let project = PathBuf::from("/home/u/repo");
        let by_git = Workspace {
            git_root: Some("/home/u/repo".to_string()),
            ..Default::default()
        };
        let by_cwd = Workspace {
            cwd: Some("/home/u/repo".to_string()),
            ..Default::default()
        };
        let neither = Workspace {
            cwd: Some("/home/u/other".to_string()),
            ..Default::default()
        };

        assert!(workspace_matches(&by_git, &project));
        assert!(workspace_matches(&by_cwd, &project));
        assert!(!workspace_matches(&neither, &project));
    }

    #[test]
    fn test_rules_admit_expected_basenames_only() {
        let rules = StateTreeRules {
            project: PathBuf::from("/p"),
            workspaces: Arc::new(StampedCache::new(4)),
        };
        assert!(rules.admits(Path::new("/s/abc/events.jsonl")));
        assert!(rules.admits(Path::new("/s/abc/workspace.yaml")));
        assert!(!rules.admits(Path::new("/s/abc/notes.txt")));
    }
}
