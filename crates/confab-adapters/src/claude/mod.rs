//! Adapter for per-project folders of append-only JSONL session logs
//! (`<home>/.claude/projects/<slug>/<session>.jsonl`).

mod parser;
mod schema;

use crate::cache::{FileStamp, StampedCache};
use crate::error::Result;
use crate::pricing;
use crate::scan::BufferPool;
use crate::traits::{Adapter, is_not_found, sort_sessions};
use crate::watch::{self, FileOp, WatchHandle, WatchRules};
use chrono::{DateTime, Utc};
use confab_types::{
    Capabilities, ChangeEvent, ChangeKind, Message, Session, UsageStats, truncate_title,
};
use parser::SessionMeta;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use std::time::Duration;
use tracing::debug;
use walkdir::WalkDir;

const META_CACHE_CAPACITY: usize = 256;
const DEBOUNCE_WINDOW: Duration = Duration::from_millis(100);
const NAME_MAX_CHARS: usize = 50;

/// Filename prefix marking sessions spawned by another session's tool call.
const SUB_AGENT_PREFIX: &str = "agent-";

pub struct ClaudeAdapter {
    home: PathBuf,
    meta_cache: StampedCache<SessionMeta>,
    // session id → log path, rebuilt and swapped wholesale by `sessions`.
    index: RwLock<HashMap<String, PathBuf>>,
    pool: BufferPool,
}

impl ClaudeAdapter {
    pub const ID: &'static str = "claude";

    pub fn new() -> Self {
        let home = dirs::home_dir().unwrap_or_default().join(".claude");
        Self::with_home(home)
    }

    /// Construct against an explicit tool home (tests, config overrides).
    pub fn with_home(home: PathBuf) -> Self {
        Self {
            home,
            meta_cache: StampedCache::new(META_CACHE_CAPACITY),
            index: RwLock::new(HashMap::new()),
            pool: BufferPool::new(),
        }
    }

    fn projects_dir(&self) -> PathBuf {
        self.home.join("projects")
    }

    /// The store names project folders after the absolute project path with
    /// path separators replaced by dashes.
    pub fn project_slug(project_root: &Path) -> String {
        project_root
            .to_string_lossy()
            .replace(['/', '\\'], "-")
    }

    fn project_dir(&self, project_root: &Path) -> PathBuf {
        self.projects_dir().join(Self::project_slug(project_root))
    }

    fn session_path(&self, session_id: &str) -> Option<PathBuf> {
        if let Some(path) = self.index.read().unwrap().get(session_id) {
            return Some(path.clone());
        }
        self.scan_for_session(session_id)
    }

    /// Fallback lookup for ids queried before any `sessions` call.
    fn scan_for_session(&self, session_id: &str) -> Option<PathBuf> {
        for entry in WalkDir::new(self.projects_dir())
            .max_depth(2)
            .into_iter()
            .filter_map(|e| e.ok())
        {
            let path = entry.path();
            if path.extension().is_some_and(|e| e == "jsonl")
                && path.file_stem().is_some_and(|stem| stem == session_id)
            {
                return Some(path.to_path_buf());
            }
        }
        None
    }

    fn build_session(
        &self,
        id: String,
        path: &Path,
        stamp: FileStamp,
        meta: &SessionMeta,
    ) -> Session {
        let mtime: DateTime<Utc> = stamp.mtime.into();
        let created_at = meta.first_timestamp.unwrap_or(mtime);
        // Clock skew in the log must not produce a negative duration.
        let updated_at = meta.last_timestamp.unwrap_or(mtime).max(created_at);

        let name = meta
            .first_user_message
            .as_deref()
            .map(|text| truncate_title(text, NAME_MAX_CHARS))
            .filter(|title| !title.is_empty())
            .or_else(|| meta.slug.clone())
            .unwrap_or_else(|| id.chars().take(8).collect());

        let slug = meta
            .slug
            .clone()
            .unwrap_or_else(|| id.chars().take(8).collect());

        let total_tokens = meta
            .usage_by_model
            .values()
            .map(|usage| usage.total())
            .sum();

        Session {
            is_sub_agent: id.starts_with(SUB_AGENT_PREFIX),
            name,
            slug,
            adapter_id: Self::ID,
            adapter_icon: "✳",
            created_at,
            updated_at,
            total_tokens,
            estimated_cost: pricing::estimate_cost(&meta.usage_by_model),
            message_count: meta.message_count,
            file_size: Some(stamp.size),
            resource_path: Some(path.to_path_buf()),
            id,
        }
    }
}

impl Default for ClaudeAdapter {
    fn default() -> Self {
        Self::new()
    }
}

impl Adapter for ClaudeAdapter {
    fn id(&self) -> &'static str {
        Self::ID
    }

    fn name(&self) -> &'static str {
        "Claude Code"
    }

    fn icon(&self) -> &'static str {
        "✳"
    }

    fn capabilities(&self) -> Capabilities {
        Capabilities::full()
    }

    fn detect(&self, project_root: &Path) -> Result<bool> {
        let dir = self.project_dir(project_root);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if is_not_found(&err) => return Ok(false),
            Err(err) => return Err(err.into()),
        };
        for entry in entries.filter_map(|e| e.ok()) {
            if entry.path().extension().is_some_and(|e| e == "jsonl") {
                return Ok(true);
            }
        }
        Ok(false)
    }

    fn sessions(&self, project_root: &Path) -> Result<Vec<Session>> {
        let dir = self.project_dir(project_root);
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(err) if is_not_found(&err) => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let mut sessions = Vec::new();
        let mut index = HashMap::new();

        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.extension().is_none_or(|e| e != "jsonl") {
                continue;
            }
            let Some(id) = path.file_stem().map(|s| s.to_string_lossy().into_owned()) else {
                continue;
            };
            let Ok(stamp) = FileStamp::read(&path) else {
                continue;
            };

            let meta = match self.meta_cache.get(&path, stamp) {
                Some(meta) => meta,
                None => match parser::parse_session_meta(&path, &self.pool) {
                    Ok(meta) => {
                        self.meta_cache.put(&path, stamp, meta.clone());
                        meta
                    }
                    Err(err) => {
                        debug!(path = %path.display(), error = %err, "skipping unreadable session");
                        continue;
                    }
                },
            };

            index.insert(id.clone(), path.clone());
            sessions.push(self.build_session(id, &path, stamp, &meta));
        }

        *self.index.write().unwrap() = index;

        sort_sessions(&mut sessions);
        Ok(sessions)
    }

    fn messages(&self, session_id: &str) -> Result<Vec<Message>> {
        let Some(path) = self.session_path(session_id) else {
            return Ok(Vec::new());
        };
        let before = match FileStamp::read(&path) {
            Ok(stamp) => stamp,
            Err(err) if is_not_found(&err) => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };

        let messages = parser::parse_messages(&path, &self.pool)?;

        // The file may have been appended to while we were reading it; the
        // cached listing summary is then out of date.
        let drifted = FileStamp::read(&path)
            .map(|after| after != before)
            .unwrap_or(true);
        if drifted {
            self.meta_cache.invalidate(&path);
        }

        Ok(messages)
    }

    fn usage(&self, session_id: &str) -> Result<UsageStats> {
        let messages = self.messages(session_id)?;
        Ok(UsageStats::from_messages(&messages))
    }

    fn watch(&self, project_root: &Path) -> Result<WatchHandle> {
        let dir = self.project_dir(project_root);
        watch::spawn(vec![dir], Box::new(SessionFileRules), DEBOUNCE_WINDOW)
    }
}

/// Project-scoped rules: every `<id>.jsonl` in the watched folder belongs to
/// the project, so no filtering beyond the extension is needed.
struct SessionFileRules;

impl WatchRules for SessionFileRules {
    fn admits(&self, path: &Path) -> bool {
        path.extension().is_some_and(|e| e == "jsonl")
    }

    fn classify(&self, path: &Path, op: FileOp) -> Option<ChangeEvent> {
        let session_id = path.file_stem()?.to_string_lossy().into_owned();
        let kind = match op {
            FileOp::Create => ChangeKind::SessionCreated,
            FileOp::Modify => ChangeKind::MessageAdded,
            FileOp::Remove => ChangeKind::SessionUpdated,
        };
        Some(ChangeEvent::new(kind, session_id))
    }
}
