use crate::error::Result;
use crate::watch::WatchHandle;
use confab_types::{Capabilities, Message, Session, UsageStats, WatchScope};
use std::path::Path;

/// One assistant's on-disk store, normalized.
///
/// Responsibilities:
/// - Locate sessions belonging to a project root
/// - Parse raw records into the shared session/message model
/// - Surface live changes through a watch channel
///
/// All methods are safe for concurrent invocation; internal caches mutate
/// under locks local to the adapter. Absence of the backing store is an
/// empty result, never an error.
pub trait Adapter: Send + Sync {
    /// Stable adapter ID used by consumers for routing (e.g. "claude")
    fn id(&self) -> &'static str;

    /// Human-readable source name for display
    fn name(&self) -> &'static str;

    /// Single-glyph icon for display
    fn icon(&self) -> &'static str;

    /// Which operations this source supports
    fn capabilities(&self) -> Capabilities;

    /// Whether the source has any sessions for the project.
    /// Fails only on I/O errors other than not-found.
    fn detect(&self, project_root: &Path) -> Result<bool>;

    /// All sessions for the project, sorted by `updated_at` descending
    fn sessions(&self, project_root: &Path) -> Result<Vec<Session>>;

    /// All messages of one session, ascending by timestamp, with tool
    /// outputs already linked to their tool uses
    fn messages(&self, session_id: &str) -> Result<Vec<Message>>;

    /// Aggregate token counts; zero when the source exposes none
    fn usage(&self, session_id: &str) -> Result<UsageStats>;

    /// Open a change stream for the project. The returned handle's closer
    /// stops the watch and closes the channel after draining.
    fn watch(&self, project_root: &Path) -> Result<WatchHandle>;

    /// Whether `watch` observes a project-local directory or a global
    /// state tree whose events are filtered per project.
    fn watch_scope(&self) -> WatchScope {
        WatchScope::Project
    }
}

/// Order sessions the way every listing returns them: newest first, with
/// source order preserved among equal timestamps.
pub fn sort_sessions(sessions: &mut [Session]) {
    sessions.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
}

/// Whether an I/O error means "the source simply is not there".
pub(crate) fn is_not_found(err: &std::io::Error) -> bool {
    err.kind() == std::io::ErrorKind::NotFound
}
