use serde::{Deserialize, Serialize};

/// Logical change observed on a session store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeKind {
    SessionCreated,
    SessionUpdated,
    MessageAdded,
}

/// Change notification emitted by a watcher.
///
/// Events are hints, not the source of truth: they may be coalesced and
/// dropped under load, and consumers re-query on receipt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub kind: ChangeKind,

    /// Session the change belongs to. Empty when the underlying source
    /// groups updates at file level (e.g. a database write).
    pub session_id: String,
}

impl ChangeEvent {
    pub fn new(kind: ChangeKind, session_id: impl Into<String>) -> Self {
        Self {
            kind,
            session_id: session_id.into(),
        }
    }

    /// A change that cannot be attributed to a single session.
    pub fn unscoped(kind: ChangeKind) -> Self {
        Self {
            kind,
            session_id: String::new(),
        }
    }
}

/// Whether an adapter's watcher observes a project-local directory or a
/// global state tree. Global watchers must filter events by project before
/// emission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatchScope {
    Project,
    Global,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_kind_serializes_kebab_case() {
        let json = serde_json::to_string(&ChangeKind::MessageAdded).unwrap();
        assert_eq!(json, "\"message-added\"");
    }

    #[test]
    fn test_unscoped_event_has_empty_session() {
        let event = ChangeEvent::unscoped(ChangeKind::SessionUpdated);
        assert!(event.session_id.is_empty());
    }
}
