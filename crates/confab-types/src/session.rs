use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// A session is considered live while its log was touched within this window.
pub const ACTIVE_WINDOW_SECS: i64 = 300;

/// Which adapter operations a source supports.
///
/// A capability set rather than a hierarchy: consumers branch on the flags,
/// never on the concrete adapter type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub sessions: bool,
    pub messages: bool,
    pub usage: bool,
    pub watch: bool,
}

impl Capabilities {
    /// Everything: listing, message retrieval, token usage, live watch.
    pub const fn full() -> Self {
        Self {
            sessions: true,
            messages: true,
            usage: true,
            watch: true,
        }
    }
}

/// One conversation with one coding assistant, normalized for listing.
///
/// Constructed by an adapter during a `sessions(project)` call and not
/// mutated afterward. `id` is opaque and only meaningful together with
/// `adapter_id`.
#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: String,

    /// Display name: best human-readable label the source offers.
    pub name: String,

    /// Short slug derived from the source (project slug or id prefix).
    pub slug: String,

    /// Stable adapter identifier, used by consumers for routing.
    pub adapter_id: &'static str,
    pub adapter_icon: &'static str,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,

    /// Sum of all token counts attributed to the session (0 when the source
    /// exposes none).
    pub total_tokens: u64,

    /// Estimated cost in USD derived from per-model rates (0.0 when the
    /// source exposes no tokens).
    pub estimated_cost: f64,

    pub is_sub_agent: bool,
    pub message_count: usize,

    /// On-disk size of the backing log, when the source has a single one.
    pub file_size: Option<u64>,

    /// Path of the backing resource (log file, session directory, database).
    pub resource_path: Option<PathBuf>,
}

impl Session {
    /// `updated_at - created_at`. Non-negative by the listing invariant.
    pub fn duration(&self) -> Duration {
        self.updated_at - self.created_at
    }

    /// True iff the session was updated within the last five minutes of `now`.
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        now - self.updated_at < Duration::seconds(ACTIVE_WINDOW_SECS)
    }

    pub fn is_active(&self) -> bool {
        self.is_active_at(Utc::now())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_session() -> Session {
        Session {
            id: "abc123".to_string(),
            name: "Fix the build".to_string(),
            slug: "-home-u-repo".to_string(),
            adapter_id: "claude",
            adapter_icon: "✳",
            created_at: Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0).unwrap(),
            updated_at: Utc.with_ymd_and_hms(2025, 1, 15, 10, 0, 0).unwrap(),
            total_tokens: 1200,
            estimated_cost: 0.05,
            is_sub_agent: false,
            message_count: 4,
            file_size: Some(2048),
            resource_path: None,
        }
    }

    #[test]
    fn test_duration_is_updated_minus_created() {
        let session = sample_session();
        assert_eq!(session.duration(), Duration::hours(1));
    }

    #[test]
    fn test_is_active_within_window() {
        let session = sample_session();
        let just_after = session.updated_at + Duration::seconds(60);
        assert!(session.is_active_at(just_after));

        let much_later = session.updated_at + Duration::seconds(ACTIVE_WINDOW_SECS + 1);
        assert!(!session.is_active_at(much_later));
    }
}
