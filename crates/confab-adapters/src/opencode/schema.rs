//! Entity shapes shared by the JSON storage tree and the `data` columns of
//! the database. Field aliases cover the camelCase spellings newer versions
//! write.

use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ProjectRecord {
    pub id: String,

    /// Absolute path of the project root this tool tracks.
    pub worktree: String,

    #[serde(default)]
    #[allow(dead_code)]
    pub sandboxes: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct SessionRecord {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default, alias = "parentID")]
    pub parent_id: Option<String>,
    #[serde(default, alias = "projectID")]
    #[allow(dead_code)]
    pub project_id: Option<String>,
    #[serde(default, alias = "timeCreated")]
    pub time_created: i64,
    #[serde(default, alias = "timeUpdated")]
    pub time_updated: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct MessageData {
    pub id: String,
    #[serde(default, alias = "sessionID")]
    #[allow(dead_code)]
    pub session_id: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default, alias = "modelID")]
    pub model: Option<String>,
    #[serde(default, alias = "timeCreated")]
    pub time_created: i64,
    #[serde(default)]
    pub usage: Option<UsageData>,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub(crate) struct UsageData {
    #[serde(default)]
    pub input: u64,
    #[serde(default)]
    pub output: u64,
    #[serde(default, alias = "cacheRead")]
    pub cache_read: u64,
    #[serde(default, alias = "cacheWrite")]
    pub cache_write: u64,
}

impl UsageData {
    pub fn to_usage(self) -> confab_types::TokenUsage {
        confab_types::TokenUsage {
            input: self.input,
            output: self.output,
            cache_read: self.cache_read,
            cache_write: self.cache_write,
        }
    }
}

/// A message part, classified by its `type`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum PartData {
    Text {
        #[serde(default)]
        text: String,
    },
    Tool {
        #[serde(default, alias = "callID")]
        call_id: Option<String>,
        #[serde(default)]
        tool: String,
        #[serde(default)]
        state: ToolState,
    },
    File {
        #[serde(default)]
        filename: Option<String>,
        #[serde(default)]
        url: Option<String>,
    },
    Patch {
        #[serde(default)]
        files: Vec<String>,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct ToolState {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub input: Option<Value>,
    #[serde(default)]
    pub output: Option<String>,
}
