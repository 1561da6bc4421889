use serde::Deserialize;
use serde_json::Value;

/// One line of a session log. Record types other than user/assistant are
/// tolerated and ignored.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum LogRecord {
    User(TurnRecord),
    Assistant(TurnRecord),
    System(TurnRecord),
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TurnRecord {
    #[serde(default)]
    pub uuid: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,

    // Header fields; any record may carry them, the first occurrence wins.
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub git_branch: Option<String>,
    #[serde(default)]
    pub slug: Option<String>,

    #[serde(default)]
    pub message: Option<TurnMessage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TurnMessage {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub content: ContentField,
    #[serde(default)]
    pub usage: Option<UsageRecord>,
}

/// `message.content` is either a bare string or an array of typed blocks.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ContentField {
    Text(String),
    Blocks(Vec<Block>),
}

impl Default for ContentField {
    fn default() -> Self {
        ContentField::Blocks(Vec::new())
    }
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum Block {
    Text {
        text: String,
    },
    Thinking {
        thinking: String,
    },
    ToolUse {
        id: String,
        name: String,
        #[serde(default)]
        input: Value,
    },
    ToolResult {
        tool_use_id: String,
        #[serde(default)]
        content: Option<Value>,
        #[serde(default)]
        is_error: bool,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub(crate) struct UsageRecord {
    #[serde(default)]
    pub input_tokens: u64,
    #[serde(default)]
    pub output_tokens: u64,
    #[serde(default)]
    pub cache_read_input_tokens: u64,
    #[serde(default)]
    pub cache_creation_input_tokens: u64,
}

impl UsageRecord {
    pub fn to_usage(self) -> confab_types::TokenUsage {
        confab_types::TokenUsage {
            input: self.input_tokens,
            output: self.output_tokens,
            cache_read: self.cache_read_input_tokens,
            cache_write: self.cache_creation_input_tokens,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_content_decodes() {
        let line = r#"{"type":"user","uuid":"u1","timestamp":"2025-01-15T10:00:00Z","message":{"role":"user","content":"hello"}}"#;
        let record: LogRecord = serde_json::from_str(line).unwrap();
        match record {
            LogRecord::User(turn) => match turn.message.unwrap().content {
                ContentField::Text(text) => assert_eq!(text, "hello"),
                _ => panic!("expected bare string content"),
            },
            _ => panic!("expected user record"),
        }
    }

    #[test]
    fn test_block_content_decodes() {
        let line = r#"{"type":"assistant","uuid":"a1","timestamp":"2025-01-15T10:00:01Z","message":{"role":"assistant","model":"claude-sonnet-4","content":[{"type":"tool_use","id":"t1","name":"view","input":{}}],"usage":{"input_tokens":5,"output_tokens":2}}}"#;
        let record: LogRecord = serde_json::from_str(line).unwrap();
        match record {
            LogRecord::Assistant(turn) => {
                let message = turn.message.unwrap();
                match message.content {
                    ContentField::Blocks(blocks) => {
                        assert!(matches!(blocks[0], Block::ToolUse { .. }))
                    }
                    _ => panic!("expected blocks"),
                }
                assert_eq!(message.usage.unwrap().input_tokens, 5);
            }
            _ => panic!("expected assistant record"),
        }
    }

    #[test]
    fn test_unknown_record_type_tolerated() {
        let line = r#"{"type":"summary","summary":"whatever"}"#;
        let record: LogRecord = serde_json::from_str(line).unwrap();
        assert!(matches!(record, LogRecord::Unknown));
    }

    #[test]
    fn test_unknown_block_type_tolerated() {
        let line = r#"{"type":"user","message":{"role":"user","content":[{"type":"image","source":{}}]}}"#;
        let record: LogRecord = serde_json::from_str(line).unwrap();
        match record {
            LogRecord::User(turn) => match turn.message.unwrap().content {
                ContentField::Blocks(blocks) => assert!(matches!(blocks[0], Block::Unknown)),
                _ => panic!("expected blocks"),
            },
            _ => panic!("expected user record"),
        }
    }
}
