use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Role of a normalized message. Sources emit more record types; anything
/// that is not a user or assistant turn is dropped at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Assistant,
}

/// Token counts attached to a single assistant turn.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub input: u64,
    pub output: u64,
    pub cache_read: u64,
    pub cache_write: u64,
}

impl TokenUsage {
    pub fn total(&self) -> u64 {
        self.input + self.output + self.cache_read + self.cache_write
    }

    pub fn accumulate(&mut self, other: &TokenUsage) {
        self.input += other.input;
        self.output += other.output;
        self.cache_read += other.cache_read;
        self.cache_write += other.cache_write;
    }
}

/// A tool invocation made by the assistant. `output` and `is_error` stay
/// empty until the matching result record is ingested.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolUse {
    pub id: String,
    pub name: String,

    /// Serialized JSON arguments, as found in the log.
    pub input: String,

    /// Textual output from the linked tool result. Empty until linked.
    pub output: String,
    pub is_error: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThinkingBlock {
    pub text: String,
}

/// One content block of a message, preserving original block order.
///
/// The raw `content` field of upstream records is either a bare string or a
/// tagged array; it is decoded into this variant exactly once at parse time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    Thinking { text: String },
    ToolUse { id: String, name: String },
    ToolResult { tool_use_id: String, is_error: bool },
}

/// Position of a tool use inside a message list.
///
/// Results are attached through indices rather than pointers so the message
/// list stays serializable and free of ownership cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolUseRef {
    pub message: usize,
    pub tool_use: usize,
    pub block: usize,
}

/// One normalized conversation turn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub timestamp: DateTime<Utc>,
    pub model: Option<String>,

    /// Concatenated text blocks.
    pub content: String,

    pub tool_uses: Vec<ToolUse>,
    pub thinking: Vec<ThinkingBlock>,

    /// All blocks in source order, for faithful rendering.
    pub blocks: Vec<ContentBlock>,

    pub usage: TokenUsage,
}

impl Message {
    pub fn new(id: impl Into<String>, role: Role, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            role,
            timestamp,
            model: None,
            content: String::new(),
            tool_uses: Vec::new(),
            thinking: Vec::new(),
            blocks: Vec::new(),
            usage: TokenUsage::default(),
        }
    }
}

/// Aggregated token usage over one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageStats {
    pub input_tokens: u64,
    pub output_tokens: u64,
    pub cache_read_tokens: u64,
    pub cache_write_tokens: u64,
    pub message_count: usize,
}

impl UsageStats {
    /// Fold a message list into aggregate counts.
    pub fn from_messages(messages: &[Message]) -> Self {
        let mut stats = Self::default();
        for message in messages {
            stats.input_tokens += message.usage.input;
            stats.output_tokens += message.usage.output;
            stats.cache_read_tokens += message.usage.cache_read;
            stats.cache_write_tokens += message.usage.cache_write;
            stats.message_count += 1;
        }
        stats
    }

    pub fn total_tokens(&self) -> u64 {
        self.input_tokens + self.output_tokens + self.cache_read_tokens + self.cache_write_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_usage_stats_from_messages() {
        let ts = Utc.with_ymd_and_hms(2025, 1, 15, 10, 0, 0).unwrap();

        let mut first = Message::new("m1", Role::Assistant, ts);
        first.usage = TokenUsage {
            input: 100,
            output: 50,
            cache_read: 10,
            cache_write: 0,
        };
        let second = Message::new("m2", Role::User, ts);

        let stats = UsageStats::from_messages(&[first, second]);
        assert_eq!(stats.input_tokens, 100);
        assert_eq!(stats.output_tokens, 50);
        assert_eq!(stats.cache_read_tokens, 10);
        assert_eq!(stats.message_count, 2);
        assert_eq!(stats.total_tokens(), 160);
    }

    #[test]
    fn test_token_usage_accumulate() {
        let mut usage = TokenUsage::default();
        usage.accumulate(&TokenUsage {
            input: 1,
            output: 2,
            cache_read: 3,
            cache_write: 4,
        });
        usage.accumulate(&TokenUsage {
            input: 10,
            output: 20,
            cache_read: 30,
            cache_write: 40,
        });
        assert_eq!(usage.total(), 110);
    }

    #[test]
    fn test_content_block_round_trip() {
        let block = ContentBlock::ToolResult {
            tool_use_id: "t1".to_string(),
            is_error: false,
        };
        let json = serde_json::to_string(&block).unwrap();
        let back: ContentBlock = serde_json::from_str(&json).unwrap();
        assert_eq!(back, block);
    }
}
