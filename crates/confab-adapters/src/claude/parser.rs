use crate::error::Result;
use crate::scan::{BufferPool, RecordReader};
use chrono::{DateTime, Utc};
use confab_types::{
    ContentBlock, Message, Role, ThinkingBlock, TokenUsage, ToolUse, ToolUseRef,
};
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;

use super::schema::{Block, ContentField, LogRecord, TurnRecord};

/// Listing-level summary of one session log, cached per (size, mtime).
#[derive(Debug, Clone, Default)]
pub(crate) struct SessionMeta {
    pub cwd: Option<String>,
    pub version: Option<String>,
    pub git_branch: Option<String>,
    pub slug: Option<String>,
    pub first_user_message: Option<String>,
    pub first_timestamp: Option<DateTime<Utc>>,
    pub last_timestamp: Option<DateTime<Utc>>,
    pub message_count: usize,
    pub usage_by_model: HashMap<String, TokenUsage>,
}

pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Single linear scan collecting everything the session list needs.
/// Lines that fail to decode are skipped.
pub(crate) fn parse_session_meta(path: &Path, pool: &BufferPool) -> Result<SessionMeta> {
    let mut meta = SessionMeta::default();
    let mut reader = RecordReader::open(path, 0, pool)?;

    while let Some(line) = reader.next_record()? {
        let Ok(record) = serde_json::from_str::<LogRecord>(line) else {
            continue;
        };

        let (turn, is_user) = match &record {
            LogRecord::User(turn) => (turn, true),
            LogRecord::Assistant(turn) => (turn, false),
            LogRecord::System(turn) => {
                absorb_header(&mut meta, turn);
                continue;
            }
            LogRecord::Unknown => continue,
        };

        absorb_header(&mut meta, turn);
        meta.message_count += 1;

        if let Some(ts) = turn.timestamp.as_deref().and_then(parse_timestamp) {
            if meta.first_timestamp.is_none() {
                meta.first_timestamp = Some(ts);
            }
            meta.last_timestamp = Some(ts);
        }

        let Some(message) = &turn.message else {
            continue;
        };

        if is_user && meta.first_user_message.is_none()
            && let Some(text) = first_text(&message.content)
        {
            meta.first_user_message = Some(text);
        }

        if !is_user && let Some(usage) = message.usage {
            let model = message.model.clone().unwrap_or_default();
            meta.usage_by_model
                .entry(model)
                .or_default()
                .accumulate(&usage.to_usage());
        }
    }

    Ok(meta)
}

fn absorb_header(meta: &mut SessionMeta, turn: &TurnRecord) {
    if meta.cwd.is_none() {
        meta.cwd = turn.cwd.clone();
    }
    if meta.version.is_none() {
        meta.version = turn.version.clone();
    }
    if meta.git_branch.is_none() {
        meta.git_branch = turn.git_branch.clone();
    }
    if meta.slug.is_none() {
        meta.slug = turn.slug.clone();
    }
}

fn first_text(content: &ContentField) -> Option<String> {
    match content {
        ContentField::Text(text) if !text.is_empty() => Some(text.clone()),
        ContentField::Text(_) => None,
        ContentField::Blocks(blocks) => blocks.iter().find_map(|block| match block {
            Block::Text { text } if !text.is_empty() => Some(text.clone()),
            _ => None,
        }),
    }
}

/// Flatten a tool result's `content` into display text. Results arrive as a
/// bare string, an array of text blocks, or occasionally something else
/// entirely, which is kept verbatim as JSON.
fn result_text(content: &Value) -> String {
    match content {
        Value::String(text) => text.clone(),
        Value::Array(items) => items
            .iter()
            .filter_map(|item| item.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Full message parse with tool-use / tool-result linking.
///
/// Assistant tool uses register their position in an index; tool results in
/// subsequent user records resolve through it, so block ordering is
/// preserved while results attach to uses from earlier lines. A repeated
/// tool-use id points the index at its latest occurrence.
pub(crate) fn parse_messages(path: &Path, pool: &BufferPool) -> Result<Vec<Message>> {
    let mut messages: Vec<Message> = Vec::new();
    let mut tool_index: HashMap<String, ToolUseRef> = HashMap::new();
    let mut reader = RecordReader::open(path, 0, pool)?;

    while let Some(line) = reader.next_record()? {
        let Ok(record) = serde_json::from_str::<LogRecord>(line) else {
            continue;
        };

        let (turn, role) = match record {
            LogRecord::User(turn) => (turn, Role::User),
            LogRecord::Assistant(turn) => (turn, Role::Assistant),
            _ => continue,
        };

        let Some(turn_message) = turn.message else {
            continue;
        };

        let timestamp = turn
            .timestamp
            .as_deref()
            .and_then(parse_timestamp)
            .unwrap_or_default();
        let id = turn
            .uuid
            .unwrap_or_else(|| format!("line-{}", messages.len()));

        let mut message = Message::new(id, role, timestamp);
        message.model = turn_message.model;
        if let Some(usage) = turn_message.usage {
            message.usage = usage.to_usage();
        }

        let blocks = match turn_message.content {
            ContentField::Text(text) => vec![Block::Text { text }],
            ContentField::Blocks(blocks) => blocks,
        };

        let message_index = messages.len();
        for block in blocks {
            match block {
                Block::Text { text } => {
                    if !message.content.is_empty() {
                        message.content.push('\n');
                    }
                    message.content.push_str(&text);
                    message.blocks.push(ContentBlock::Text { text });
                }
                Block::Thinking { thinking } => {
                    message.thinking.push(ThinkingBlock {
                        text: thinking.clone(),
                    });
                    message.blocks.push(ContentBlock::Thinking { text: thinking });
                }
                Block::ToolUse { id, name, input } => {
                    let reference = ToolUseRef {
                        message: message_index,
                        tool_use: message.tool_uses.len(),
                        block: message.blocks.len(),
                    };
                    tool_index.insert(id.clone(), reference);
                    message.tool_uses.push(ToolUse {
                        id: id.clone(),
                        name: name.clone(),
                        input: input.to_string(),
                        output: String::new(),
                        is_error: false,
                    });
                    message.blocks.push(ContentBlock::ToolUse { id, name });
                }
                Block::ToolResult {
                    tool_use_id,
                    content,
                    is_error,
                } => {
                    if let Some(reference) = tool_index.get(&tool_use_id)
                        && let Some(target) = messages
                            .get_mut(reference.message)
                            .and_then(|m| m.tool_uses.get_mut(reference.tool_use))
                    {
                        target.output = content.as_ref().map(result_text).unwrap_or_default();
                        target.is_error = is_error;
                    }
                    message.blocks.push(ContentBlock::ToolResult {
                        tool_use_id,
                        is_error,
                    });
                }
                Block::Unknown => {}
            }
        }

        messages.push(message);
    }

    // Logs are written in order, but clock skew happens; stable sort keeps
    // source order for equal timestamps.
    messages.sort_by_key(|message| message.timestamp);
    Ok(messages)
}
