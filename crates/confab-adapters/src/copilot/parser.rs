use crate::cache::CachedMessages;
use crate::error::Result;
use crate::scan::{BufferPool, RecordReader};
use chrono::{DateTime, Utc};
use confab_types::{ContentBlock, Message, Role, ToolUse, ToolUseRef};
use std::path::Path;

use super::schema::{EventRecord, MessageEvent};

fn parse_timestamp(raw: Option<&str>) -> DateTime<Utc> {
    raw.and_then(|ts| DateTime::parse_from_rfc3339(ts).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_default()
}

/// Consume records from `reader` and fold them into `state`, advancing its
/// byte offset. Works identically for a full parse (offset 0, empty state)
/// and an incremental resume (cached state, offset past the cached prefix):
/// the tool index carries positions of tool uses from the cached messages,
/// so a completion event arriving in the appended tail still finds its use.
pub(crate) fn apply_events(state: &mut CachedMessages, reader: &mut RecordReader<'_>) -> Result<()> {
    while let Some(line) = reader.next_record()? {
        let Ok(record) = serde_json::from_str::<EventRecord>(line) else {
            continue;
        };

        match record {
            EventRecord::UserMessage(event) => push_user(state, event),
            EventRecord::AssistantMessage(event) => push_assistant(state, event),
            EventRecord::ToolComplete(event) => {
                let Some(call_id) = event.data.tool_call_id else {
                    continue;
                };
                let output = event
                    .data
                    .result
                    .and_then(|r| r.content)
                    .unwrap_or_default();
                link_result(state, &call_id, output, event.data.is_error);
            }
            EventRecord::Unknown => {}
        }
    }

    state.offset = reader.offset();
    Ok(())
}

fn event_id(event: &MessageEvent, fallback_index: usize) -> String {
    event
        .id
        .clone()
        .unwrap_or_else(|| format!("event-{}", fallback_index))
}

fn push_user(state: &mut CachedMessages, event: MessageEvent) {
    let timestamp = parse_timestamp(event.timestamp.as_deref());
    let mut message = Message::new(event_id(&event, state.messages.len()), Role::User, timestamp);

    if let Some(text) = event.data.content {
        message.blocks.push(ContentBlock::Text { text: text.clone() });
        message.content = text;
    }

    state.messages.push(message);
}

fn push_assistant(state: &mut CachedMessages, event: MessageEvent) {
    let timestamp = parse_timestamp(event.timestamp.as_deref());
    let mut message = Message::new(
        event_id(&event, state.messages.len()),
        Role::Assistant,
        timestamp,
    );
    message.model = event.data.model;

    if let Some(text) = event.data.content {
        message.blocks.push(ContentBlock::Text { text: text.clone() });
        message.content = text;
    }

    let message_index = state.messages.len();
    for request in event.data.tool_requests {
        state.tool_index.insert(
            request.tool_call_id.clone(),
            ToolUseRef {
                message: message_index,
                tool_use: message.tool_uses.len(),
                block: message.blocks.len(),
            },
        );
        message.blocks.push(ContentBlock::ToolUse {
            id: request.tool_call_id.clone(),
            name: request.name.clone(),
        });
        message.tool_uses.push(ToolUse {
            id: request.tool_call_id,
            name: request.name,
            input: request.arguments.to_string(),
            output: String::new(),
            is_error: false,
        });
    }

    state.messages.push(message);
}

fn link_result(state: &mut CachedMessages, call_id: &str, output: String, is_error: bool) {
    let Some(reference) = state.tool_index.get(call_id) else {
        return;
    };
    if let Some(target) = state
        .messages
        .get_mut(reference.message)
        .and_then(|m| m.tool_uses.get_mut(reference.tool_use))
    {
        target.output = output;
        target.is_error = is_error;
    }
}

/// Full parse of an events log from byte zero.
pub(crate) fn parse_events_file(path: &Path, pool: &BufferPool) -> Result<CachedMessages> {
    let mut state = CachedMessages::default();
    let mut reader = RecordReader::open(path, 0, pool)?;
    apply_events(&mut state, &mut reader)?;
    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_events(lines: &[&str]) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let mut file = std::fs::File::create(&path).unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
        (dir, path)
    }

    #[test]
    fn test_parse_links_tool_results() {
        let (_dir, path) = write_events(&[
            r#"{"type":"user.message","id":"msg-1","timestamp":"2025-01-15T10:00:00Z","data":{"content":"list files"}}"#,
            r#"{"type":"assistant.message","id":"msg-2","timestamp":"2025-01-15T10:00:10Z","data":{"content":"Sure","toolRequests":[{"toolCallId":"call-1","name":"shell","arguments":{"cmd":"ls"}}]}}"#,
            r#"{"type":"tool.execution_complete","id":"ev-1","timestamp":"2025-01-15T10:00:12Z","data":{"toolCallId":"call-1","result":{"content":"a.txt\nb.txt"}}}"#,
        ]);

        let pool = BufferPool::new();
        let state = parse_events_file(&path, &pool).unwrap();

        assert_eq!(state.messages.len(), 2);
        assert_eq!(state.messages[1].tool_uses[0].output, "a.txt\nb.txt");
        assert!(state.offset > 0);
    }

    #[test]
    fn test_incremental_resume_links_to_cached_messages() {
        let (_dir, path) = write_events(&[
            r#"{"type":"assistant.message","id":"msg-1","timestamp":"2025-01-15T10:00:00Z","data":{"content":"Working","toolRequests":[{"toolCallId":"call-7","name":"shell","arguments":{}}]}}"#,
        ]);

        let pool = BufferPool::new();
        let mut state = parse_events_file(&path, &pool).unwrap();
        let resume_at = state.offset;

        // Append a completion for the already-cached tool use.
        let mut file = std::fs::OpenOptions::new().append(true).open(&path).unwrap();
        writeln!(
            file,
            r#"{{"type":"tool.execution_complete","id":"ev-2","timestamp":"2025-01-15T10:00:30Z","data":{{"toolCallId":"call-7","result":{{"content":"done"}}}}}}"#
        )
        .unwrap();

        let mut reader = RecordReader::open(&path, resume_at, &pool).unwrap();
        apply_events(&mut state, &mut reader).unwrap();

        assert_eq!(state.messages.len(), 1);
        assert_eq!(state.messages[0].tool_uses[0].output, "done");
        assert!(state.offset > resume_at);
    }

    #[test]
    fn test_malformed_interleaved_lines_skipped() {
        let (_dir, path) = write_events(&[
            r#"{"type":"user.message","id":"m1","timestamp":"2025-01-15T10:00:00Z","data":{"content":"a"}}"#,
            "garbage",
            r#"{"type":"user.message","id":"m2","timestamp":"2025-01-15T10:00:01Z","data":{"content":"b"}}"#,
            "{\"type\":",
            r#"{"type":"user.message","id":"m3","timestamp":"2025-01-15T10:00:02Z","data":{"content":"c"}}"#,
        ]);

        let pool = BufferPool::new();
        let state = parse_events_file(&path, &pool).unwrap();
        assert_eq!(state.messages.len(), 3);
    }

    #[test]
    fn test_orphan_completion_is_ignored() {
        let (_dir, path) = write_events(&[
            r#"{"type":"tool.execution_complete","id":"ev-1","data":{"toolCallId":"missing","result":{"content":"x"}}}"#,
        ]);

        let pool = BufferPool::new();
        let state = parse_events_file(&path, &pool).unwrap();
        assert!(state.messages.is_empty());
    }
}
