use serde::Deserialize;
use serde_json::Value;

/// `workspace.yaml`, one per session directory.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct Workspace {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub cwd: Option<String>,
    #[serde(default)]
    pub git_root: Option<String>,
    #[serde(default)]
    pub branch: Option<String>,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub updated_at: Option<String>,
}

/// One line of `events.jsonl`. Event types beyond the three below exist in
/// the wild and are ignored.
#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
pub(crate) enum EventRecord {
    #[serde(rename = "user.message")]
    UserMessage(MessageEvent),
    #[serde(rename = "assistant.message")]
    AssistantMessage(MessageEvent),
    #[serde(rename = "tool.execution_complete")]
    ToolComplete(ToolCompleteEvent),
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessageEvent {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub data: MessageData,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct MessageData {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default, rename = "toolRequests")]
    pub tool_requests: Vec<ToolRequest>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ToolRequest {
    #[serde(rename = "toolCallId")]
    pub tool_call_id: String,
    pub name: String,
    #[serde(default)]
    pub arguments: Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ToolCompleteEvent {
    #[serde(default)]
    pub data: ToolCompleteData,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ToolCompleteData {
    #[serde(default, rename = "toolCallId")]
    pub tool_call_id: Option<String>,
    #[serde(default)]
    pub result: Option<ToolResultBody>,
    #[serde(default)]
    pub is_error: bool,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ToolResultBody {
    #[serde(default)]
    pub content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_workspace_yaml_decodes() {
        let yaml = "id: sess-1\ncwd: /home/u/repo\ngit_root: /home/u/repo\nbranch: main\nsummary: Fix flaky test\ncreated_at: 2025-01-15T09:00:00Z\nupdated_at: 2025-01-15T10:00:00Z\n";
        let workspace: Workspace = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(workspace.id.as_deref(), Some("sess-1"));
        assert_eq!(workspace.git_root.as_deref(), Some("/home/u/repo"));
    }

    #[test]
    fn test_assistant_event_with_tool_requests() {
        let line = r#"{"type":"assistant.message","id":"msg-2","timestamp":"2025-01-15T10:01:00Z","data":{"content":"Running it","toolRequests":[{"toolCallId":"call-1","name":"shell","arguments":{"cmd":"ls"}}]}}"#;
        let record: EventRecord = serde_json::from_str(line).unwrap();
        match record {
            EventRecord::AssistantMessage(event) => {
                assert_eq!(event.data.tool_requests.len(), 1);
                assert_eq!(event.data.tool_requests[0].tool_call_id, "call-1");
            }
            _ => panic!("expected assistant message"),
        }
    }

    #[test]
    fn test_unlisted_event_types_ignored() {
        let line = r#"{"type":"session.heartbeat","id":"x"}"#;
        let record: EventRecord = serde_json::from_str(line).unwrap();
        assert!(matches!(record, EventRecord::Unknown));
    }

    #[test]
    fn test_tool_complete_decodes() {
        let line = r#"{"type":"tool.execution_complete","id":"ev-9","timestamp":"2025-01-15T10:01:05Z","data":{"toolCallId":"call-1","result":{"content":"file.txt"}}}"#;
        let record: EventRecord = serde_json::from_str(line).unwrap();
        match record {
            EventRecord::ToolComplete(event) => {
                assert_eq!(event.data.tool_call_id.as_deref(), Some("call-1"));
                assert_eq!(
                    event.data.result.unwrap().content.as_deref(),
                    Some("file.txt")
                );
            }
            _ => panic!("expected tool completion"),
        }
    }
}
