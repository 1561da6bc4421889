use crate::claude::ClaudeAdapter;
use crate::copilot::CopilotAdapter;
use crate::error::{Error, Result};
use crate::opencode::OpencodeAdapter;
use crate::traits::Adapter;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct AdapterMetadata {
    pub id: &'static str,
    pub description: &'static str,
    pub default_store: &'static str,
}

const ADAPTERS: &[AdapterMetadata] = &[
    AdapterMetadata {
        id: "claude",
        description: "Claude Code",
        default_store: "~/.claude/projects",
    },
    AdapterMetadata {
        id: "copilot",
        description: "Copilot CLI",
        default_store: "~/.copilot/session-state",
    },
    AdapterMetadata {
        id: "opencode",
        description: "OpenCode",
        default_store: "~/.local/share/opencode",
    },
];

pub fn adapter_metadata() -> &'static [AdapterMetadata] {
    ADAPTERS
}

pub fn adapter_ids() -> Vec<&'static str> {
    ADAPTERS.iter().map(|meta| meta.id).collect()
}

/// Create one adapter by id, with an optional home/data-dir override.
pub fn create_adapter(id: &str, home_override: Option<PathBuf>) -> Result<Arc<dyn Adapter>> {
    match id {
        "claude" | "claude_code" => Ok(Arc::new(match home_override {
            Some(home) => ClaudeAdapter::with_home(home),
            None => ClaudeAdapter::new(),
        })),
        "copilot" => Ok(Arc::new(match home_override {
            Some(home) => CopilotAdapter::with_home(home),
            None => CopilotAdapter::new(),
        })),
        "opencode" => Ok(Arc::new(match home_override {
            Some(data_dir) => OpencodeAdapter::with_data_dir(data_dir),
            None => OpencodeAdapter::new(),
        })),
        other => Err(Error::Adapter(format!("Unknown adapter: {}", other))),
    }
}

/// All adapters in their canonical routing order.
pub fn create_all_adapters() -> Vec<Arc<dyn Adapter>> {
    vec![
        Arc::new(ClaudeAdapter::new()),
        Arc::new(CopilotAdapter::new()),
        Arc::new(OpencodeAdapter::new()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_metadata_covers_every_adapter() {
        let ids = adapter_ids();
        assert_eq!(ids, ["claude", "copilot", "opencode"]);
    }

    #[test]
    fn test_create_adapter_by_id() {
        let adapter = create_adapter("claude", None).unwrap();
        assert_eq!(adapter.id(), "claude");

        let adapter = create_adapter("opencode", Some(PathBuf::from("/tmp/oc"))).unwrap();
        assert_eq!(adapter.id(), "opencode");

        assert!(create_adapter("vim", None).is_err());
    }

    #[test]
    fn test_all_adapters_have_distinct_ids() {
        let adapters = create_all_adapters();
        let mut ids: Vec<&str> = adapters.iter().map(|a| a.id()).collect();
        ids.dedup();
        assert_eq!(ids.len(), adapters.len());
    }
}
