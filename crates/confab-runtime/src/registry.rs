use crate::config::Config;
use anyhow::{Result, bail};
use confab_adapters::{Adapter, sort_sessions};
use confab_types::{Message, Session, UsageStats};
use std::path::Path;
use std::sync::Arc;
use tracing::warn;

/// Ordered collection of adapters. Routes project-scoped queries, merges
/// cross-adapter listings, and reports per-adapter availability.
pub struct Registry {
    adapters: Vec<Arc<dyn Adapter>>,
}

impl Registry {
    pub fn new(adapters: Vec<Arc<dyn Adapter>>) -> Self {
        Self { adapters }
    }

    /// Build the registry from configuration: disabled adapters are left
    /// out, home overrides are applied.
    pub fn from_config(config: &Config) -> Self {
        let mut adapters = Vec::new();
        for meta in confab_adapters::adapter_metadata() {
            let adapter_config = config.adapters.get(meta.id);
            if adapter_config.is_some_and(|c| !c.enabled) {
                continue;
            }
            let home = adapter_config.and_then(|c| c.home.clone());
            match confab_adapters::create_adapter(meta.id, home) {
                Ok(adapter) => adapters.push(adapter),
                Err(err) => warn!(adapter = meta.id, error = %err, "could not construct adapter"),
            }
        }
        Self { adapters }
    }

    pub fn adapters(&self) -> &[Arc<dyn Adapter>] {
        &self.adapters
    }

    pub fn adapter(&self, adapter_id: &str) -> Option<Arc<dyn Adapter>> {
        self.adapters
            .iter()
            .find(|adapter| adapter.id() == adapter_id)
            .cloned()
    }

    /// Adapters that currently have sessions for the project.
    pub fn available(&self, project_root: &Path) -> Vec<&'static str> {
        self.adapters
            .iter()
            .filter(|adapter| match adapter.detect(project_root) {
                Ok(found) => found,
                Err(err) => {
                    warn!(adapter = adapter.id(), error = %err, "detect failed");
                    false
                }
            })
            .map(|adapter| adapter.id())
            .collect()
    }

    /// One unified listing across every adapter, newest first. An adapter
    /// that fails mid-listing is skipped; the merged result stays usable.
    pub fn sessions(&self, project_root: &Path) -> Vec<Session> {
        let mut merged = Vec::new();
        for adapter in &self.adapters {
            match adapter.sessions(project_root) {
                Ok(sessions) => merged.extend(sessions),
                Err(err) => warn!(adapter = adapter.id(), error = %err, "listing failed"),
            }
        }
        sort_sessions(&mut merged);
        merged
    }

    pub fn messages(&self, adapter_id: &str, session_id: &str) -> Result<Vec<Message>> {
        let Some(adapter) = self.adapter(adapter_id) else {
            bail!("unknown adapter: {}", adapter_id);
        };
        Ok(adapter.messages(session_id)?)
    }

    pub fn usage(&self, adapter_id: &str, session_id: &str) -> Result<UsageStats> {
        let Some(adapter) = self.adapter(adapter_id) else {
            bail!("unknown adapter: {}", adapter_id);
        };
        Ok(adapter.usage(session_id)?)
    }
}
