use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdapterConfig {
    pub enabled: bool,

    /// Override of the adapter's store location (the tool home directory,
    /// or the data directory for the database-backed adapter).
    #[serde(default)]
    pub home: Option<PathBuf>,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            home: None,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub adapters: HashMap<String, AdapterConfig>,
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_path()?)
    }

    pub fn load_from(path: &PathBuf) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        let config = toml::from_str(&content)
            .with_context(|| format!("failed to parse config: {}", path.display()))?;
        Ok(config)
    }

    pub fn save_to(&self, path: &PathBuf) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn default_path() -> Result<PathBuf> {
        let base = dirs::config_dir().context("no config directory on this platform")?;
        Ok(base.join("confab").join("config.toml"))
    }

    pub fn set_adapter(&mut self, id: String, config: AdapterConfig) {
        self.adapters.insert(id, config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_config_is_empty() {
        let config = Config::default();
        assert!(config.adapters.is_empty());
    }

    #[test]
    fn test_save_and_load_round_trip() -> Result<()> {
        let dir = TempDir::new()?;
        let path = dir.path().join("config.toml");

        let mut config = Config::default();
        config.set_adapter(
            "claude".to_string(),
            AdapterConfig {
                enabled: true,
                home: Some(PathBuf::from("/custom/.claude")),
            },
        );
        config.set_adapter(
            "opencode".to_string(),
            AdapterConfig {
                enabled: false,
                home: None,
            },
        );
        config.save_to(&path)?;

        let loaded = Config::load_from(&path)?;
        assert_eq!(loaded.adapters.len(), 2);
        assert!(loaded.adapters["claude"].enabled);
        assert!(!loaded.adapters["opencode"].enabled);
        assert_eq!(
            loaded.adapters["claude"].home,
            Some(PathBuf::from("/custom/.claude"))
        );
        Ok(())
    }

    #[test]
    fn test_missing_file_loads_default() -> Result<()> {
        let dir = TempDir::new()?;
        let config = Config::load_from(&dir.path().join("nope.toml"))?;
        assert!(config.adapters.is_empty());
        Ok(())
    }
}
