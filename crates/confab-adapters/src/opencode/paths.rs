//! Platform discovery for the opencode data directory.
//!
//! Pure function of the home directory and environment hints, so tests can
//! pin both. Candidates are tried in platform-preference order; the first
//! that exists wins, and when none exists the XDG-style default is retained
//! so diagnostics can point somewhere concrete.

use std::path::{Path, PathBuf};

const TOOL_DIR: &str = "opencode";

#[derive(Debug, Clone, Default)]
pub(crate) struct DataDirHints {
    pub xdg_data_home: Option<PathBuf>,
    pub local_app_data: Option<PathBuf>,
}

impl DataDirHints {
    pub fn from_env() -> Self {
        Self {
            xdg_data_home: std::env::var_os("XDG_DATA_HOME").map(PathBuf::from),
            local_app_data: std::env::var_os("LOCALAPPDATA").map(PathBuf::from),
        }
    }
}

pub(crate) fn candidate_data_dirs(home: &Path, hints: &DataDirHints) -> Vec<PathBuf> {
    let mut candidates = vec![home.join("Library/Application Support").join(TOOL_DIR)];
    if let Some(xdg) = &hints.xdg_data_home {
        candidates.push(xdg.join(TOOL_DIR));
    }
    if let Some(local) = &hints.local_app_data {
        candidates.push(local.join(TOOL_DIR));
    }
    candidates.push(home.join(".local/share").join(TOOL_DIR));
    candidates
}

pub(crate) fn discover_data_dir(home: &Path, hints: &DataDirHints) -> PathBuf {
    let candidates = candidate_data_dirs(home, hints);
    candidates
        .iter()
        .find(|candidate| candidate.exists())
        .cloned()
        .unwrap_or_else(|| home.join(".local/share").join(TOOL_DIR))
}
