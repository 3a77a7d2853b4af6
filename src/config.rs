use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cli::Cli;

const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub hidden_root_prefix: Option<String>,
    pub include_members: bool,
    pub refresh_on_update: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            hidden_root_prefix: None,
            include_members: false,
            refresh_on_update: true,
        }
    }
}

impl SessionConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        serde_json::from_str(&raw)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))
    }
}

pub fn resolve_session_config(cli: &Cli) -> Result<SessionConfig> {
    if let Some(p) = cli.config.as_deref() {
        return SessionConfig::load(p);
    }

    match default_config_path() {
        Some(p) if p.exists() => SessionConfig::load(&p),
        _ => Ok(SessionConfig::default()),
    }
}

pub fn default_config_path() -> Option<PathBuf> {
    let base = dirs::config_dir().or_else(dirs::home_dir)?;
    Some(base.join("graph-inspector").join(CONFIG_FILE_NAME))
}
