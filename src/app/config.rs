use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

use super::error::AppError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Chat-completions endpoint the annotator and assistant talk to.
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default = "default_model")]
    pub model: String,

    /// Quiet interval before burst edits are committed to the store.
    #[serde(default = "default_edit_coalesce_ms")]
    pub edit_coalesce_ms: u64,

    /// Idle interval before the buffer is persisted and proofread.
    #[serde(default = "default_idle_autosave_ms")]
    pub idle_autosave_ms: u64,

    #[serde(default = "default_proofread_enabled")]
    pub proofread_enabled: bool,
}

fn default_endpoint() -> String {
    "http://localhost:8787/api/ai/chat".to_string()
}

fn default_model() -> String {
    "qwen-flash".to_string()
}

fn default_edit_coalesce_ms() -> u64 {
    300
}

fn default_idle_autosave_ms() -> u64 {
    2000
}

fn default_proofread_enabled() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            endpoint: default_endpoint(),
            model: default_model(),
            edit_coalesce_ms: default_edit_coalesce_ms(),
            idle_autosave_ms: default_idle_autosave_ms(),
            proofread_enabled: default_proofread_enabled(),
        }
    }
}

impl AppConfig {
    /// Load config from disk, or create default if not exists
    pub fn load() -> Self {
        let config_path = Self::get_config_path();

        match fs::read_to_string(&config_path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(config) => config,
                Err(e) => {
                    log::warn!("Failed to parse config: {}. Using defaults.", e);
                    Self::default()
                }
            },
            Err(_) => {
                // File doesn't exist, use defaults
                let default = Self::default();
                // Try to save defaults for next time
                let _ = default.save();
                default
            }
        }
    }

    /// Save config to disk
    pub fn save(&self) -> Result<(), AppError> {
        let config_path = Self::get_config_path();

        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)?;
        }

        let json = serde_json::to_string_pretty(self)?;
        fs::write(&config_path, json)?;

        Ok(())
    }

    /// Get config file path (cross-platform)
    pub fn get_config_path() -> PathBuf {
        let mut path = dirs::config_dir().unwrap_or_else(|| PathBuf::from("."));
        path.push("markpad");
        path.push("config.json");
        path
    }
}
