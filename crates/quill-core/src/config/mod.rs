mod defaults;

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::QuillError;
use defaults::*;

/// Top-level Quill configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub quill: AppConfig,
    #[serde(default)]
    pub oracle: OracleConfig,
    #[serde(default)]
    pub memory: MemoryConfig,
    #[serde(default)]
    pub ingest: IngestConfig,
    #[serde(default)]
    pub dispatcher: DispatcherConfig,
}

/// General agent settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_name")]
    pub name: String,
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            data_dir: default_data_dir(),
            log_level: default_log_level(),
        }
    }
}

/// Oracle client config. The API key may be left empty and supplied via
/// the GEMINI_API_KEY environment variable instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OracleConfig {
    #[serde(default)]
    pub api_key: String,
    #[serde(default = "default_oracle_model")]
    pub model: String,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            model: default_oracle_model(),
        }
    }
}

/// Memory store config, including the bounded context windows the
/// dispatcher gathers before generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    #[serde(default = "default_db_path")]
    pub db_path: String,
    #[serde(default = "default_context_fragments")]
    pub context_fragments: u32,
    #[serde(default = "default_context_memories")]
    pub context_memories: u32,
    #[serde(default = "default_context_actions")]
    pub context_actions: u32,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            context_fragments: default_context_fragments(),
            context_memories: default_context_memories(),
            context_actions: default_context_actions(),
        }
    }
}

/// Ingestion engine config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    /// How far back (seconds) the expansion-absorption lookup reaches.
    #[serde(default = "default_absorption_window")]
    pub absorption_window_secs: i64,
    /// Bounded depth of each per-key event queue.
    #[serde(default = "default_queue_capacity")]
    pub queue_capacity: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            absorption_window_secs: default_absorption_window(),
            queue_capacity: default_queue_capacity(),
        }
    }
}

/// Dispatcher config.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatcherConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Wall-clock tick interval. Due-ness detection is minute-granular, so
    /// anything at or under 60 seconds is sufficient.
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            tick_secs: default_tick_secs(),
        }
    }
}

/// Expand `~` to home directory.
pub fn shellexpand(path: &str) -> String {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = std::env::var_os("HOME") {
            return format!("{}/{rest}", home.to_string_lossy());
        }
    }
    path.to_string()
}

/// Load configuration from a TOML file.
///
/// Falls back to defaults if the file does not exist.
pub fn load(path: &str) -> Result<Config, QuillError> {
    let path = Path::new(path);
    if !path.exists() {
        tracing::info!(
            "Config file not found at {}, using defaults",
            path.display()
        );
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| QuillError::Config(format!("failed to read {}: {}", path.display(), e)))?;

    let config: Config = toml::from_str(&content)
        .map_err(|e| QuillError::Config(format!("failed to parse config: {}", e)))?;

    Ok(config)
}
