//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`AgentDbSettings::default()`]
//! 2. If `~/.agentdb/settings.json` exists, deep-merge user values over defaults
//! 3. Apply `AGENTDB_*` environment variable overrides (highest priority)
//!
//! Command-line flags are applied by the binary on top of the result.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::debug;

/// Errors that can occur when loading or parsing settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("failed to read settings file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse settings JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid settings value: {0}")]
    InvalidValue(String),
}

pub type Result<T> = std::result::Result<T, SettingsError>;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentDbSettings {
    /// Root directory holding one `<agent_id>.db` file per agent.
    pub agents_dir: PathBuf,
    pub server: ServerSettings,
    pub store: StoreSettings,
    pub logging: LoggingSettings,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub request_timeout_secs: u64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreSettings {
    /// Pooled connections per agent database.
    pub pool_size: u32,
    pub busy_timeout_ms: u32,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub json: bool,
}

impl Default for AgentDbSettings {
    fn default() -> Self {
        Self {
            agents_dir: PathBuf::from("agents"),
            server: ServerSettings::default(),
            store: StoreSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 9191,
            request_timeout_secs: 30,
        }
    }
}

impl Default for StoreSettings {
    fn default() -> Self {
        Self {
            pool_size: 8,
            busy_timeout_ms: 10_000,
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Resolve the path to the settings file (`~/.agentdb/settings.json`).
pub fn settings_path() -> PathBuf {
    let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
    PathBuf::from(home).join(".agentdb").join("settings.json")
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<AgentDbSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults; a malformed one is an error.
pub fn load_settings_from_path(path: &Path) -> Result<AgentDbSettings> {
    let defaults = serde_json::to_value(AgentDbSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: AgentDbSettings = serde_json::from_value(merged)?;
    apply_overrides(&mut settings, |name| std::env::var(name).ok());
    validate(&settings)?;
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
///
/// - Objects are merged recursively (source overrides target per-key)
/// - Arrays and primitives are replaced entirely by source
/// - Null values in source are skipped (preserving target)
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = match target_map.remove(&key) {
                    Some(target_val) => deep_merge(target_val, source_val),
                    None => source_val,
                };
                target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply `AGENTDB_*` overrides read through `lookup`.
///
/// Invalid values are ignored with a warning and the file/default value stays.
pub fn apply_overrides<F>(settings: &mut AgentDbSettings, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let read = |name: &str| lookup(name).filter(|v| !v.is_empty());

    if let Some(v) = read("AGENTDB_AGENTS_DIR") {
        settings.agents_dir = PathBuf::from(v);
    }
    if let Some(v) = read("AGENTDB_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = read("AGENTDB_PORT") {
        match v.parse::<u16>() {
            Ok(port) => settings.server.port = port,
            Err(_) => tracing::warn!(key = "AGENTDB_PORT", value = %v, "invalid port, ignoring"),
        }
    }
    if let Some(v) = read("AGENTDB_POOL_SIZE") {
        match v.parse::<u32>() {
            Ok(n) if (1..=64).contains(&n) => settings.store.pool_size = n,
            _ => tracing::warn!(key = "AGENTDB_POOL_SIZE", value = %v, "invalid pool size, ignoring"),
        }
    }
    if let Some(v) = read("AGENTDB_LOG_LEVEL") {
        settings.logging.level = v;
    }
    if let Some(v) = read("AGENTDB_LOG_JSON") {
        match parse_bool(&v) {
            Some(b) => settings.logging.json = b,
            None => tracing::warn!(key = "AGENTDB_LOG_JSON", value = %v, "invalid boolean, ignoring"),
        }
    }
}

pub fn parse_bool(val: &str) -> Option<bool> {
    match val.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn validate(settings: &AgentDbSettings) -> Result<()> {
    if settings.store.pool_size == 0 {
        return Err(SettingsError::InvalidValue("store.pool_size must be at least 1".into()));
    }
    if settings.agents_dir.as_os_str().is_empty() {
        return Err(SettingsError::InvalidValue("agents_dir must not be empty".into()));
    }
    Ok(())
}
