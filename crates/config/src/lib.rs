//! Configuration loading, validation, and management for Sanskara.
//!
//! Loads configuration from `~/.sanskara/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.sanskara/config.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Namespace for stored memories
    #[serde(default = "default_app_name")]
    pub app_name: String,

    /// Semantic recall settings
    #[serde(default)]
    pub recall: RecallConfig,

    /// Context assembly settings
    #[serde(default)]
    pub context: ContextConfig,

    /// Memory backend settings
    #[serde(default)]
    pub memory: MemoryConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn default_app_name() -> String {
    "SanskaraAI".into()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecallConfig {
    /// Bypass vector search entirely and return nothing.
    #[serde(default)]
    pub disabled: bool,

    #[serde(default = "default_top_k")]
    pub top_k: usize,

    /// Upper bound on each backend call (vector search, then fallback).
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    #[serde(default = "default_max_fact_chars")]
    pub max_fact_chars: usize,

    /// Only surface entries stored as session summaries.
    #[serde(default)]
    pub summaries_only: bool,
}

fn default_top_k() -> usize {
    5
}
fn default_timeout_ms() -> u64 {
    3000
}
fn default_max_fact_chars() -> usize {
    220
}

impl Default for RecallConfig {
    fn default() -> Self {
        Self {
            disabled: false,
            top_k: default_top_k(),
            timeout_ms: default_timeout_ms(),
            max_fact_chars: default_max_fact_chars(),
            summaries_only: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Recent-message window size.
    #[serde(default = "default_k_turns")]
    pub k_turns: usize,

    /// Soft token budget for the assembled context.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    #[serde(default = "default_chars_per_token")]
    pub chars_per_token: usize,

    /// Upper bound on each state-slice fetch.
    #[serde(default = "default_timeout_ms")]
    pub fetch_timeout_ms: u64,

    #[serde(default)]
    pub caps: ListCaps,
}

fn default_k_turns() -> usize {
    6
}
fn default_max_tokens() -> usize {
    6000
}
fn default_chars_per_token() -> usize {
    4
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            k_turns: default_k_turns(),
            max_tokens: default_max_tokens(),
            chars_per_token: default_chars_per_token(),
            fetch_timeout_ms: default_timeout_ms(),
            caps: ListCaps::default(),
        }
    }
}

/// Maximum rows kept per list slice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ListCaps {
    pub active_workflows: usize,
    pub relevant_tasks: usize,
    pub shortlisted_vendors: usize,
    pub recent_expenses: usize,
    pub upcoming_events: usize,
    pub overdue_tasks: usize,
    pub urgent_tasks: usize,
    pub upcoming_deadlines: usize,
    pub bookings: usize,
}

impl Default for ListCaps {
    fn default() -> Self {
        Self {
            active_workflows: 10,
            relevant_tasks: 25,
            shortlisted_vendors: 10,
            recent_expenses: 10,
            upcoming_events: 10,
            overdue_tasks: 10,
            urgent_tasks: 10,
            upcoming_deadlines: 5,
            bookings: 20,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// "sqlite", "in_memory", or "none"
    #[serde(default = "default_memory_backend")]
    pub backend: String,

    /// SQLite database file (relative paths resolve against the config dir)
    #[serde(default = "default_memory_path")]
    pub path: String,

    #[serde(default = "default_embedding_dim")]
    pub embedding_dim: usize,
}

fn default_memory_backend() -> String {
    "sqlite".into()
}
fn default_memory_path() -> String {
    "memories.db".into()
}
fn default_embedding_dim() -> usize {
    256
}

const MEMORY_BACKENDS: &[&str] = &["sqlite", "in_memory", "none"];

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            backend: default_memory_backend(),
            path: default_memory_path(),
            embedding_dim: default_embedding_dim(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit JSON lines instead of human-readable output.
    #[serde(default)]
    pub json: bool,
}

fn default_log_level() -> String {
    "info".into()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from the default location (`~/.sanskara/config.toml`).
    ///
    /// Environment variables override file values:
    /// - `SANSKARA_APP_NAME`
    /// - `DISABLE_SEMANTIC_RECALL` (`1`, `true`, `True`)
    /// - `SANSKARA_TOP_K`, `SANSKARA_K_TURNS`, `SANSKARA_RECALL_TIMEOUT_MS`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        Self::load_with_env(&config_path)
    }

    /// Load from `path`, then apply environment overrides and re-validate.
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load_from(path)?;
        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply overrides from a variable lookup. `load` passes the process
    /// environment; tests pass a closure over a fixed map.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(name) = lookup("SANSKARA_APP_NAME") {
            self.app_name = name;
        }
        if let Some(flag) = lookup("DISABLE_SEMANTIC_RECALL") {
            self.recall.disabled = parse_flag(&flag);
        }
        if let Some(raw) = lookup("SANSKARA_TOP_K") {
            self.recall.top_k = parse_number("SANSKARA_TOP_K", &raw)?;
        }
        if let Some(raw) = lookup("SANSKARA_K_TURNS") {
            self.context.k_turns = parse_number("SANSKARA_K_TURNS", &raw)?;
        }
        if let Some(raw) = lookup("SANSKARA_RECALL_TIMEOUT_MS") {
            self.recall.timeout_ms = parse_number("SANSKARA_RECALL_TIMEOUT_MS", &raw)?;
        }
        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".sanskara")
    }

    /// Resolve the SQLite memory path against the config directory.
    pub fn memory_path(&self) -> PathBuf {
        let path = PathBuf::from(&self.memory.path);
        if path.is_absolute() {
            path
        } else {
            Self::config_dir().join(path)
        }
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.recall.top_k == 0 {
            return Err(ConfigError::ValidationError(
                "recall.top_k must be at least 1".into(),
            ));
        }
        if self.recall.max_fact_chars == 0 {
            return Err(ConfigError::ValidationError(
                "recall.max_fact_chars must be at least 1".into(),
            ));
        }
        if self.context.k_turns == 0 {
            return Err(ConfigError::ValidationError(
                "context.k_turns must be at least 1".into(),
            ));
        }
        if self.context.chars_per_token == 0 {
            return Err(ConfigError::ValidationError(
                "context.chars_per_token must be at least 1".into(),
            ));
        }
        if self.recall.timeout_ms == 0 || self.context.fetch_timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "timeouts must be at least 1ms".into(),
            ));
        }
        if !MEMORY_BACKENDS.contains(&self.memory.backend.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "unknown memory.backend '{}' (expected one of {})",
                self.memory.backend,
                MEMORY_BACKENDS.join(", ")
            )));
        }
        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            recall: RecallConfig::default(),
            context: ContextConfig::default(),
            memory: MemoryConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim(), "1" | "true" | "True")
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::ValidationError(format!("{key} must be a number, got '{raw}'")))
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.app_name, "SanskaraAI");
        assert_eq!(config.context.k_turns, 6);
        assert_eq!(config.recall.top_k, 5);
        assert!(!config.recall.disabled);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.app_name, config.app_name);
        assert_eq!(parsed.context.caps, config.context.caps);
    }

    #[test]
    fn zero_top_k_rejected() {
        let mut config = AppConfig::default();
        config.recall.top_k = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_max_fact_chars_rejected() {
        let mut config = AppConfig::default();
        config.recall.max_fact_chars = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("max_fact_chars"));
    }

    #[test]
    fn unknown_backend_rejected() {
        let mut config = AppConfig::default();
        config.memory.backend = "redis".into();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("redis"));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        assert_eq!(result.unwrap().recall.timeout_ms, 3000);
    }

    #[test]
    fn partial_file_keeps_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            r#"
app_name = "TestApp"

[context]
k_turns = 3

[context.caps]
relevant_tasks = 7
"#,
        )
        .unwrap();

        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.app_name, "TestApp");
        assert_eq!(config.context.k_turns, 3);
        assert_eq!(config.context.caps.relevant_tasks, 7);
        assert_eq!(config.context.caps.upcoming_deadlines, 5);
        assert_eq!(config.recall.top_k, 5);
    }

    #[test]
    fn malformed_file_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "[context\nk_turns = ").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn env_disables_recall() {
        for value in ["1", "true", "True"] {
            let mut config = AppConfig::default();
            config
                .apply_overrides(env(&[("DISABLE_SEMANTIC_RECALL", value)]))
                .unwrap();
            assert!(config.recall.disabled, "value {value}");
        }

        let mut config = AppConfig::default();
        config
            .apply_overrides(env(&[("DISABLE_SEMANTIC_RECALL", "0")]))
            .unwrap();
        assert!(!config.recall.disabled);
    }

    #[test]
    fn env_overrides_windows() {
        let mut config = AppConfig::default();
        config
            .apply_overrides(env(&[
                ("SANSKARA_TOP_K", "2"),
                ("SANSKARA_K_TURNS", "10"),
                ("SANSKARA_APP_NAME", "Staging"),
            ]))
            .unwrap();
        assert_eq!(config.recall.top_k, 2);
        assert_eq!(config.context.k_turns, 10);
        assert_eq!(config.app_name, "Staging");
    }

    #[test]
    fn env_rejects_non_numeric_window() {
        let mut config = AppConfig::default();
        let err = config
            .apply_overrides(env(&[("SANSKARA_TOP_K", "many")]))
            .unwrap_err();
        assert!(err.to_string().contains("SANSKARA_TOP_K"));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("SanskaraAI"));
        assert!(toml_str.contains("[recall]"));
    }
}
