//! Configuration schema and loader: a flat struct with `#[serde(default)]`
//! fields, loaded from TOML and validated after loading. No file-locking or
//! migration machinery, since this config has a single owner read once at
//! startup rather than being mutated and persisted across requests.

use crate::agent::tools::validator::WhitelistEntry;
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CommandValidationMode {
    Blacklist,
    Whitelist,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ThinkingSettings {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_thinking_budget")]
    pub budget: u32,
}

fn default_thinking_budget() -> u32 {
    1024
}

impl Default for ThinkingSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            budget: default_thinking_budget(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct InvestigationSettings {
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
    #[serde(default = "default_queue_cap")]
    pub queue_cap: usize,
    #[serde(default = "default_investigation_max_actions")]
    pub max_actions: u32,
    #[serde(default = "default_max_duration_secs")]
    pub max_duration_secs: u64,
    /// Severity routing for `warning` alerts: `critical` always
    /// auto-investigates and `info` is always record-only, but `warning` is
    /// configurable.
    #[serde(default)]
    pub auto_investigate_warnings: bool,
}

fn default_max_concurrent() -> usize {
    5
}
fn default_queue_cap() -> usize {
    50
}
fn default_investigation_max_actions() -> u32 {
    20
}
fn default_max_duration_secs() -> u64 {
    900
}

impl Default for InvestigationSettings {
    fn default() -> Self {
        Self {
            max_concurrent: default_max_concurrent(),
            queue_cap: default_queue_cap(),
            max_actions: default_investigation_max_actions(),
            max_duration_secs: default_max_duration_secs(),
            auto_investigate_warnings: false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub model: String,
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
    #[serde(default = "default_working_dir")]
    pub working_dir: PathBuf,
    #[serde(default)]
    pub thinking: ThinkingSettings,
    #[serde(default = "default_validation_mode")]
    pub command_validation_mode: CommandValidationMode,
    #[serde(default)]
    pub command_whitelist_json: Vec<WhitelistEntry>,
    #[serde(default)]
    pub ask_llm_on_unknown: bool,
    #[serde(default)]
    pub auto_approve_safe: bool,
    #[serde(default = "default_engine_max_actions")]
    pub max_actions: u32,
    #[serde(default)]
    pub investigation: InvestigationSettings,
    pub skills_root: Option<PathBuf>,
    pub subagents_root: Option<PathBuf>,
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_max_tokens() -> u32 {
    20_000
}
fn default_working_dir() -> PathBuf {
    PathBuf::from(".")
}
fn default_validation_mode() -> CommandValidationMode {
    CommandValidationMode::Blacklist
}
fn default_engine_max_actions() -> u32 {
    20
}
fn default_log_level() -> String {
    "info".to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("could not read config file {0}: {1}")]
    Read(PathBuf, std::io::Error),
    #[error("could not parse config file {0}: {1}")]
    Parse(PathBuf, toml::de::Error),
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

impl Config {
    /// Loads from `path` if it exists, falling back to field defaults with
    /// an empty `model` (validation then fails, since `model` has no
    /// sensible default of its own).
    pub fn load(path: &Path) -> Result<Config, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read(path.to_path_buf(), e))?;
        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.model.trim().is_empty() {
            return Err(ConfigError::Invalid("model must not be empty".into()));
        }
        if self.thinking.enabled && self.thinking.budget < 1024 {
            return Err(ConfigError::Invalid(
                "thinking.budget must be >= 1024 when thinking.enabled".into(),
            ));
        }
        if self.max_tokens == 0 {
            return Err(ConfigError::Invalid("max_tokens must be > 0".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn loads_minimal_config_with_defaults() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "model = \"claude-opus\"\n").unwrap();
        let config = Config::load(&path).unwrap();
        assert_eq!(config.model, "claude-opus");
        assert_eq!(config.max_tokens, 20_000);
        assert_eq!(config.investigation.max_concurrent, 5);
        assert!(!config.investigation.auto_investigate_warnings);
    }

    #[test]
    fn auto_investigate_warnings_reads_from_toml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "model = \"claude-opus\"\n[investigation]\nauto_investigate_warnings = true\n",
        )
        .unwrap();
        let config = Config::load(&path).unwrap();
        assert!(config.investigation.auto_investigate_warnings);
    }

    #[test]
    fn empty_model_fails_validation() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "model = \"\"\n").unwrap();
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn thinking_budget_below_minimum_fails_validation() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "model = \"claude-opus\"\n[thinking]\nenabled = true\nbudget = 100\n",
        )
        .unwrap();
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn missing_file_surfaces_read_error() {
        let err = Config::load(Path::new("/does/not/exist.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read(_, _)));
    }
}
