//! # Configuration
//!
//! Loading and parsing of the application's configuration file (`data/config.yaml`).
//! Every section has defaults, so a partial (or absent) file still yields a usable config.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_PATH: &str = "data/config.yaml";

/// Main application configuration structure.
/// Matches the layout of `data/config.yaml`.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub agent: AgentConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub commands: CommandsConfig,
    #[serde(default)]
    pub listing: ListingConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// The language-model backend behind the oracle.
#[derive(Debug, Deserialize, Clone)]
pub struct AgentConfig {
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_api_key_env")]
    pub api_key_env: Option<String>, // e.g. "GEMINI_API_KEY"
    #[serde(default)]
    pub timeout: Option<u64>,
    #[serde(default)]
    pub temperature: Option<f32>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
            endpoint: None,
            api_key: None,
            api_key_env: default_api_key_env(),
            timeout: None,
            temperature: None,
        }
    }
}

fn default_provider() -> String {
    "gemini".to_string()
}
fn default_model() -> String {
    "gemini-2.5-flash".to_string()
}
fn default_api_key_env() -> Option<String> {
    Some("GEMINI_API_KEY".to_string())
}

/// Per-session policy.
#[derive(Debug, Deserialize, Clone)]
pub struct SessionConfig {
    #[serde(default = "default_working_dir")]
    pub working_dir: String,
    #[serde(default = "default_true")]
    pub safe_mode: bool,
    /// Upper bound on consecutive autonomous oracle turns.
    #[serde(default = "default_max_continuations")]
    pub max_continuations: u32,
    #[serde(default)]
    pub pinned_files: Vec<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            working_dir: default_working_dir(),
            safe_mode: true,
            max_continuations: default_max_continuations(),
            pinned_files: Vec::new(),
        }
    }
}

impl SessionConfig {
    /// Working directory with a leading `~` expanded.
    pub fn resolved_working_dir(&self) -> PathBuf {
        expand_home(&self.working_dir)
    }
}

fn default_working_dir() -> String {
    "workspace".to_string()
}
fn default_true() -> bool {
    true
}
fn default_max_continuations() -> u32 {
    25
}

#[derive(Debug, Deserialize, Clone)]
pub struct CommandsConfig {
    /// Hard timeout for shell commands, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct ListingConfig {
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
}

impl Default for ListingConfig {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
        }
    }
}

fn default_max_depth() -> usize {
    2
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_dir")]
    pub dir: String,
    #[serde(default = "default_log_file")]
    pub file: String,
    /// Mirror logs to stderr. Off by default since stdout carries the chat.
    #[serde(default)]
    pub console: bool,
    #[serde(default = "default_log_filter")]
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            dir: default_log_dir(),
            file: default_log_file(),
            console: false,
            filter: default_log_filter(),
        }
    }
}

fn default_log_dir() -> String {
    "data".to_string()
}
fn default_log_file() -> String {
    "session.log".to_string()
}
fn default_log_filter() -> String {
    "info,hyper=warn,reqwest=warn,html5ever=warn,selectors=warn".to_string()
}

impl AppConfig {
    /// Loads the configuration.
    ///
    /// An explicitly requested file must exist; the default location falls back to
    /// built-in defaults when absent.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let (path, explicit) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_PATH), false),
        };

        if !path.exists() {
            if explicit {
                anyhow::bail!("Config file not found: {}", path.display());
            }
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("Failed to parse {}", path.display()))
    }

    pub fn from_yaml(content: &str) -> Result<Self> {
        // An empty document deserializes to unit, not to a mapping.
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Resolves the API key from `api_key` or the env var named by `api_key_env`.
    pub fn api_key(&self) -> Option<String> {
        if let Some(key) = &self.agent.api_key {
            return Some(key.clone());
        }
        self.agent
            .api_key_env
            .as_ref()
            .and_then(|var| std::env::var(var).ok())
            .filter(|key| !key.is_empty())
    }
}

/// Expands a leading `~` to the user's home directory.
pub fn expand_home(path: &str) -> PathBuf {
    if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    } else if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_document() {
        let config = AppConfig::from_yaml("").unwrap();
        assert_eq!(config.agent.provider, "gemini");
        assert_eq!(config.agent.model, "gemini-2.5-flash");
        assert!(config.session.safe_mode);
        assert_eq!(config.session.max_continuations, 25);
        assert_eq!(config.commands.timeout, 30);
        assert_eq!(config.listing.max_depth, 2);
        assert_eq!(config.logging.file, "session.log");
    }

    #[test]
    fn test_partial_config() {
        let yaml = r#"
agent:
  provider: openai
  model: gpt-4o-mini
  api_key: sk-test
session:
  working_dir: /tmp/project
  safe_mode: false
commands:
  timeout: 5
"#;
        let config = AppConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.agent.provider, "openai");
        assert_eq!(config.api_key().as_deref(), Some("sk-test"));
        assert!(!config.session.safe_mode);
        assert_eq!(config.session.max_continuations, 25);
        assert_eq!(config.commands.timeout, 5);
        assert_eq!(
            config.session.resolved_working_dir(),
            PathBuf::from("/tmp/project")
        );
    }

    #[test]
    fn test_invalid_yaml_is_an_error() {
        assert!(AppConfig::from_yaml("session: [unclosed").is_err());
    }

    #[test]
    fn test_missing_explicit_file_is_an_error() {
        let missing = Path::new("/definitely/not/here/config.yaml");
        assert!(AppConfig::load(Some(missing)).is_err());
    }

    #[test]
    fn test_expand_home() {
        assert_eq!(expand_home("relative/dir"), PathBuf::from("relative/dir"));
        if let Some(home) = dirs::home_dir() {
            assert_eq!(expand_home("~/work"), home.join("work"));
        }
    }
}
