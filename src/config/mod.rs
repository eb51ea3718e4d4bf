//! Layered configuration: built-in defaults, then a TOML file, then `NLM_*`
//! environment variables.

use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::engine::FailurePolicy;
use crate::error::MacroError;
use crate::resolver::MatchPolicy;

/// Default per-step timeout in seconds
pub const DEFAULT_STEP_TIMEOUT_SECS: u64 = 300;

/// Default fuzzy-suggestion acceptance threshold
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.75;

const STORE_FILE_NAME: &str = "macros.json";
const CONFIG_FILE_NAME: &str = "config.toml";

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("dev", "nlm", "nlm")
}

/// Directory holding the macro store by default
pub fn get_data_dir() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.data_dir().to_path_buf())
}

/// Path of the user-level config file, if a home directory can be determined
pub fn default_config_path() -> Option<PathBuf> {
    project_dirs().map(|dirs| dirs.config_dir().join(CONFIG_FILE_NAME))
}

fn default_store_path() -> PathBuf {
    get_data_dir()
        .unwrap_or_else(|| PathBuf::from(".nlm"))
        .join(STORE_FILE_NAME)
}

fn default_shell() -> String {
    if cfg!(windows) { "cmd" } else { "sh" }.to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    File,
    Memory,
}

impl std::str::FromStr for StoreBackend {
    type Err = MacroError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "file" => Ok(Self::File),
            "memory" => Ok(Self::Memory),
            other => Err(MacroError::Config(format!(
                "unknown store backend '{other}' (expected 'file' or 'memory')"
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store_path: PathBuf,
    pub store_backend: StoreBackend,
    pub step_timeout_secs: u64,
    pub shell: String,
    pub fuzzy_threshold: f64,
    pub on_error: FailurePolicy,
    pub safety_checks: bool,
    pub auto_confirm_safe: bool,
    pub match_policy: MatchPolicy,
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_path: default_store_path(),
            store_backend: StoreBackend::File,
            step_timeout_secs: DEFAULT_STEP_TIMEOUT_SECS,
            shell: default_shell(),
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            on_error: FailurePolicy::Halt,
            safety_checks: true,
            auto_confirm_safe: false,
            match_policy: MatchPolicy::FirstMatch,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load defaults, then the TOML file (explicit path or the user config
    /// file), then environment overrides, and validate the result.
    ///
    /// A missing default config file is fine; an explicit path must exist.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => match default_config_path().filter(|p| p.exists()) {
                Some(path) => Self::from_file(&path)?,
                None => Self::default(),
            },
        };
        config.merge_env_vars();
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML config file; fields it omits keep their defaults
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        tracing::debug!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    pub fn merge_env_vars(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    /// Apply `NLM_*` overrides from an arbitrary lookup. Unparsable values are
    /// ignored with a warning.
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(store) = lookup("NLM_STORE") {
            self.store_path = PathBuf::from(store);
        }

        if let Some(backend) = lookup("NLM_STORE_BACKEND") {
            match backend.parse() {
                Ok(backend) => self.store_backend = backend,
                Err(e) => tracing::warn!("Ignoring NLM_STORE_BACKEND: {e}"),
            }
        }

        if let Some(timeout) = lookup("NLM_STEP_TIMEOUT") {
            match timeout.trim().parse::<u64>() {
                Ok(secs) => self.step_timeout_secs = secs,
                Err(_) => tracing::warn!("Ignoring NLM_STEP_TIMEOUT: '{timeout}' is not a number"),
            }
        }

        if let Some(shell) = lookup("NLM_SHELL") {
            self.shell = shell;
        }

        if let Some(log_level) = lookup("NLM_LOG_LEVEL") {
            self.log_level = log_level;
        }

        if let Some(threshold) = lookup("NLM_FUZZY_THRESHOLD") {
            match threshold.trim().parse::<f64>() {
                Ok(value) => self.fuzzy_threshold = value,
                Err(_) => {
                    tracing::warn!("Ignoring NLM_FUZZY_THRESHOLD: '{threshold}' is not a number")
                }
            }
        }

        if let Some(checks) = lookup("NLM_SAFETY_CHECKS") {
            match checks.trim().parse::<bool>() {
                Ok(value) => self.safety_checks = value,
                Err(_) => tracing::warn!("Ignoring NLM_SAFETY_CHECKS: '{checks}' is not a bool"),
            }
        }
    }

    pub fn validate(&self) -> crate::error::Result<()> {
        if self.step_timeout_secs == 0 {
            return Err(MacroError::Config(
                "step_timeout_secs must be greater than zero".to_string(),
            ));
        }
        if !(self.fuzzy_threshold > 0.0 && self.fuzzy_threshold <= 1.0) {
            return Err(MacroError::Config(format!(
                "fuzzy_threshold must be in (0, 1], got {}",
                self.fuzzy_threshold
            )));
        }
        if self.shell.trim().is_empty() {
            return Err(MacroError::Config("shell must not be empty".to_string()));
        }
        Ok(())
    }

    pub fn step_timeout(&self) -> Duration {
        Duration::from_secs(self.step_timeout_secs)
    }
}
