//! Configuration management for rails-routes
//!
//! Values are resolved once at startup and then passed explicitly to the
//! command builder and process runner. Later sources win:
//! defaults, JSON config file, environment, command-line flags.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::paths::Paths;

/// Environment variable naming the Rails application root
pub const ENV_APP_PATH: &str = "RAILS_APP_PATH";
/// Environment variable naming the rails executable
pub const ENV_RAILS_COMMAND: &str = "RAILS_COMMAND";
/// Environment variable overriding the command timeout (seconds)
pub const ENV_TIMEOUT: &str = "RAILS_ROUTES_TIMEOUT";

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("max_concurrent must be at least 1")]
    ZeroConcurrency,
}

/// rails-routes configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Root of the Rails application; commands run from here
    #[serde(default = "default_app_path")]
    pub app_path: PathBuf,

    /// Shell snippet invoking rails (e.g. `bundle exec rails`);
    /// defaults to `<app_path>/bin/rails`
    #[serde(default)]
    pub rails_command: Option<String>,

    /// Value exported as RAILS_ENV
    #[serde(default = "default_rails_env")]
    pub rails_env: String,

    /// Seconds before a route command is abandoned (0 disables)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Maximum number of route commands running at once
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

fn default_app_path() -> PathBuf {
    PathBuf::from(".")
}

fn default_rails_env() -> String {
    "development".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_max_concurrent() -> usize {
    4
}

impl Default for Config {
    fn default() -> Self {
        Self {
            app_path: default_app_path(),
            rails_command: None,
            rails_env: default_rails_env(),
            timeout_secs: default_timeout_secs(),
            max_concurrent: default_max_concurrent(),
        }
    }
}

impl Config {
    /// Load config from file, falling back to defaults when it does not exist
    pub fn load(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config {}", path.display()))?;
            let config = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config {}", path.display()))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from the standard location
    pub fn load_default(paths: &Paths) -> Result<Self> {
        Self::load(&paths.config_file())
    }

    /// Apply environment overrides read through `lookup`.
    ///
    /// Empty values are ignored so an exported-but-blank variable does not
    /// clobber the file configuration.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        if let Some(path) = get(ENV_APP_PATH) {
            self.app_path = PathBuf::from(path);
        }
        if let Some(cmd) = get(ENV_RAILS_COMMAND) {
            self.rails_command = Some(cmd);
        }
        if let Some(secs) = get(ENV_TIMEOUT) {
            self.timeout_secs = secs.parse().map_err(|_| ConfigError::InvalidValue {
                key: ENV_TIMEOUT.to_string(),
                value: secs.clone(),
            })?;
        }

        Ok(())
    }

    /// Apply overrides from the process environment
    pub fn apply_process_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env(|key| std::env::var(key).ok())
    }

    /// Check values that would make the server unusable
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_concurrent == 0 {
            return Err(ConfigError::ZeroConcurrency);
        }
        Ok(())
    }

    /// The application's own `bin/rails`, used when no command is configured
    pub fn binstub(&self) -> PathBuf {
        Paths::rails_binstub(&self.app_path)
    }

    /// Command timeout, `None` when disabled
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}
