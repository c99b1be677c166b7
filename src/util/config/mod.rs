//! strgraph configuration system
//!
//! # Configuration hierarchy
//!
//! ```text
//! Priority (high → low):
//! 1. CLI arguments
//! 2. Environment variables (STRGRAPH_MAX_DEPTH, STRGRAPH_THREADS, STRGRAPH_LOG)
//! 3. Config file (--config PATH, or ./strgraph.toml)
//! 4. Default values
//! ```
//!
//! # File format
//!
//! ```toml
//! [eval]
//! max_depth = 20000
//! parallel = true
//! threads = 4
//!
//! [log]
//! level = "debug"
//! ```
//!
//! # Usage
//!
//! ```rust
//! use strgraph::util::config::load_config;
//!
//! let config = load_config(None).unwrap();
//! assert!(config.eval.max_depth > 0);
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::eval::EvalConfig;
use crate::util::logger::LogLevel;

/// Default config file, looked up in the working directory.
pub const CONFIG_FILE: &str = "strgraph.toml";

pub const ENV_MAX_DEPTH: &str = "STRGRAPH_MAX_DEPTH";
pub const ENV_THREADS: &str = "STRGRAPH_THREADS";
pub const ENV_LOG: &str = "STRGRAPH_LOG";

/// Complete configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Evaluator settings
    #[serde(default)]
    pub eval: EvalConfig,
    /// Logging settings
    #[serde(default)]
    pub log: LogConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LogConfig {
    #[serde(default)]
    pub level: LogLevel,
}

impl Config {
    /// Parse a TOML document.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        toml::from_str(content).map_err(ConfigError::ParseError)
    }

    /// Read and parse a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::IoError {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&content)
    }

    /// Apply overrides from the process environment.
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup`, keyed by environment variable name.
    pub fn apply_env_from<F>(
        &mut self,
        lookup: F,
    ) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(value) = lookup(ENV_MAX_DEPTH) {
            self.eval.max_depth = parse_env(ENV_MAX_DEPTH, &value)?;
        }
        if let Some(value) = lookup(ENV_THREADS) {
            self.eval.threads = parse_env(ENV_THREADS, &value)?;
            if self.eval.threads > 0 {
                self.eval.parallel = true;
            }
        }
        if let Some(value) = lookup(ENV_LOG) {
            self.log.level = parse_env(ENV_LOG, &value)?;
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(
    var: &'static str,
    value: &str,
) -> Result<T, ConfigError> {
    value.trim().parse().map_err(|_| ConfigError::InvalidEnv {
        var,
        value: value.to_string(),
    })
}

/// Load configuration: an explicit file must exist, otherwise `./strgraph.toml`
/// is used when present. Environment overrides are applied on top.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let mut config = match path {
        Some(path) => Config::from_file(path)?,
        None => {
            let default = Path::new(CONFIG_FILE);
            if default.exists() {
                Config::from_file(default)?
            } else {
                Config::default()
            }
        }
    };
    config.apply_env()?;
    Ok(config)
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error reading {}: {source}", .path.display())]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Config parse error: {0}")]
    ParseError(toml::de::Error),

    #[error("invalid value '{value}' for {var}")]
    InvalidEnv { var: &'static str, value: String },
}
