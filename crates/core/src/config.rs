//! Configuration file handling
//!
//! The configuration lives in `config.toml` under `$OMNI_CONFIG_DIR`, or
//! under `omni/` in the platform config directory when the variable is unset.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::remote::Remote;

/// Current configuration schema version
pub const SCHEMA_VERSION: u32 = 1;

/// Environment variable that overrides the configuration directory
pub const CONFIG_DIR_ENV: &str = "OMNI_CONFIG_DIR";

const CONFIG_FILE: &str = "config.toml";

/// Output defaults applied when no flag overrides them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Defaults {
    /// `human` or `json`
    #[serde(default = "default_output")]
    pub output: String,

    /// `auto`, `always` or `never`
    #[serde(default = "default_color")]
    pub color: String,
}

fn default_output() -> String {
    "human".to_string()
}

fn default_color() -> String {
    "auto".to_string()
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,

    #[serde(default)]
    pub defaults: Defaults,

    #[serde(default)]
    pub remotes: Vec<Remote>,
}

fn default_version() -> u32 {
    SCHEMA_VERSION
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: SCHEMA_VERSION,
            defaults: Defaults::default(),
            remotes: Vec::new(),
        }
    }
}

/// Loads and saves [`Config`] from a TOML file
#[derive(Debug, Clone)]
pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    /// Use the default configuration location
    pub fn new() -> Result<Self> {
        Ok(Self {
            path: config_dir()?.join(CONFIG_FILE),
        })
    }

    /// Use an explicit configuration file
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the configuration; a missing file yields the defaults
    pub fn load(&self) -> Result<Config> {
        let content = match std::fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "No configuration file, using defaults");
                return Ok(Config::default());
            }
            Err(e) => return Err(e.into()),
        };

        let config: Config = toml::from_str(&content)?;
        if config.version > SCHEMA_VERSION {
            return Err(Error::Config(format!(
                "{} uses schema version {}, newer than supported version {SCHEMA_VERSION}",
                self.path.display(),
                config.version
            )));
        }

        Ok(config)
    }

    /// Write the configuration, creating the directory if needed
    pub fn save(&self, config: &Config) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(config)?;
        std::fs::write(&self.path, content)?;
        tracing::debug!(path = %self.path.display(), "Saved configuration");
        Ok(())
    }
}

fn config_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV).filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    dirs::config_dir()
        .map(|dir| dir.join("omni"))
        .ok_or_else(|| Error::Config("cannot determine the configuration directory".to_string()))
}
