//! Named remotes
//!
//! A remote binds a name to one backend variant and its connection settings.
//! Locations on the command line address remotes as `NAME:PATH`.

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::client::BackendKind;
use crate::config::ConfigManager;
use crate::error::{Error, Result};

/// Connection settings, one variant per backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum BackendConfig {
    S3 {
        endpoint: String,
        #[serde(default = "default_region")]
        region: String,
        access_key: String,
        secret_key: String,
        /// `auto`, `path` or `dns`
        #[serde(default = "default_bucket_lookup")]
        bucket_lookup: String,
    },
    #[serde(rename = "gdrive")]
    GoogleDrive {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        root_folder_id: Option<String>,
    },
    Http {
        base_url: String,
        #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
        headers: BTreeMap<String, String>,
    },
    Sftp {
        host: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        user: Option<String>,
        #[serde(default = "default_sftp_port")]
        port: u16,
    },
    Local {
        root: PathBuf,
    },
}

fn default_region() -> String {
    "us-east-1".to_string()
}

fn default_bucket_lookup() -> String {
    "auto".to_string()
}

fn default_sftp_port() -> u16 {
    22
}

impl BackendConfig {
    pub fn kind(&self) -> BackendKind {
        match self {
            BackendConfig::S3 { .. } => BackendKind::S3,
            BackendConfig::GoogleDrive { .. } => BackendKind::GoogleDrive,
            BackendConfig::Http { .. } => BackendKind::Http,
            BackendConfig::Sftp { .. } => BackendKind::Sftp,
            BackendConfig::Local { .. } => BackendKind::Local,
        }
    }

    /// Short human description without credentials
    pub fn summary(&self) -> String {
        match self {
            BackendConfig::S3 {
                endpoint, region, ..
            } => format!("{endpoint} ({region})"),
            BackendConfig::GoogleDrive { root_folder_id } => match root_folder_id {
                Some(id) => format!("folder {id}"),
                None => "my drive".to_string(),
            },
            BackendConfig::Http { base_url, .. } => base_url.clone(),
            BackendConfig::Sftp { host, user, port } => match user {
                Some(user) => format!("{user}@{host}:{port}"),
                None => format!("{host}:{port}"),
            },
            BackendConfig::Local { root } => root.display().to_string(),
        }
    }
}

/// A named backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Remote {
    pub name: String,

    #[serde(flatten)]
    pub backend: BackendConfig,
}

impl Remote {
    pub fn new(name: impl Into<String>, backend: BackendConfig) -> Self {
        Self {
            name: name.into(),
            backend,
        }
    }

    pub fn kind(&self) -> BackendKind {
        self.backend.kind()
    }
}

/// Reject names that could not be addressed as `NAME:PATH`
pub fn validate_remote_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::Config("remote name cannot be empty".to_string()));
    }
    if !name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(Error::Config(format!(
            "invalid remote name '{name}': use letters, digits, '-' or '_'"
        )));
    }
    // single letters would be ambiguous with Windows drive letters
    if name.len() == 1 {
        return Err(Error::Config(format!(
            "invalid remote name '{name}': must be at least two characters"
        )));
    }
    Ok(())
}

/// CRUD over the remotes stored in the configuration file
#[derive(Debug, Clone)]
pub struct RemoteManager {
    config: ConfigManager,
}

impl RemoteManager {
    pub fn new() -> Result<Self> {
        Ok(Self {
            config: ConfigManager::new()?,
        })
    }

    pub fn with_config(config: ConfigManager) -> Self {
        Self { config }
    }

    pub fn list(&self) -> Result<Vec<Remote>> {
        Ok(self.config.load()?.remotes)
    }

    pub fn get(&self, name: &str) -> Result<Remote> {
        self.list()?
            .into_iter()
            .find(|r| r.name == name)
            .ok_or_else(|| Error::RemoteNotFound(name.to_string()))
    }

    pub fn exists(&self, name: &str) -> Result<bool> {
        Ok(self.list()?.iter().any(|r| r.name == name))
    }

    /// Add a remote, replacing any existing one with the same name
    pub fn set(&self, remote: Remote) -> Result<()> {
        validate_remote_name(&remote.name)?;
        let mut config = self.config.load()?;
        match config.remotes.iter_mut().find(|r| r.name == remote.name) {
            Some(existing) => *existing = remote,
            None => config.remotes.push(remote),
        }
        self.config.save(&config)
    }

    pub fn remove(&self, name: &str) -> Result<()> {
        let mut config = self.config.load()?;
        let before = config.remotes.len();
        config.remotes.retain(|r| r.name != name);
        if config.remotes.len() == before {
            return Err(Error::RemoteNotFound(name.to_string()));
        }
        self.config.save(&config)
    }
}
