//! Remote management commands
//!
//! Remotes are named backends with their connection settings, addressed on
//! the command line as `NAME:PATH`.

use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Subcommand;
use omni_core::{BackendConfig, Remote, RemoteManager};
use serde::Serialize;

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig, Role};

/// Remote subcommands
#[derive(Subcommand, Debug)]
pub enum RemoteCommands {
    /// Add or update a remote
    Set(SetArgs),

    /// List configured remotes
    List(ListArgs),

    /// Remove a remote
    Remove(RemoveArgs),
}

/// Arguments for the `remote set` command
#[derive(clap::Args, Debug)]
pub struct SetArgs {
    /// Remote name (letters, digits, '-' or '_'; at least two characters)
    pub name: String,

    #[command(subcommand)]
    pub backend: BackendArgs,
}

/// Backend type and its connection settings
#[derive(Subcommand, Debug)]
pub enum BackendArgs {
    /// S3-compatible object storage
    S3 {
        /// Endpoint URL (e.g. `http://localhost:9000`, `https://s3.amazonaws.com`)
        endpoint: String,

        /// Access key ID
        access_key: String,

        /// Secret access key
        secret_key: String,

        #[arg(long, default_value = "us-east-1")]
        region: String,

        /// Bucket lookup style: auto, path, or dns
        #[arg(long, default_value = "auto")]
        bucket_lookup: String,
    },

    /// Plain HTTP server addressed by URL path
    Http {
        /// Base URL every path is resolved against
        base_url: String,

        /// Extra request header as "Name: value" (repeatable)
        #[arg(short = 'H', long = "header")]
        headers: Vec<String>,
    },

    /// Directory on this machine or a mounted filesystem
    Local {
        root: PathBuf,
    },

    /// SFTP server
    Sftp {
        host: String,

        #[arg(long)]
        user: Option<String>,

        #[arg(long, default_value_t = 22)]
        port: u16,
    },

    /// Google Drive
    Gdrive {
        /// Folder id used as the root; defaults to My Drive
        #[arg(long)]
        root_folder_id: Option<String>,
    },
}

impl BackendArgs {
    fn into_config(self) -> Result<BackendConfig, String> {
        match self {
            BackendArgs::S3 {
                endpoint,
                access_key,
                secret_key,
                region,
                bucket_lookup,
            } => {
                if endpoint.is_empty() {
                    return Err("Endpoint URL cannot be empty".to_string());
                }
                if !matches!(bucket_lookup.as_str(), "auto" | "path" | "dns") {
                    return Err("Bucket lookup must be 'auto', 'path', or 'dns'".to_string());
                }
                Ok(BackendConfig::S3 {
                    endpoint,
                    region,
                    access_key,
                    secret_key,
                    bucket_lookup,
                })
            }
            BackendArgs::Http { base_url, headers } => Ok(BackendConfig::Http {
                base_url,
                headers: parse_headers(&headers)?,
            }),
            BackendArgs::Local { root } => Ok(BackendConfig::Local { root }),
            BackendArgs::Sftp { host, user, port } => Ok(BackendConfig::Sftp { host, user, port }),
            BackendArgs::Gdrive { root_folder_id } => {
                Ok(BackendConfig::GoogleDrive { root_folder_id })
            }
        }
    }
}

fn parse_headers(headers: &[String]) -> Result<BTreeMap<String, String>, String> {
    headers
        .iter()
        .map(|h| match h.split_once(':') {
            Some((name, value)) if !name.trim().is_empty() => {
                Ok((name.trim().to_string(), value.trim().to_string()))
            }
            _ => Err(format!("Invalid header '{h}', expected 'Name: value'")),
        })
        .collect()
}

/// Arguments for the `remote list` command
#[derive(clap::Args, Debug)]
pub struct ListArgs {
    /// Show connection details
    #[arg(short, long)]
    pub long: bool,
}

/// Arguments for the `remote remove` command
#[derive(clap::Args, Debug)]
pub struct RemoveArgs {
    /// Name of the remote to remove
    pub name: String,
}

#[derive(Serialize)]
struct RemoteListOutput {
    remotes: Vec<RemoteInfo>,
}

/// Remote information for JSON output (without credentials)
#[derive(Serialize)]
struct RemoteInfo {
    name: String,
    #[serde(rename = "type")]
    kind: String,
    summary: String,
}

impl From<&Remote> for RemoteInfo {
    fn from(remote: &Remote) -> Self {
        Self {
            name: remote.name.clone(),
            kind: remote.kind().to_string(),
            summary: remote.backend.summary(),
        }
    }
}

#[derive(Serialize)]
struct RemoteOperationOutput {
    success: bool,
    remote: String,
    message: String,
}

/// Execute a remote subcommand
pub async fn execute(cmd: RemoteCommands, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);
    let manager = match RemoteManager::new() {
        Ok(m) => m,
        Err(e) => return formatter.fail("Failed to load configuration", &e),
    };

    match cmd {
        RemoteCommands::Set(args) => execute_set(args, &manager, &formatter),
        RemoteCommands::List(args) => execute_list(args, &manager, &formatter),
        RemoteCommands::Remove(args) => execute_remove(args, &manager, &formatter),
    }
}

fn execute_set(args: SetArgs, manager: &RemoteManager, formatter: &Formatter) -> ExitCode {
    let backend = match args.backend.into_config() {
        Ok(b) => b,
        Err(message) => {
            formatter.error(&message);
            return ExitCode::UsageError;
        }
    };

    match manager.set(Remote::new(&args.name, backend)) {
        Ok(()) => {
            let message = format!("Remote '{}' configured successfully", args.name);
            if formatter.is_json() {
                formatter.json(&RemoteOperationOutput {
                    success: true,
                    remote: args.name,
                    message,
                });
            } else {
                let styled_name = formatter.paint(Role::Remote, &args.name);
                formatter.success(&format!("Remote '{styled_name}' configured successfully."));
            }
            ExitCode::Success
        }
        Err(e) => formatter.fail("Failed to save remote", &e),
    }
}

fn execute_list(args: ListArgs, manager: &RemoteManager, formatter: &Formatter) -> ExitCode {
    let remotes = match manager.list() {
        Ok(r) => r,
        Err(e) => return formatter.fail("Failed to load remotes", &e),
    };

    if formatter.is_json() {
        formatter.json(&RemoteListOutput {
            remotes: remotes.iter().map(RemoteInfo::from).collect(),
        });
    } else if remotes.is_empty() {
        formatter.println("No remotes configured.");
    } else {
        for remote in &remotes {
            let styled_name = formatter.paint(Role::Remote, &format!("{:<12}", remote.name));
            let kind = format!("{:<7}", remote.kind());
            if args.long {
                let styled_summary = formatter.paint(Role::Location, &remote.backend.summary());
                formatter.println(&format!("{styled_name} {kind} {styled_summary}"));
            } else {
                formatter.println(&format!("{styled_name} {}", kind.trim_end()));
            }
        }
    }
    ExitCode::Success
}

fn execute_remove(args: RemoveArgs, manager: &RemoteManager, formatter: &Formatter) -> ExitCode {
    match manager.remove(&args.name) {
        Ok(()) => {
            let message = format!("Remote '{}' removed successfully", args.name);
            if formatter.is_json() {
                formatter.json(&RemoteOperationOutput {
                    success: true,
                    remote: args.name,
                    message,
                });
            } else {
                let styled_name = formatter.paint(Role::Remote, &args.name);
                formatter.success(&format!("Remote '{styled_name}' removed successfully."));
            }
            ExitCode::Success
        }
        Err(e) => formatter.fail("Failed to remove remote", &e),
    }
}
