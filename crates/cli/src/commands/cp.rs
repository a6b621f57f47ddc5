//! cp command - Copy a single file between a local path and a remote

use std::path::{Path, PathBuf};

use clap::Args;
use omni_core::record::leaf_name;
use omni_core::{Direction, RemotePath};
use serde::Serialize;

use crate::commands::{parse_arg, resolve_transfer};
use crate::connect::open_remote;
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig, Role};

/// Copy a file; the direction follows from which side is remote
#[derive(Args, Debug)]
pub struct CpArgs {
    /// Source (local path or REMOTE:PATH)
    pub source: String,

    /// Destination (local path or REMOTE:PATH)
    pub destination: String,

    /// Content type for uploads; guessed from the file name when omitted
    #[arg(short = 't', long)]
    pub content_type: Option<String>,
}

#[derive(Debug, Serialize)]
struct CpOutput {
    status: &'static str,
    direction: Direction,
    source: String,
    destination: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    content_type: Option<String>,
}

/// Execute the cp command
pub async fn execute(args: CpArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let source = match parse_arg(&args.source, &formatter) {
        Ok(l) => l,
        Err(code) => return code,
    };
    let destination = match parse_arg(&args.destination, &formatter) {
        Ok(l) => l,
        Err(code) => return code,
    };

    let (local, remote, direction) = match resolve_transfer(source, destination) {
        Ok(t) => t,
        Err(message) => {
            formatter.error(&message);
            return ExitCode::UsageError;
        }
    };

    let client = match open_remote(&remote).await {
        Ok(c) => c,
        Err(e) => return formatter.fail(&format!("Failed to open remote '{}'", remote.remote), &e),
    };

    let (result, output) = match direction {
        Direction::Upload => {
            let remote_path = upload_target(&local, &remote);
            let content_type = args.content_type.clone().or_else(|| guess_content_type(&local));
            let result = client
                .upload(&local, &remote_path, content_type.as_deref())
                .await;
            let output = CpOutput {
                status: "success",
                direction,
                source: local.display().to_string(),
                destination: RemotePath::new(&remote.remote, remote_path).to_string(),
                content_type,
            };
            (result, output)
        }
        Direction::Download => {
            let local_path = download_target(&local, &remote.path);
            let result = client.download(&remote.path, &local_path).await;
            let output = CpOutput {
                status: "success",
                direction,
                source: remote.to_string(),
                destination: local_path.display().to_string(),
                content_type: None,
            };
            (result, output)
        }
    };

    if let Err(e) = result {
        return formatter.fail(&format!("Failed to {direction} '{}'", output.source), &e);
    }

    if formatter.is_json() {
        formatter.json(&output);
    } else {
        formatter.success(&format!(
            "{} -> {}",
            output.source,
            formatter.paint(Role::Location, &output.destination)
        ));
    }
    ExitCode::Success
}

/// Remote path for an upload; a folder-like destination keeps the file name
fn upload_target(local: &Path, remote: &RemotePath) -> String {
    let name = local
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    if remote.is_root() {
        name
    } else if remote.path.ends_with('/') {
        format!("{}{name}", remote.path)
    } else {
        remote.path.clone()
    }
}

/// Local path for a download; an existing directory keeps the remote name
fn download_target(local: &Path, remote_path: &str) -> PathBuf {
    if local.is_dir() {
        local.join(leaf_name(remote_path))
    } else {
        local.to_path_buf()
    }
}

fn guess_content_type(path: &Path) -> Option<String> {
    mime_guess::from_path(path)
        .first()
        .map(|m| m.essence_str().to_string())
}
