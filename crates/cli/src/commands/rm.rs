//! rm command - Delete a file, a folder, or everything inside a folder

use clap::Args;
use omni_core::DirSync;
use serde::Serialize;

use crate::connect::open_remote;
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig, Role};

/// Delete remote files or folders
#[derive(Args, Debug)]
pub struct RmArgs {
    /// Path to delete (REMOTE:PATH)
    pub path: String,

    /// Delete a folder and everything below it
    #[arg(long)]
    pub folder: bool,

    /// Delete the folder's children but keep the folder itself
    #[arg(long, requires = "folder")]
    pub contents_only: bool,

    /// Keep going when a child cannot be deleted (with --contents-only)
    #[arg(long, requires = "contents_only")]
    pub skip_failures: bool,
}

#[derive(Debug, Serialize)]
struct RmOutput {
    path: String,
    deleted: Vec<String>,
    failures: Vec<FailureInfo>,
}

#[derive(Debug, Serialize)]
struct FailureInfo {
    path: String,
    error: String,
}

/// Execute the rm command
pub async fn execute(args: RmArgs, output_config: OutputConfig) -> ExitCode {
    let formatter = Formatter::new(output_config);

    let remote = match omni_core::parse_remote(&args.path) {
        Ok(r) => r,
        Err(e) => return formatter.fail(&format!("Invalid location '{}'", args.path), &e),
    };

    let client = match open_remote(&remote).await {
        Ok(c) => c,
        Err(e) => return formatter.fail(&format!("Failed to open remote '{}'", remote.remote), &e),
    };

    if args.contents_only {
        let report = match DirSync::new(client.as_ref())
            .delete_folder_contents(&remote.path, args.skip_failures)
            .await
        {
            Ok(r) => r,
            Err(e) => return formatter.fail(&format!("Failed to clear {remote}"), &e),
        };

        if formatter.is_json() {
            formatter.json(&RmOutput {
                path: remote.to_string(),
                deleted: report.completed.clone(),
                failures: report
                    .failures
                    .iter()
                    .map(|f| FailureInfo {
                        path: f.relative_path.clone(),
                        error: f.error.to_string(),
                    })
                    .collect(),
            });
        } else {
            for failure in &report.failures {
                formatter.error(&format!("Failed to delete {failure}"));
            }
            formatter.success(&format!(
                "Cleared {}: {} deleted, {} failed",
                formatter.paint(Role::Location, &remote.to_string()),
                report.completed.len(),
                report.failures.len()
            ));
        }

        return if report.is_success() {
            ExitCode::Success
        } else {
            ExitCode::GeneralError
        };
    }

    let result = if args.folder {
        client.delete_folder(&remote.path).await
    } else {
        client.delete(&remote.path).await
    };

    if let Err(e) = result {
        return formatter.fail(&format!("Failed to delete {remote}"), &e);
    }

    if formatter.is_json() {
        formatter.json(&RmOutput {
            path: remote.to_string(),
            deleted: vec![remote.path.clone()],
            failures: Vec::new(),
        });
    } else {
        formatter.success(&format!("Deleted {}", formatter.paint(Role::Location, &remote.to_string())));
    }
    ExitCode::Success
}
