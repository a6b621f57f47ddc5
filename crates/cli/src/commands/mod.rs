//! Command definitions
//!
//! Each command lives in its own module and exposes an `execute` function
//! returning the process exit code.

use std::path::PathBuf;

use clap::Subcommand;
use omni_core::{Direction, Location, RemotePath, parse_location};

use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

pub mod completions;
pub mod cp;
pub mod info;
pub mod ls;
pub mod remote;
pub mod rm;
pub mod sync;

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// List a folder, with optional search, sort and limit
    Ls(ls::LsArgs),

    /// Show file or folder metadata
    Info(info::InfoArgs),

    /// Copy a single file between a local path and a remote
    Cp(cp::CpArgs),

    /// Copy or synchronize a directory between a local path and a remote
    Sync(sync::SyncArgs),

    /// Delete a file, a folder, or a folder's contents
    Rm(rm::RmArgs),

    /// Manage configured remotes
    #[command(subcommand)]
    Remote(remote::RemoteCommands),

    /// Generate shell completions
    Completions(completions::CompletionsArgs),
}

pub async fn execute(command: Commands, output_config: OutputConfig) -> ExitCode {
    match command {
        Commands::Ls(args) => ls::execute(args, output_config).await,
        Commands::Info(args) => info::execute(args, output_config).await,
        Commands::Cp(args) => cp::execute(args, output_config).await,
        Commands::Sync(args) => sync::execute(args, output_config).await,
        Commands::Rm(args) => rm::execute(args, output_config).await,
        Commands::Remote(cmd) => remote::execute(cmd, output_config).await,
        Commands::Completions(args) => completions::execute(args),
    }
}

/// Parse a command-line location, reporting failures as usage errors
pub(crate) fn parse_arg(input: &str, formatter: &Formatter) -> Result<Location, ExitCode> {
    parse_location(input).map_err(|e| {
        formatter.error(&format!("Invalid location '{input}': {e}"));
        ExitCode::UsageError
    })
}

/// Split a source/destination pair into the local side, the remote side and
/// the transfer direction. Exactly one side must be remote.
pub(crate) fn resolve_transfer(
    source: Location,
    destination: Location,
) -> Result<(PathBuf, RemotePath, Direction), String> {
    match (source, destination) {
        (Location::Local(local), Location::Remote(remote)) => {
            Ok((local, remote, Direction::Upload))
        }
        (Location::Remote(remote), Location::Local(local)) => {
            Ok((local, remote, Direction::Download))
        }
        (Location::Remote(_), Location::Remote(_)) => {
            Err("Copying between two remotes is not supported; go through a local folder".to_string())
        }
        (Location::Local(_), Location::Local(_)) => {
            Err("One side must be a remote location (NAME:PATH)".to_string())
        }
    }
}
