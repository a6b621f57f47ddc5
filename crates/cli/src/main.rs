//! omni - query and synchronize remote storage from one command line
//!
//! Every command talks to storage through `omni_core::StorageClient`, so the
//! same listing, search and sync features work against any configured remote.

mod commands;
mod connect;
mod exit_code;
mod output;

use anyhow::Context;
use clap::Parser;
use omni_core::{ConfigManager, Defaults};
use tracing_subscriber::EnvFilter;

use crate::commands::Commands;
use crate::exit_code::ExitCode;
use crate::output::OutputConfig;

/// Query and synchronize S3, HTTP and filesystem remotes
#[derive(Parser, Debug)]
#[command(name = "omni", version, about, propagate_version = true)]
pub struct Cli {
    /// Print strict JSON on stdout
    #[arg(long, global = true)]
    pub json: bool,

    /// Disable colored output (also honors NO_COLOR)
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Only print errors
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase log verbosity (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Commands,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let code = match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("omni: {e:#}");
            ExitCode::GeneralError
        }
    };

    std::process::exit(code.as_i32());
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    init_tracing(cli.quiet, cli.verbose)?;

    let defaults = load_defaults();
    let output_config = resolve_output(&cli, &defaults);

    Ok(commands::execute(cli.command, output_config).await)
}

fn init_tracing(quiet: bool, verbose: u8) -> anyhow::Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new(default_log_level(quiet, verbose)),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!(e))
        .context("failed to install log subscriber")
}

fn default_log_level(quiet: bool, verbose: u8) -> &'static str {
    match (quiet, verbose) {
        (true, _) => "error",
        (false, 0) => "warn",
        (false, 1) => "debug",
        (false, _) => "trace",
    }
}

/// Output defaults from the config file; a broken file only costs a warning
fn load_defaults() -> Defaults {
    match ConfigManager::new().and_then(|m| m.load()) {
        Ok(config) => config.defaults,
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring configuration defaults");
            Defaults::default()
        }
    }
}

fn resolve_output(cli: &Cli, defaults: &Defaults) -> OutputConfig {
    match defaults.color.as_str() {
        "always" => console::set_colors_enabled(true),
        "never" => console::set_colors_enabled(false),
        _ => {}
    }

    OutputConfig {
        json: cli.json || defaults.output == "json",
        no_color: cli.no_color
            || defaults.color == "never"
            || std::env::var_os("NO_COLOR").is_some_and(|v| !v.is_empty()),
        quiet: cli.quiet,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_is_well_formed() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["omni", "remote", "list", "--json", "-vv"]).unwrap();
        assert!(cli.json);
        assert_eq!(cli.verbose, 2);
    }

    #[test]
    fn test_default_log_level() {
        assert_eq!(default_log_level(false, 0), "warn");
        assert_eq!(default_log_level(false, 1), "debug");
        assert_eq!(default_log_level(false, 3), "trace");
        assert_eq!(default_log_level(true, 2), "error");
    }

    #[test]
    fn test_config_defaults_apply() {
        let cli = Cli::try_parse_from(["omni", "remote", "list"]).unwrap();
        let defaults = Defaults {
            output: "json".to_string(),
            color: "auto".to_string(),
        };
        let config = resolve_output(&cli, &defaults);
        assert!(config.json);
        assert!(!config.quiet);
    }
}
