//! sync command - Copy or synchronize a directory between a local path and a remote
//!
//! The plan is computed before anything is transferred, so `--dry-run`
//! shows exactly what a real run would do.

use clap::Args;
use indicatif::{ProgressBar, ProgressStyle};
use omni_core::sync::PlanEntry;
use omni_core::{DirSync, Direction, SyncMode, SyncOptions, SyncPlan, SyncReport};
use serde::Serialize;

use crate::commands::{parse_arg, resolve_transfer};
use crate::connect::open_remote;
use crate::exit_code::ExitCode;
use crate::output::{Formatter, OutputConfig};

/// Copy or synchronize a directory
#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Source folder (local path or REMOTE:PATH)
    pub source: String,

    /// Destination folder (local path or REMOTE:PATH)
    pub destination: String,

    /// Include subfolders
    #[arg(short, long)]
    pub recursive: bool,

    /// Replace files that already exist at the destination
    #[arg(long)]
    pub overwrite: bool,

    /// Keep going when a transfer fails and report failures at the end
    #[arg(long)]
    pub skip_failures: bool,

    /// Never touch files that already exist at the destination
    #[arg(long, conflicts_with = "overwrite")]
    pub skip_existing: bool,

    /// Transfer every source file instead of only the missing ones
    #[arg(long)]
    pub copy: bool,

    /// Show the plan without transferring anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}

impl SyncArgs {
    fn mode(&self) -> SyncMode {
        if self.copy {
            SyncMode::Copy
        } else {
            SyncMode::Sync
        }
    }

    fn options(&self) -> SyncOptions {
        SyncOptions {
            recursive: self.recursive,
            overwrite: self.overwrite,
            skip_failures: self.skip_failures,
            skip_existing: self.skip_existing,
        }
    }
}

#[derive(Debug, Serialize)]
struct SyncOutput {
    source: String,
    destination: String,
    direction: Direction,
    mode: SyncMode,
    dry_run: bool,
    transferred: Vec<String>,
    skipped: Vec<String>,
    failures: Vec<FailureInfo>,
}

#[derive(Debug, Serialize)]
struct FailureInfo {
    path: String,
    error: String,
}

/// Execute the sync command
pub async fn execute(args: SyncArgs, output_config: OutputConfig) -> ExitCode {
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
    let engine = DirSync::new(client.as_ref());

    let plan = match engine
        .plan(direction, args.mode(), &local, &remote.path, args.options())
        .await
    {
        Ok(p) => p,
        Err(e) => return formatter.fail("Failed to plan transfer", &e),
    };

    if args.dry_run {
        print_plan(&args, &plan, &formatter);
        return ExitCode::Success;
    }

    let progress = progress_bar(&plan, &formatter);
    let result = engine
        .execute_with(&plan, |entry: &PlanEntry| {
            if let Some(pb) = &progress {
                pb.set_message(entry.relative_path.clone());
                pb.inc(1);
            } else if !formatter.is_json() {
                formatter.println(&format!("+ {}", entry.relative_path));
            }
        })
        .await;
    if let Some(pb) = &progress {
        pb.finish_and_clear();
    }

    let report = match result {
        Ok(r) => r,
        Err(e) => return formatter.fail("Transfer aborted", &e),
    };

    print_report(&args, &plan, &report, &formatter);

    if report.is_success() {
        ExitCode::Success
    } else {
        ExitCode::GeneralError
    }
}

fn progress_bar(plan: &SyncPlan, formatter: &Formatter) -> Option<ProgressBar> {
    if !formatter.show_progress() || plan.is_noop() {
        return None;
    }
    let pb = ProgressBar::new(plan.transfer_count() as u64);
    let style = ProgressStyle::default_bar()
        .template("{spinner:.green} [{bar:40.cyan/blue}] {pos}/{len} {msg}")
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    pb.set_style(style);
    Some(pb)
}

fn print_plan(args: &SyncArgs, plan: &SyncPlan, formatter: &Formatter) {
    if formatter.is_json() {
        formatter.json(&SyncOutput {
            source: args.source.clone(),
            destination: args.destination.clone(),
            direction: plan.direction,
            mode: plan.mode,
            dry_run: true,
            transferred: plan.transfers().map(|e| e.relative_path.clone()).collect(),
            skipped: plan.skipped().map(|e| e.relative_path.clone()).collect(),
            failures: Vec::new(),
        });
        return;
    }

    formatter.println("Dry run mode - no changes will be made:");
    for entry in plan.transfers() {
        let marker = if entry.exists_at_destination { "~" } else { "+" };
        formatter.println(&format!("  {marker} {}", entry.relative_path));
    }
    formatter.println(&format!(
        "Summary: {} to {}, {} skipped",
        plan.transfer_count(),
        plan.direction,
        plan.skipped().count()
    ));
}

fn print_report(args: &SyncArgs, plan: &SyncPlan, report: &SyncReport, formatter: &Formatter) {
    if formatter.is_json() {
        formatter.json(&SyncOutput {
            source: args.source.clone(),
            destination: args.destination.clone(),
            direction: plan.direction,
            mode: plan.mode,
            dry_run: false,
            transferred: report.completed.clone(),
            skipped: report.skipped.clone(),
            failures: report
                .failures
                .iter()
                .map(|f| FailureInfo {
                    path: f.relative_path.clone(),
                    error: f.error.to_string(),
                })
                .collect(),
        });
        return;
    }

    for failure in &report.failures {
        formatter.error(&format!("Failed to {} {failure}", plan.direction));
    }
    if !report.failures.is_empty() {
        formatter.warning("Rerun the same command to retry; completed files are skipped");
    }
    formatter.println(&format!(
        "Sync complete: {} transferred, {} skipped, {} failed",
        report.completed.len(),
        report.skipped.len(),
        report.failures.len()
    ));
}
