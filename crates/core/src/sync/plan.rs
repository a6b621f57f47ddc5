//! Transfer plans
//!
//! A plan is computed from the two relative-path sets without touching
//! either side, so it can be inspected, printed or tested on its own.

use std::collections::BTreeSet;
use std::fmt;
use std::path::PathBuf;

use serde::Serialize;

use crate::error::Error;

/// Which side is the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    /// local to remote
    Upload,
    /// remote to local
    Download,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Upload => f.write_str("upload"),
            Direction::Download => f.write_str("download"),
        }
    }
}

/// Plain copy transfers every source file; sync only adds what is missing
/// (and replaces what exists when overwriting)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncMode {
    Copy,
    Sync,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SyncOptions {
    /// Descend into subfolders
    pub recursive: bool,

    /// Replace files that already exist at the destination
    pub overwrite: bool,

    /// Record per-file failures and keep going instead of aborting
    pub skip_failures: bool,

    /// Never touch files that already exist at the destination
    pub skip_existing: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncAction {
    Transfer,
    Skip,
}

/// One source file and what will happen to it
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlanEntry {
    pub relative_path: String,
    pub action: SyncAction,
    pub exists_at_destination: bool,
}

/// The outcome of the planning phase
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncPlan {
    pub direction: Direction,
    pub mode: SyncMode,
    pub local_root: PathBuf,
    pub remote_root: String,
    pub options: SyncOptions,
    pub entries: Vec<PlanEntry>,
}

impl SyncPlan {
    /// Entries that will be transferred, in plan order
    pub fn transfers(&self) -> impl Iterator<Item = &PlanEntry> {
        self.entries
            .iter()
            .filter(|e| e.action == SyncAction::Transfer)
    }

    pub fn skipped(&self) -> impl Iterator<Item = &PlanEntry> {
        self.entries.iter().filter(|e| e.action == SyncAction::Skip)
    }

    pub fn transfer_count(&self) -> usize {
        self.transfers().count()
    }

    /// True when executing the plan would do nothing
    pub fn is_noop(&self) -> bool {
        self.transfer_count() == 0
    }
}

/// Decide an action for every source path.
///
/// Destination-only paths never appear in the result: nothing is ever
/// deleted from the destination.
pub fn plan_entries(
    source: &BTreeSet<String>,
    destination: &BTreeSet<String>,
    mode: SyncMode,
    options: &SyncOptions,
) -> Vec<PlanEntry> {
    source
        .iter()
        .map(|path| {
            let exists = destination.contains(path);
            let transfer = if !exists {
                true
            } else if options.skip_existing {
                false
            } else {
                match mode {
                    SyncMode::Copy => true,
                    SyncMode::Sync => options.overwrite,
                }
            };
            PlanEntry {
                relative_path: path.clone(),
                action: if transfer {
                    SyncAction::Transfer
                } else {
                    SyncAction::Skip
                },
                exists_at_destination: exists,
            }
        })
        .collect()
}

/// A transfer that failed while failures were being skipped
#[derive(Debug)]
pub struct TransferFailure {
    pub relative_path: String,
    pub error: Error,
}

impl fmt::Display for TransferFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.relative_path, self.error)
    }
}

/// Result of executing a plan or a batch delete
#[derive(Debug, Default)]
pub struct SyncReport {
    /// Relative paths that completed, in execution order
    pub completed: Vec<String>,

    /// Relative paths left untouched
    pub skipped: Vec<String>,

    /// Collected failures; always empty unless failures are skipped
    pub failures: Vec<TransferFailure>,
}

impl SyncReport {
    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }
}
