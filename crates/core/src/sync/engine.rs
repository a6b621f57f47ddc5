//! Directory copy and sync between a local folder and a remote folder
//!
//! Every operation runs in two phases. Planning lists both sides and builds
//! a [`SyncPlan`] without side effects; a listing error therefore aborts
//! before anything has been transferred. Executing then walks the plan in
//! order, one transfer at a time.

use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;

use super::plan::{
    Direction, PlanEntry, SyncMode, SyncOptions, SyncPlan, SyncReport, TransferFailure,
    plan_entries,
};
use crate::client::StorageClient;
use crate::error::{Error, Result};

/// Sync engine bound to one storage client
pub struct DirSync<'c> {
    client: &'c dyn StorageClient,
}

impl<'c> DirSync<'c> {
    pub fn new(client: &'c dyn StorageClient) -> Self {
        Self { client }
    }

    /// Planning phase: list both sides and decide what to transfer
    pub async fn plan(
        &self,
        direction: Direction,
        mode: SyncMode,
        local_root: &Path,
        remote_root: &str,
        options: SyncOptions,
    ) -> Result<SyncPlan> {
        // plain copy never diffs unless existing files must be spared
        let needs_destination = mode == SyncMode::Sync || options.skip_existing;

        let (source, destination) = match direction {
            Direction::Upload => {
                let source = list_local_files(local_root, options.recursive, true).await?;
                let destination = if needs_destination {
                    self.remote_files(remote_root, options.recursive, false).await?
                } else {
                    BTreeSet::new()
                };
                (source, destination)
            }
            Direction::Download => {
                let source = self.remote_files(remote_root, options.recursive, true).await?;
                // remote keys become local paths; refuse the whole plan if one would escape
                for path in &source {
                    check_relative(path)?;
                }
                let destination = if needs_destination {
                    list_local_files(local_root, options.recursive, false).await?
                } else {
                    BTreeSet::new()
                };
                (source, destination)
            }
        };

        let entries = plan_entries(&source, &destination, mode, &options);
        let plan = SyncPlan {
            direction,
            mode,
            local_root: local_root.to_path_buf(),
            remote_root: remote_root.to_string(),
            options,
            entries,
        };

        tracing::debug!(
            %direction,
            source = source.len(),
            destination = destination.len(),
            transfers = plan.transfer_count(),
            "Planned directory {}",
            if mode == SyncMode::Sync { "sync" } else { "copy" }
        );

        Ok(plan)
    }

    /// Executing phase
    pub async fn execute(&self, plan: &SyncPlan) -> Result<SyncReport> {
        self.execute_with(plan, |_| {}).await
    }

    /// Executing phase, calling `on_transfer` before each transfer starts
    pub async fn execute_with<F>(&self, plan: &SyncPlan, mut on_transfer: F) -> Result<SyncReport>
    where
        F: FnMut(&PlanEntry) + Send,
    {
        let mut report = SyncReport {
            skipped: plan.skipped().map(|e| e.relative_path.clone()).collect(),
            ..Default::default()
        };

        for entry in plan.transfers() {
            on_transfer(entry);
            tracing::debug!(path = %entry.relative_path, direction = %plan.direction, "Transferring");

            match self.transfer(plan, entry).await {
                Ok(()) => report.completed.push(entry.relative_path.clone()),
                Err(e) if plan.options.skip_failures => {
                    tracing::warn!(path = %entry.relative_path, error = %e, "Transfer failed, continuing");
                    report.failures.push(TransferFailure {
                        relative_path: entry.relative_path.clone(),
                        error: e,
                    });
                }
                Err(e) => return Err(Error::transfer(&entry.relative_path, e)),
            }
        }

        tracing::info!(
            transferred = report.completed.len(),
            skipped = report.skipped.len(),
            failed = report.failures.len(),
            "Directory {} finished",
            plan.direction
        );

        Ok(report)
    }

    /// Transfer every source file, replacing anything at the destination
    pub async fn copy_dir(
        &self,
        direction: Direction,
        local_root: &Path,
        remote_root: &str,
        options: SyncOptions,
    ) -> Result<SyncReport> {
        let plan = self
            .plan(direction, SyncMode::Copy, local_root, remote_root, options)
            .await?;
        self.execute(&plan).await
    }

    /// Transfer source files missing at the destination, plus existing ones
    /// when overwriting. Destination-only files are left alone.
    pub async fn sync_dir(
        &self,
        direction: Direction,
        local_root: &Path,
        remote_root: &str,
        options: SyncOptions,
    ) -> Result<SyncReport> {
        let plan = self
            .plan(direction, SyncMode::Sync, local_root, remote_root, options)
            .await?;
        self.execute(&plan).await
    }

    /// Delete everything inside a remote folder but keep the folder itself
    pub async fn delete_folder_contents(&self, path: &str, skip_failures: bool) -> Result<SyncReport> {
        let children = self.client.list_folder(path, false).await?;
        let mut report = SyncReport::default();

        for child in children {
            let target = self.client.join(path, &child.path);
            let result = if child.is_folder {
                self.client.delete_folder(&target).await
            } else {
                self.client.delete(&target).await
            };

            match result {
                Ok(()) => report.completed.push(child.path),
                Err(e) if skip_failures => {
                    tracing::warn!(path = %child.path, error = %e, "Delete failed, continuing");
                    report.failures.push(TransferFailure {
                        relative_path: child.path,
                        error: e,
                    });
                }
                Err(e) => return Err(Error::transfer(child.path, e)),
            }
        }

        tracing::info!(
            deleted = report.completed.len(),
            failed = report.failures.len(),
            "Cleared folder contents"
        );

        Ok(report)
    }

    async fn transfer(&self, plan: &SyncPlan, entry: &PlanEntry) -> Result<()> {
        let local = local_join(&plan.local_root, &entry.relative_path);
        let remote = self.client.join(&plan.remote_root, &entry.relative_path);

        match plan.direction {
            Direction::Upload => {
                let content_type = mime_guess::from_path(&entry.relative_path)
                    .first()
                    .map(|m| m.essence_str().to_string());
                self.client
                    .upload(&local, &remote, content_type.as_deref())
                    .await
            }
            Direction::Download => {
                check_relative(&entry.relative_path)?;
                self.client.download(&remote, &local).await
            }
        }
    }

    /// Relative paths of remote files. A missing folder on the destination
    /// side is treated as empty.
    async fn remote_files(&self, root: &str, recursive: bool, is_source: bool) -> Result<BTreeSet<String>> {
        match self.client.list_folder(root, recursive).await {
            Ok(records) => Ok(records
                .into_iter()
                .filter(|r| !r.is_folder)
                .map(|r| r.path)
                .collect()),
            Err(Error::NotFound(_)) if !is_source => Ok(BTreeSet::new()),
            Err(e) => Err(e),
        }
    }
}

/// Accept only relative paths made of plain names, so that joining them
/// onto a local root can never leave it
fn check_relative(path: &str) -> Result<()> {
    let plain = !path.is_empty()
        && Path::new(path)
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
    if plain {
        Ok(())
    } else {
        Err(Error::InvalidPath(format!(
            "'{path}' would be written outside the destination folder"
        )))
    }
}

/// Append a `/`-separated relative path to a local root
fn local_join(root: &Path, relative: &str) -> PathBuf {
    relative
        .split('/')
        .filter(|s| !s.is_empty())
        .fold(root.to_path_buf(), |path, segment| path.join(segment))
}

/// Relative paths of local files. A missing folder on the destination side
/// is treated as empty.
async fn list_local_files(root: &Path, recursive: bool, is_source: bool) -> Result<BTreeSet<String>> {
    let root = root.to_path_buf();
    tokio::task::spawn_blocking(move || {
        if !root.exists() {
            return if is_source {
                Err(Error::NotFound(root.display().to_string()))
            } else {
                Ok(BTreeSet::new())
            };
        }
        if !root.is_dir() {
            return Err(Error::InvalidPath(format!("{} is not a folder", root.display())));
        }

        let depth = if recursive { usize::MAX } else { 1 };
        let mut files = BTreeSet::new();
        for entry in WalkDir::new(&root).min_depth(1).max_depth(depth) {
            let entry = entry.map_err(|e| Error::Io(e.into()))?;
            if !entry.file_type().is_file() {
                continue;
            }
            let relative = entry
                .path()
                .strip_prefix(&root)
                .unwrap_or(entry.path())
                .components()
                .map(|c| c.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");
            files.insert(relative);
        }
        Ok(files)
    })
    .await
    .map_err(|e| Error::General(format!("listing task failed: {e}")))?
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_join() {
        let root = Path::new("/data");
        assert_eq!(local_join(root, "a/b.txt"), PathBuf::from("/data/a/b.txt"));
        assert_eq!(local_join(root, "c.txt"), PathBuf::from("/data/c.txt"));
    }

    #[test]
    fn test_check_relative() {
        assert!(check_relative("a.txt").is_ok());
        assert!(check_relative("deep/nested/b.png").is_ok());
        for bad in ["", "../up.txt", "a/../../b", "/etc/passwd", "./a", "a/.."] {
            assert!(
                matches!(check_relative(bad), Err(Error::InvalidPath(_))),
                "{bad:?} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_list_local_files_missing_root() {
        let dir = tempfile::TempDir::new().unwrap();
        let missing = dir.path().join("missing");
        assert!(list_local_files(&missing, true, false).await.unwrap().is_empty());
        assert!(matches!(
            list_local_files(&missing, true, true).await,
            Err(Error::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_list_local_files_depth() {
        let dir = tempfile::TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("a.txt"), b"a").unwrap();
        std::fs::write(dir.path().join("sub/b.txt"), b"b").unwrap();

        let flat = list_local_files(dir.path(), false, true).await.unwrap();
        assert_eq!(flat.into_iter().collect::<Vec<_>>(), ["a.txt"]);

        let deep = list_local_files(dir.path(), true, true).await.unwrap();
        assert_eq!(deep.into_iter().collect::<Vec<_>>(), ["a.txt", "sub/b.txt"]);
    }
}
