//! Local filesystem backend
//!
//! Serves a directory tree through the [`StorageClient`] contract. Useful for
//! remote filesystems that are mounted locally, and as the reference backend
//! in tests.

use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use jiff::Timestamp;
use walkdir::WalkDir;

use crate::client::{BackendKind, StorageClient};
use crate::error::{Error, Result};
use crate::record::{MetadataRecord, leaf_name};

/// Storage client rooted at a local directory
#[derive(Debug, Clone)]
pub struct LocalClient {
    root: PathBuf,
}

impl LocalClient {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn container(&self) -> String {
        self.root.display().to_string()
    }

    /// Map a remote path onto the root, refusing to escape it
    fn resolve(&self, path: &str) -> Result<PathBuf> {
        let relative = Path::new(path.trim_start_matches('/'));
        if relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(Error::InvalidPath(format!(
                "'{path}' must stay below {}",
                self.root.display()
            )));
        }
        Ok(self.root.join(relative))
    }
}

fn io_error(err: io::Error, path: &Path) -> Error {
    if err.kind() == io::ErrorKind::NotFound {
        Error::NotFound(path.display().to_string())
    } else {
        Error::Io(err)
    }
}

fn modified(meta: &std::fs::Metadata) -> Option<Timestamp> {
    meta.modified().ok().and_then(|t| Timestamp::try_from(t).ok())
}

/// `/`-separated form of a path relative to `base`
fn relative_path(path: &Path, base: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

/// Total size and number of files below `dir`
fn folder_stats(dir: &Path, recursive: bool) -> (u64, u64) {
    let depth = if recursive { usize::MAX } else { 1 };
    WalkDir::new(dir)
        .min_depth(1)
        .max_depth(depth)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .fold((0, 0), |(size, count), meta| (size + meta.len(), count + 1))
}

fn stamped(record: MetadataRecord, meta: &std::fs::Metadata) -> MetadataRecord {
    match modified(meta) {
        Some(ts) => record.with_last_modified(ts),
        None => record,
    }
}

fn file_record(container: &str, path: String, meta: &std::fs::Metadata) -> MetadataRecord {
    let mime = mime_guess::from_path(&path).first_or_octet_stream();
    let record = MetadataRecord::file(container, path, meta.len()).with_mime_type(mime.essence_str());
    stamped(record, meta)
}

fn folder_record(container: &str, path: String, dir: &Path, recursive: bool, meta: &std::fs::Metadata) -> MetadataRecord {
    let (size, count) = folder_stats(dir, recursive);
    stamped(MetadataRecord::folder(container, path).with_folder_stats(size, count), meta)
}

/// Add a file's size to every listed folder above it
fn add_to_ancestors(totals: &mut HashMap<String, (u64, u64)>, path: &str, size: u64) {
    for (i, _) in path.match_indices('/') {
        if let Some((total, count)) = totals.get_mut(&path[..i]) {
            *total += size;
            *count += 1;
        }
    }
}

fn list_blocking(container: String, dir: PathBuf, recursive: bool) -> Result<Vec<MetadataRecord>> {
    let meta = std::fs::metadata(&dir).map_err(|e| io_error(e, &dir))?;
    if !meta.is_dir() {
        return Err(Error::InvalidPath(format!("{} is not a folder", dir.display())));
    }

    let depth = if recursive { usize::MAX } else { 1 };
    let mut records = Vec::new();
    // recursive folder stats are summed from this walk
    let mut totals: HashMap<String, (u64, u64)> = HashMap::new();

    for entry in WalkDir::new(&dir).min_depth(1).max_depth(depth).sort_by_file_name() {
        let entry = entry.map_err(|e| Error::Io(e.into()))?;
        let meta = entry.metadata().map_err(|e| Error::Io(e.into()))?;
        let path = relative_path(entry.path(), &dir);

        if meta.is_dir() {
            if recursive {
                totals.insert(path.clone(), (0, 0));
                records.push(stamped(MetadataRecord::folder(&container, path), &meta));
            } else {
                records.push(folder_record(&container, path, entry.path(), false, &meta));
            }
        } else if meta.is_file() {
            if recursive {
                add_to_ancestors(&mut totals, &path, meta.len());
            }
            records.push(file_record(&container, path, &meta));
        }
    }

    if recursive {
        for record in records.iter_mut().filter(|r| r.is_folder) {
            let (size, count) = totals.get(&record.path).copied().unwrap_or_default();
            record.size = Some(size);
            record.num_files = Some(count);
        }
    }

    Ok(records)
}

async fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent).await?;
    }
    Ok(())
}

#[async_trait]
impl StorageClient for LocalClient {
    fn kind(&self) -> BackendKind {
        BackendKind::Local
    }

    async fn list_folder(&self, path: &str, recursive: bool) -> Result<Vec<MetadataRecord>> {
        let dir = self.resolve(path)?;
        let container = self.container();
        tracing::debug!(dir = %dir.display(), recursive, "Listing local folder");

        tokio::task::spawn_blocking(move || list_blocking(container, dir, recursive))
            .await
            .map_err(|e| Error::General(format!("listing task failed: {e}")))?
    }

    async fn file_metadata(&self, path: &str) -> Result<MetadataRecord> {
        let full = self.resolve(path)?;
        let meta = tokio::fs::metadata(&full)
            .await
            .map_err(|e| io_error(e, &full))?;
        if meta.is_dir() {
            return Err(Error::InvalidPath(format!("{path} is a folder")));
        }
        Ok(file_record(&self.container(), path.trim_matches('/').to_string(), &meta))
    }

    async fn folder_metadata(&self, path: &str) -> Result<MetadataRecord> {
        let full = self.resolve(path)?;
        let meta = tokio::fs::metadata(&full)
            .await
            .map_err(|e| io_error(e, &full))?;
        if !meta.is_dir() {
            return Err(Error::InvalidPath(format!("{path} is not a folder")));
        }

        let container = self.container();
        let trimmed = path.trim_matches('/').to_string();
        let record = tokio::task::spawn_blocking(move || {
            let name = leaf_name(&trimmed).to_string();
            folder_record(&container, trimmed, &full, true, &meta).with_name(name)
        })
        .await
        .map_err(|e| Error::General(format!("metadata task failed: {e}")))?;

        Ok(record)
    }

    async fn upload(&self, local: &Path, remote: &str, _content_type: Option<&str>) -> Result<()> {
        let dest = self.resolve(remote)?;
        ensure_parent(&dest).await?;
        tokio::fs::copy(local, &dest)
            .await
            .map_err(|e| io_error(e, local))?;
        Ok(())
    }

    async fn download(&self, remote: &str, local: &Path) -> Result<()> {
        let src = self.resolve(remote)?;
        ensure_parent(local).await?;
        tokio::fs::copy(&src, local)
            .await
            .map_err(|e| io_error(e, &src))?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let full = self.resolve(path)?;
        tokio::fs::remove_file(&full)
            .await
            .map_err(|e| io_error(e, &full))
    }

    async fn delete_folder(&self, path: &str) -> Result<()> {
        let full = self.resolve(path)?;
        if full == self.root {
            return Err(Error::InvalidPath("refusing to delete the backend root".to_string()));
        }
        tokio::fs::remove_dir_all(&full)
            .await
            .map_err(|e| io_error(e, &full))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn tree() -> TempDir {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir_all(dir.path().join("docs/deep")).unwrap();
        std::fs::write(dir.path().join("top.txt"), b"12345").unwrap();
        std::fs::write(dir.path().join("docs/a.md"), b"abc").unwrap();
        std::fs::write(dir.path().join("docs/deep/b.png"), b"0123456789").unwrap();
        dir
    }

    #[tokio::test]
    async fn test_list_direct_children() {
        let dir = tree();
        let client = LocalClient::new(dir.path());
        let records = client.list_folder("", false).await.unwrap();
        let paths: Vec<_> = records.iter().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, ["docs", "top.txt"]);

        let docs = &records[0];
        assert!(docs.is_folder);
        assert_eq!(docs.num_files, Some(1));
        assert_eq!(docs.size, Some(3));
    }

    #[tokio::test]
    async fn test_list_recursive_relative_paths() {
        let dir = tree();
        let client = LocalClient::new(dir.path());
        let records = client.list_folder("docs", true).await.unwrap();
        let files: Vec<_> = records
            .iter()
            .filter(|r| !r.is_folder)
            .map(|r| r.path.as_str())
            .collect();
        assert_eq!(files, ["a.md", "deep/b.png"]);

        let png = records.iter().find(|r| r.name == "b.png").unwrap();
        assert_eq!(png.mime_type.as_deref(), Some("image/png"));
        assert!(png.last_modified.is_some());
    }

    #[tokio::test]
    async fn test_recursive_listing_sums_nested_folders() {
        let dir = tree();
        std::fs::write(dir.path().join("docs/deep/c.txt"), b"xy").unwrap();
        let client = LocalClient::new(dir.path());
        let records = client.list_folder("", true).await.unwrap();
        let stats = |path: &str| {
            let r = records.iter().find(|r| r.path == path).unwrap();
            (r.size, r.num_files)
        };
        assert_eq!(stats("docs"), (Some(15), Some(3)));
        assert_eq!(stats("docs/deep"), (Some(12), Some(2)));

        // same numbers as the per-folder walk used by folder_metadata
        let deep = client.folder_metadata("docs/deep").await.unwrap();
        assert_eq!((deep.size, deep.num_files), stats("docs/deep"));
    }

    #[test]
    fn test_add_to_ancestors_skips_unlisted_prefixes() {
        let mut totals = HashMap::from([("a".to_string(), (0, 0)), ("a/b".to_string(), (0, 0))]);
        add_to_ancestors(&mut totals, "a/b/c.txt", 7);
        add_to_ancestors(&mut totals, "a/d.txt", 3);
        add_to_ancestors(&mut totals, "top.txt", 100);
        assert_eq!(totals["a"], (10, 2));
        assert_eq!(totals["a/b"], (7, 1));
    }

    #[tokio::test]
    async fn test_folder_metadata_aggregates() {
        let dir = tree();
        let client = LocalClient::new(dir.path());
        let record = client.folder_metadata("docs").await.unwrap();
        assert_eq!(record.name, "docs");
        assert_eq!(record.size, Some(13));
        assert_eq!(record.num_files, Some(2));
    }

    #[tokio::test]
    async fn test_missing_paths() {
        let dir = tree();
        let client = LocalClient::new(dir.path());
        assert!(matches!(client.file_metadata("nope.txt").await, Err(Error::NotFound(_))));
        assert!(matches!(client.list_folder("nope", false).await, Err(Error::NotFound(_))));
        assert!(matches!(client.file_metadata("../escape").await, Err(Error::InvalidPath(_))));
    }

    #[tokio::test]
    async fn test_upload_download_delete() {
        let dir = tree();
        let scratch = TempDir::new().unwrap();
        let client = LocalClient::new(dir.path());

        let src = scratch.path().join("note.txt");
        std::fs::write(&src, b"hello").unwrap();
        client.upload(&src, "new/dir/note.txt", Some("text/plain")).await.unwrap();
        assert_eq!(client.file_metadata("new/dir/note.txt").await.unwrap().size, Some(5));

        let back = scratch.path().join("out/note.txt");
        client.download("new/dir/note.txt", &back).await.unwrap();
        assert_eq!(std::fs::read(&back).unwrap(), b"hello");

        client.delete("new/dir/note.txt").await.unwrap();
        client.delete_folder("new").await.unwrap();
        assert!(!dir.path().join("new").exists());
    }
}
