//! In-memory storage client used by the integration tests

#![allow(dead_code)]

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use omni_core::{BackendKind, Error, MetadataRecord, Result, StorageClient};

#[derive(Default)]
pub struct MemoryClient {
    files: Mutex<BTreeMap<String, Vec<u8>>>,
    failing: Mutex<BTreeSet<String>>,
    calls: Mutex<Vec<String>>,
}

impl MemoryClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_files(files: &[(&str, &str)]) -> Self {
        let client = Self::new();
        for (path, content) in files {
            client.put(path, content);
        }
        client
    }

    pub fn put(&self, path: &str, content: &str) {
        self.files
            .lock()
            .unwrap()
            .insert(path.to_string(), content.as_bytes().to_vec());
    }

    pub fn get(&self, path: &str) -> Option<String> {
        self.files
            .lock()
            .unwrap()
            .get(path)
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }

    pub fn paths(&self) -> Vec<String> {
        self.files.lock().unwrap().keys().cloned().collect()
    }

    /// Make every operation on `path` fail
    pub fn fail_on(&self, path: &str) {
        self.failing.lock().unwrap().insert(path.to_string());
    }

    /// Mutating calls in the order they were made, e.g. `upload:root/a.txt`
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn record(&self, op: &str, path: &str) -> Result<()> {
        self.calls.lock().unwrap().push(format!("{op}:{path}"));
        if self.failing.lock().unwrap().contains(path) {
            return Err(Error::Network(format!("injected failure for {path}")));
        }
        Ok(())
    }
}

fn prefix_of(path: &str) -> String {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        String::new()
    } else {
        format!("{trimmed}/")
    }
}

#[async_trait]
impl StorageClient for MemoryClient {
    fn kind(&self) -> BackendKind {
        BackendKind::S3
    }

    async fn list_folder(&self, path: &str, recursive: bool) -> Result<Vec<MetadataRecord>> {
        let prefix = prefix_of(path);
        let files = self.files.lock().unwrap();
        let mut records = Vec::new();
        let mut folders = BTreeSet::new();
        let mut found = false;

        for (key, content) in files.iter() {
            let Some(rest) = key.strip_prefix(&prefix) else {
                continue;
            };
            found = true;
            match rest.split_once('/') {
                Some((folder, _)) if !recursive => {
                    folders.insert(folder.to_string());
                }
                _ => records.push(MetadataRecord::file("memory", rest, content.len() as u64)),
            }
        }

        if !found && !prefix.is_empty() {
            return Err(Error::NotFound(path.to_string()));
        }

        records.extend(folders.into_iter().map(|f| MetadataRecord::folder("memory", f)));
        Ok(records)
    }

    async fn file_metadata(&self, path: &str) -> Result<MetadataRecord> {
        let files = self.files.lock().unwrap();
        files
            .get(path)
            .map(|content| MetadataRecord::file("memory", path, content.len() as u64))
            .ok_or_else(|| Error::NotFound(path.to_string()))
    }

    async fn folder_metadata(&self, path: &str) -> Result<MetadataRecord> {
        let prefix = prefix_of(path);
        let files = self.files.lock().unwrap();
        let (size, count) = files
            .iter()
            .filter(|(k, _)| k.starts_with(&prefix))
            .fold((0, 0), |(s, n), (_, v)| (s + v.len() as u64, n + 1));
        Ok(MetadataRecord::folder("memory", path).with_folder_stats(size, count))
    }

    async fn upload(&self, local: &Path, remote: &str, _content_type: Option<&str>) -> Result<()> {
        self.record("upload", remote)?;
        let content = tokio::fs::read(local).await?;
        self.files.lock().unwrap().insert(remote.to_string(), content);
        Ok(())
    }

    async fn download(&self, remote: &str, local: &Path) -> Result<()> {
        self.record("download", remote)?;
        let content = self
            .files
            .lock()
            .unwrap()
            .get(remote)
            .cloned()
            .ok_or_else(|| Error::NotFound(remote.to_string()))?;
        if let Some(parent) = local.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(local, content).await?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        self.record("delete", path)?;
        self.files
            .lock()
            .unwrap()
            .remove(path)
            .map(|_| ())
            .ok_or_else(|| Error::NotFound(path.to_string()))
    }

    async fn delete_folder(&self, path: &str) -> Result<()> {
        self.record("delete_folder", path)?;
        let prefix = prefix_of(path);
        self.files
            .lock()
            .unwrap()
            .retain(|k, _| !k.starts_with(&prefix));
        Ok(())
    }
}

/// Create files below `root`, making parent directories
pub fn write_tree(root: &Path, files: &[(&str, &str)]) {
    for (path, content) in files {
        let full = root.join(path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(full, content).unwrap();
    }
}
