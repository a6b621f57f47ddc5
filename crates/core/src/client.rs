//! Storage client contract
//!
//! Every backend adapter implements [`StorageClient`]. The query pipeline and
//! the sync engine only talk to this trait, which keeps them independent of
//! any SDK, transport or authentication scheme.

use std::fmt;
use std::path::Path;

use async_trait::async_trait;

use crate::error::Result;
use crate::query::FieldRegistry;
use crate::record::MetadataRecord;

/// Closed set of backend variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendKind {
    S3,
    GoogleDrive,
    Http,
    Sftp,
    Local,
}

impl BackendKind {
    pub fn as_str(self) -> &'static str {
        match self {
            BackendKind::S3 => "s3",
            BackendKind::GoogleDrive => "gdrive",
            BackendKind::Http => "http",
            BackendKind::Sftp => "sftp",
            BackendKind::Local => "local",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Operations every backend adapter provides.
///
/// Remote paths are `/`-separated strings relative to the adapter's root.
/// Each call either completes or returns an error; nothing is assumed to be
/// atomic across retries.
#[async_trait]
pub trait StorageClient: Send + Sync {
    /// Backend variant, which selects the searchable fields
    fn kind(&self) -> BackendKind;

    /// Searchable fields for records produced by this client
    fn field_registry(&self) -> FieldRegistry {
        FieldRegistry::for_backend(self.kind())
    }

    /// List a folder. Non-recursive listings return direct children only;
    /// recursive listings return the full subtree. Record paths are relative
    /// to `path`.
    async fn list_folder(&self, path: &str, recursive: bool) -> Result<Vec<MetadataRecord>>;

    /// Metadata of a single file
    async fn file_metadata(&self, path: &str) -> Result<MetadataRecord>;

    /// Metadata of a folder, with aggregate size and file count
    async fn folder_metadata(&self, path: &str) -> Result<MetadataRecord>;

    /// Upload a local file to `remote`
    async fn upload(&self, local: &Path, remote: &str, content_type: Option<&str>) -> Result<()>;

    /// Download `remote` into a local file, creating parent directories
    async fn download(&self, remote: &str, local: &Path) -> Result<()>;

    async fn delete(&self, path: &str) -> Result<()>;

    /// Delete a folder and everything below it
    async fn delete_folder(&self, path: &str) -> Result<()>;

    /// Join a root folder and a relative path
    fn join(&self, root: &str, relative: &str) -> String {
        join_remote(root, relative)
    }
}

/// Join `/`-separated path segments, collapsing duplicate separators
pub fn join_remote(root: &str, relative: &str) -> String {
    root.split('/')
        .chain(relative.split('/'))
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_join_remote() {
        assert_eq!(join_remote("bucket/dir", "a/b.txt"), "bucket/dir/a/b.txt");
        assert_eq!(join_remote("bucket/dir/", "/a.txt"), "bucket/dir/a.txt");
        assert_eq!(join_remote("", "a.txt"), "a.txt");
        assert_eq!(join_remote("root", ""), "root");
    }

    #[test]
    fn test_backend_kind_names() {
        assert_eq!(BackendKind::GoogleDrive.to_string(), "gdrive");
        assert_eq!(BackendKind::S3.as_str(), "s3");
    }
}
