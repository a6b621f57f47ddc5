//! Normalized metadata for one remote object or folder
//!
//! Every backend adapter produces [`MetadataRecord`] values so that the
//! query engine and the sync engine never see provider-specific schemas.

use jiff::Timestamp;
use jiff::civil::DateTime;
use jiff::tz::TimeZone;
use serde::Serialize;

/// MIME types that backends use to mark folders
const FOLDER_MIME_TYPES: &[&str] = &["application/vnd.google-apps.folder", "inode/directory"];

/// Human label that replaces folder marker MIME types
pub const FOLDER_LABEL: &str = "(folder)";

/// One remote file or folder
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetadataRecord {
    /// Backend addressing key (bucket+key, file id, or path)
    pub identifier: String,

    /// Leaf name
    pub name: String,

    /// Path relative to the queried root
    pub path: String,

    /// Size in bytes; aggregate for folders, `None` if unknown
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,

    /// Content type, with folder markers normalized to [`FOLDER_LABEL`]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mime_type: Option<String>,

    /// Last modification instant
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_modified: Option<Timestamp>,

    /// Namespace the record lives in (bucket, drive, host root)
    pub container: String,

    pub is_folder: bool,

    /// Number of files below a folder (direct or recursive per listing mode)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub num_files: Option<u64>,
}

impl MetadataRecord {
    /// Create a file record. `path` doubles as the identifier until
    /// [`with_identifier`](Self::with_identifier) overrides it.
    pub fn file(container: impl Into<String>, path: impl Into<String>, size: u64) -> Self {
        let path = path.into();
        Self {
            identifier: path.clone(),
            name: leaf_name(&path).to_string(),
            path,
            size: Some(size),
            mime_type: None,
            last_modified: None,
            container: container.into(),
            is_folder: false,
            num_files: None,
        }
    }

    /// Create a folder record with unknown size and file count
    pub fn folder(container: impl Into<String>, path: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            identifier: path.clone(),
            name: leaf_name(&path).to_string(),
            path,
            size: None,
            mime_type: Some(FOLDER_LABEL.to_string()),
            last_modified: None,
            container: container.into(),
            is_folder: true,
            num_files: None,
        }
    }

    pub fn with_identifier(mut self, identifier: impl Into<String>) -> Self {
        self.identifier = identifier.into();
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the content type; folder marker types become [`FOLDER_LABEL`]
    /// and mark the record as a folder.
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        let mime_type = mime_type.into();
        if FOLDER_MIME_TYPES.contains(&mime_type.as_str()) {
            self.is_folder = true;
            self.mime_type = Some(FOLDER_LABEL.to_string());
        } else {
            self.mime_type = Some(mime_type);
        }
        self
    }

    pub fn with_last_modified(mut self, last_modified: Timestamp) -> Self {
        self.last_modified = Some(last_modified);
        self
    }

    /// Attach a timestamp that the backend returned without an offset.
    /// Such values are interpreted as UTC.
    pub fn with_naive_last_modified(mut self, naive: DateTime) -> Self {
        self.last_modified = naive_utc(naive);
        self
    }

    /// Set aggregate folder statistics
    pub fn with_folder_stats(mut self, size: u64, num_files: u64) -> Self {
        self.size = Some(size);
        self.num_files = Some(num_files);
        self
    }
}

/// Pair a naive datetime with UTC
pub fn naive_utc(naive: DateTime) -> Option<Timestamp> {
    naive.to_zoned(TimeZone::UTC).ok().map(|z| z.timestamp())
}

/// Last non-empty `/` segment of a path
pub fn leaf_name(path: &str) -> &str {
    path.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_record_defaults() {
        let rec = MetadataRecord::file("photos", "2024/june/beach.jpg", 2048);
        assert_eq!(rec.name, "beach.jpg");
        assert_eq!(rec.identifier, "2024/june/beach.jpg");
        assert_eq!(rec.size, Some(2048));
        assert!(!rec.is_folder);
    }

    #[test]
    fn test_folder_marker_is_normalized() {
        let rec = MetadataRecord::file("drive", "reports", 0)
            .with_mime_type("application/vnd.google-apps.folder");
        assert!(rec.is_folder);
        assert_eq!(rec.mime_type.as_deref(), Some(FOLDER_LABEL));

        let rec = MetadataRecord::file("drive", "a.pdf", 1).with_mime_type("application/pdf");
        assert_eq!(rec.mime_type.as_deref(), Some("application/pdf"));
    }

    #[test]
    fn test_naive_timestamp_is_utc() {
        let naive = jiff::civil::date(2020, 1, 1).at(12, 0, 0, 0);
        let rec = MetadataRecord::file("b", "k", 1).with_naive_last_modified(naive);
        let expected: Timestamp = "2020-01-01T12:00:00Z".parse().unwrap();
        assert_eq!(rec.last_modified, Some(expected));
    }

    #[test]
    fn test_json_omits_unknown_values() {
        let json = serde_json::to_value(MetadataRecord::folder("b", "logs")).unwrap();
        assert_eq!(json["mime_type"], "(folder)");
        assert!(json.get("size").is_none());
        assert!(json.get("last_modified").is_none());
    }

    #[test]
    fn test_leaf_name() {
        assert_eq!(leaf_name("a/b/c.txt"), "c.txt");
        assert_eq!(leaf_name("a/b/"), "b");
        assert_eq!(leaf_name("top"), "top");
    }
}
