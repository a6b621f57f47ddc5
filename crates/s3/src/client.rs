//! S3 client implementation
//!
//! Wraps aws-sdk-s3 and implements the StorageClient trait from omni-core.

use std::path::Path;

use async_trait::async_trait;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use jiff::Timestamp;
use omni_core::{BackendConfig, BackendKind, Error, MetadataRecord, Remote, Result, StorageClient};

/// Largest batch accepted by DeleteObjects
const DELETE_BATCH: usize = 1000;

/// S3 client wrapper
pub struct S3Client {
    inner: aws_sdk_s3::Client,
}

/// An object listed below a prefix
struct ListedObject {
    key: String,
    size: u64,
    last_modified: Option<Timestamp>,
}

/// One fully paginated listing
#[derive(Default)]
struct Listing {
    prefixes: Vec<String>,
    objects: Vec<ListedObject>,
}

impl S3Client {
    /// Create a new S3 client from a remote configuration
    pub async fn new(remote: &Remote) -> Result<Self> {
        let BackendConfig::S3 {
            endpoint,
            region,
            access_key,
            secret_key,
            bucket_lookup,
        } = &remote.backend
        else {
            return Err(Error::Config(format!(
                "remote '{}' is a {} remote, not s3",
                remote.name,
                remote.kind()
            )));
        };

        url::Url::parse(endpoint)
            .map_err(|e| Error::Config(format!("invalid endpoint '{endpoint}': {e}")))?;

        let credentials = aws_credential_types::Credentials::new(
            access_key,
            secret_key,
            None, // session token
            None, // expiry
            "omni-static-credentials",
        );

        let config = aws_config::defaults(aws_config::BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(aws_config::Region::new(region.clone()))
            .endpoint_url(endpoint)
            .load()
            .await;

        // path-style addressing unless virtual hosts were asked for
        let s3_config = aws_sdk_s3::config::Builder::from(&config)
            .force_path_style(bucket_lookup != "dns")
            .build();

        Ok(Self {
            inner: aws_sdk_s3::Client::from_conf(s3_config),
        })
    }

    /// Format AWS SDK error into a detailed error message
    fn format_sdk_error<E: std::fmt::Display>(error: &aws_sdk_s3::error::SdkError<E>) -> String {
        match error {
            aws_sdk_s3::error::SdkError::ServiceError(service_err) => {
                let err = service_err.err();
                let meta = service_err.raw();
                let mut msg = format!("Service error: {err}");
                if let Some(code) = meta.headers().get("x-amz-error-code")
                    && let Ok(code_str) = std::str::from_utf8(code.as_bytes())
                {
                    msg.push_str(&format!(" (code: {code_str})"));
                }
                if meta.status().as_u16() == 404 {
                    msg.push_str(" NotFound");
                } else if meta.status().as_u16() == 403 {
                    msg.push_str(" AccessDenied");
                }
                msg
            }
            aws_sdk_s3::error::SdkError::ConstructionFailure(err) => {
                format!("Request construction failed: {err:?}")
            }
            aws_sdk_s3::error::SdkError::TimeoutError(_) => "Request timeout".to_string(),
            aws_sdk_s3::error::SdkError::DispatchFailure(err) => {
                format!("Network dispatch error: {err:?}")
            }
            aws_sdk_s3::error::SdkError::ResponseError(err) => {
                format!("Response error: {err:?}")
            }
            _ => error.to_string(),
        }
    }

    fn map_sdk_error<E: std::fmt::Display>(error: &aws_sdk_s3::error::SdkError<E>, path: &str) -> Error {
        classify(Self::format_sdk_error(error), path)
    }

    /// List everything below `prefix`, following continuation tokens
    async fn list_prefix(&self, bucket: &str, prefix: &str, recursive: bool) -> Result<Listing> {
        let mut listing = Listing::default();
        let mut token: Option<String> = None;

        loop {
            let mut request = self.inner.list_objects_v2().bucket(bucket);
            if !prefix.is_empty() {
                request = request.prefix(prefix);
            }
            if !recursive {
                request = request.delimiter("/");
            }
            if let Some(t) = &token {
                request = request.continuation_token(t);
            }

            let response = request
                .send()
                .await
                .map_err(|e| Self::map_sdk_error(&e, bucket))?;

            for common in response.common_prefixes() {
                if let Some(p) = common.prefix() {
                    listing.prefixes.push(p.to_string());
                }
            }

            for object in response.contents() {
                listing.objects.push(ListedObject {
                    key: object.key().unwrap_or_default().to_string(),
                    size: object.size().unwrap_or(0).max(0) as u64,
                    last_modified: object.last_modified().and_then(to_timestamp),
                });
            }

            token = response.next_continuation_token().map(str::to_string);
            if !response.is_truncated().unwrap_or(false) || token.is_none() {
                break;
            }
        }

        tracing::debug!(
            bucket,
            prefix,
            recursive,
            objects = listing.objects.len(),
            prefixes = listing.prefixes.len(),
            "Listed objects"
        );

        Ok(listing)
    }

    async fn list_buckets(&self) -> Result<Vec<MetadataRecord>> {
        let response = self
            .inner
            .list_buckets()
            .send()
            .await
            .map_err(|e| Self::map_sdk_error(&e, ""))?;

        Ok(response
            .buckets()
            .iter()
            .filter_map(|b| {
                let name = b.name()?;
                let record = MetadataRecord::folder(name, name);
                Some(match b.creation_date().and_then(to_timestamp) {
                    Some(ts) => record.with_last_modified(ts),
                    None => record,
                })
            })
            .collect())
    }

    async fn delete_keys(&self, bucket: &str, keys: Vec<String>) -> Result<()> {
        for chunk in keys.chunks(DELETE_BATCH) {
            let objects = chunk
                .iter()
                .map(|k| ObjectIdentifier::builder().key(k).build())
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(|e| Error::General(e.to_string()))?;

            let delete = Delete::builder()
                .set_objects(Some(objects))
                .build()
                .map_err(|e| Error::General(e.to_string()))?;

            let response = self
                .inner
                .delete_objects()
                .bucket(bucket)
                .delete(delete)
                .send()
                .await
                .map_err(|e| Self::map_sdk_error(&e, bucket))?;

            if let Some(failed) = response.errors().first() {
                let key = failed.key().unwrap_or_default();
                let message = failed.message().unwrap_or("delete rejected");
                return Err(classify(format!("{message} ({key})"), key));
            }
        }
        Ok(())
    }
}

/// Split `bucket/key` into its parts
fn split_path(path: &str) -> (&str, &str) {
    let trimmed = path.trim_start_matches('/');
    match trimmed.split_once('/') {
        Some((bucket, key)) => (bucket, key),
        None => (trimmed, ""),
    }
}

/// Listing prefix for a folder key
fn folder_prefix(key: &str) -> String {
    let key = key.trim_matches('/');
    if key.is_empty() {
        String::new()
    } else {
        format!("{key}/")
    }
}

fn require_bucket(path: &str) -> Result<(&str, &str)> {
    let (bucket, key) = split_path(path);
    if bucket.is_empty() {
        return Err(Error::InvalidPath(format!("'{path}' does not name a bucket")));
    }
    Ok((bucket, key))
}

fn require_key(path: &str) -> Result<(&str, &str)> {
    let (bucket, key) = require_bucket(path)?;
    if key.is_empty() || key.ends_with('/') {
        return Err(Error::InvalidPath(format!("'{path}' does not name an object")));
    }
    Ok((bucket, key))
}

fn to_timestamp(dt: &aws_smithy_types::DateTime) -> Option<Timestamp> {
    Timestamp::new(dt.secs(), dt.subsec_nanos() as i32).ok()
}

fn guess_mime(key: &str) -> Option<String> {
    mime_guess::from_path(key)
        .first()
        .map(|m| m.essence_str().to_string())
}

/// Map an error message onto the error taxonomy
fn classify(message: String, path: &str) -> Error {
    if message.contains("NotFound") || message.contains("NoSuchKey") || message.contains("NoSuchBucket") {
        Error::NotFound(path.to_string())
    } else if message.contains("AccessDenied")
        || message.contains("InvalidAccessKeyId")
        || message.contains("SignatureDoesNotMatch")
    {
        Error::Auth(message)
    } else {
        Error::Network(message)
    }
}

fn object_record(bucket: &str, relative: &str, object: &ListedObject) -> MetadataRecord {
    let mut record = MetadataRecord::file(bucket, relative, object.size).with_identifier(&object.key);
    if let Some(mime) = guess_mime(&object.key) {
        record = record.with_mime_type(mime);
    }
    match object.last_modified {
        Some(ts) => record.with_last_modified(ts),
        None => record,
    }
}

#[async_trait]
impl StorageClient for S3Client {
    fn kind(&self) -> BackendKind {
        BackendKind::S3
    }

    async fn list_folder(&self, path: &str, recursive: bool) -> Result<Vec<MetadataRecord>> {
        let (bucket, key) = split_path(path);
        if bucket.is_empty() {
            return self.list_buckets().await;
        }

        let prefix = folder_prefix(key);
        let listing = self.list_prefix(bucket, &prefix, recursive).await?;
        let mut records = Vec::with_capacity(listing.prefixes.len() + listing.objects.len());

        for p in &listing.prefixes {
            let relative = p[prefix.len().min(p.len())..].trim_end_matches('/');
            if !relative.is_empty() {
                records.push(
                    MetadataRecord::folder(bucket, relative).with_identifier(p.trim_end_matches('/')),
                );
            }
        }

        for object in &listing.objects {
            let relative = object.key.strip_prefix(&prefix).unwrap_or(&object.key);
            // zero-byte folder markers
            if relative.is_empty() || relative.ends_with('/') {
                continue;
            }
            records.push(object_record(bucket, relative, object));
        }

        Ok(records)
    }

    async fn file_metadata(&self, path: &str) -> Result<MetadataRecord> {
        let (bucket, key) = require_key(path)?;
        let response = self
            .inner
            .head_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| Self::map_sdk_error(&e, path))?;

        let size = response.content_length().unwrap_or(0).max(0) as u64;
        let mut record = MetadataRecord::file(bucket, key, size).with_identifier(key);

        if let Some(ct) = response.content_type().map(str::to_string).or_else(|| guess_mime(key)) {
            record = record.with_mime_type(ct);
        }
        if let Some(ts) = response.last_modified().and_then(to_timestamp) {
            record = record.with_last_modified(ts);
        }

        Ok(record)
    }

    async fn folder_metadata(&self, path: &str) -> Result<MetadataRecord> {
        let (bucket, key) = require_bucket(path)?;
        let prefix = folder_prefix(key);
        let listing = self.list_prefix(bucket, &prefix, true).await?;

        if listing.objects.is_empty() && !prefix.is_empty() {
            return Err(Error::NotFound(path.to_string()));
        }

        let files = listing.objects.iter().filter(|o| !o.key.ends_with('/'));
        let (size, count) = files.fold((0, 0), |(s, n), o| (s + o.size, n + 1));
        let newest = listing.objects.iter().filter_map(|o| o.last_modified).max();

        let folder_path = if key.is_empty() { bucket } else { key.trim_matches('/') };
        let record = MetadataRecord::folder(bucket, folder_path).with_folder_stats(size, count);
        Ok(match newest {
            Some(ts) => record.with_last_modified(ts),
            None => record,
        })
    }

    async fn upload(&self, local: &Path, remote: &str, content_type: Option<&str>) -> Result<()> {
        let (bucket, key) = require_key(remote)?;

        tokio::fs::metadata(local).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound(local.display().to_string())
            } else {
                Error::Io(e)
            }
        })?;

        let body = ByteStream::from_path(local)
            .await
            .map_err(|e| Error::General(format!("cannot read {}: {e}", local.display())))?;

        let mut request = self.inner.put_object().bucket(bucket).key(key).body(body);
        if let Some(ct) = content_type {
            request = request.content_type(ct);
        }

        request
            .send()
            .await
            .map_err(|e| Self::map_sdk_error(&e, remote))?;

        tracing::debug!(bucket, key, "Uploaded object");
        Ok(())
    }

    async fn download(&self, remote: &str, local: &Path) -> Result<()> {
        let (bucket, key) = require_key(remote)?;
        let response = self
            .inner
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| Self::map_sdk_error(&e, remote))?;

        let data = response
            .body
            .collect()
            .await
            .map_err(|e| Error::Network(e.to_string()))?
            .into_bytes();

        if let Some(parent) = local.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(local, &data).await?;

        tracing::debug!(bucket, key, bytes = data.len(), "Downloaded object");
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let (bucket, key) = require_key(path)?;
        self.inner
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| Self::map_sdk_error(&e, path))?;
        Ok(())
    }

    async fn delete_folder(&self, path: &str) -> Result<()> {
        let (bucket, key) = require_bucket(path)?;
        let prefix = folder_prefix(key);
        if prefix.is_empty() {
            return Err(Error::InvalidPath(format!(
                "refusing to empty bucket '{bucket}'; name a folder inside it"
            )));
        }

        let listing = self.list_prefix(bucket, &prefix, true).await?;
        let keys: Vec<String> = listing.objects.into_iter().map(|o| o.key).collect();
        let count = keys.len();
        self.delete_keys(bucket, keys).await?;

        tracing::debug!(bucket, prefix, count, "Deleted folder");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_path() {
        assert_eq!(split_path("bucket/a/b.txt"), ("bucket", "a/b.txt"));
        assert_eq!(split_path("/bucket"), ("bucket", ""));
        assert_eq!(split_path(""), ("", ""));
    }

    #[test]
    fn test_folder_prefix() {
        assert_eq!(folder_prefix(""), "");
        assert_eq!(folder_prefix("photos"), "photos/");
        assert_eq!(folder_prefix("/photos/2024/"), "photos/2024/");
    }

    #[test]
    fn test_require_key() {
        assert!(require_key("bucket/a.txt").is_ok());
        assert!(matches!(require_key("bucket"), Err(Error::InvalidPath(_))));
        assert!(matches!(require_key("bucket/dir/"), Err(Error::InvalidPath(_))));
        assert!(matches!(require_bucket(""), Err(Error::InvalidPath(_))));
    }

    #[test]
    fn test_classify() {
        assert!(matches!(
            classify("Service error: NoSuchKey".to_string(), "b/k"),
            Error::NotFound(ref p) if p == "b/k"
        ));
        assert!(matches!(
            classify("Service error: (code: AccessDenied)".to_string(), "b/k"),
            Error::Auth(_)
        ));
        assert!(matches!(classify("Request timeout".to_string(), "b/k"), Error::Network(_)));
    }

    #[test]
    fn test_object_record() {
        let object = ListedObject {
            key: "photos/2024/beach.jpg".to_string(),
            size: 2048,
            last_modified: None,
        };
        let record = object_record("media", "2024/beach.jpg", &object);
        assert_eq!(record.identifier, "photos/2024/beach.jpg");
        assert_eq!(record.path, "2024/beach.jpg");
        assert_eq!(record.name, "beach.jpg");
        assert_eq!(record.container, "media");
        assert_eq!(record.mime_type.as_deref(), Some("image/jpeg"));
    }

    #[test]
    fn test_to_timestamp() {
        let dt = aws_smithy_types::DateTime::from_secs(1_577_836_800);
        assert_eq!(to_timestamp(&dt), Some("2020-01-01T00:00:00Z".parse().unwrap()));
    }

    #[tokio::test]
    async fn test_new_rejects_other_backends() {
        let remote = Remote::new(
            "disk",
            BackendConfig::Local {
                root: std::path::PathBuf::from("/tmp"),
            },
        );
        assert!(matches!(S3Client::new(&remote).await, Err(Error::Config(_))));
    }

    #[tokio::test]
    async fn test_upload_missing_file() {
        let remote = Remote::new(
            "minio",
            BackendConfig::S3 {
                endpoint: "http://127.0.0.1:9".to_string(),
                region: "us-east-1".to_string(),
                access_key: "key".to_string(),
                secret_key: "secret".to_string(),
                bucket_lookup: "auto".to_string(),
            },
        );
        let client = S3Client::new(&remote).await.unwrap();
        let dir = tempfile::TempDir::new().unwrap();
        let err = client
            .upload(&dir.path().join("missing.bin"), "bucket/missing.bin", None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
    }
}
