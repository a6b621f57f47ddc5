//! HTTP client implementation
//!
//! Wraps reqwest and implements the StorageClient trait from omni-core.

use std::collections::BTreeMap;
use std::path::Path;

use async_trait::async_trait;
use jiff::Timestamp;
use omni_core::{BackendConfig, BackendKind, Error, MetadataRecord, Remote, Result, StorageClient};
use reqwest::StatusCode;
use reqwest::header::{self, HeaderMap, HeaderName, HeaderValue};
use url::Url;

/// HTTP client wrapper
pub struct HttpClient {
    inner: reqwest::Client,
    base: Url,
}

impl HttpClient {
    /// Create a new HTTP client from a remote configuration
    pub fn new(remote: &Remote) -> Result<Self> {
        let BackendConfig::Http { base_url, headers } = &remote.backend else {
            return Err(Error::Config(format!(
                "remote '{}' is a {} remote, not http",
                remote.name,
                remote.kind()
            )));
        };

        let base = Url::parse(base_url)
            .map_err(|e| Error::Config(format!("invalid base url '{base_url}': {e}")))?;
        if base.cannot_be_a_base() {
            return Err(Error::Config(format!("'{base_url}' cannot be used as a base url")));
        }

        let inner = reqwest::Client::builder()
            .default_headers(header_map(headers)?)
            .user_agent(concat!("omni/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::Config(format!("cannot build http client: {e}")))?;

        Ok(Self { inner, base })
    }

    /// URL of a `/`-separated path below the base URL
    fn url_for(&self, path: &str) -> Result<Url> {
        let mut url = self.base.clone();
        {
            let mut segments = url
                .path_segments_mut()
                .map_err(|_| Error::InvalidPath(format!("cannot address '{path}'")))?;
            segments.pop_if_empty();
            segments.extend(path.split('/').filter(|s| !s.is_empty()));
        }
        Ok(url)
    }

    async fn send(&self, request: reqwest::RequestBuilder, path: &str) -> Result<reqwest::Response> {
        let response = request.send().await.map_err(map_reqwest_error)?;
        match status_error(response.status(), path) {
            Some(err) => Err(err),
            None => Ok(response),
        }
    }
}

fn header_map(headers: &BTreeMap<String, String>) -> Result<HeaderMap> {
    let mut map = HeaderMap::new();
    for (name, value) in headers {
        let name = HeaderName::from_bytes(name.as_bytes())
            .map_err(|e| Error::Config(format!("invalid header name '{name}': {e}")))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| Error::Config(format!("invalid value for header '{name}': {e}")))?;
        map.insert(name, value);
    }
    Ok(map)
}

fn map_reqwest_error(err: reqwest::Error) -> Error {
    if err.is_timeout() {
        Error::Network(format!("Request timeout: {err}"))
    } else if err.is_builder() {
        Error::General(err.to_string())
    } else {
        Error::Network(err.to_string())
    }
}

/// Map a non-success status onto the error taxonomy
fn status_error(status: StatusCode, path: &str) -> Option<Error> {
    if status.is_success() {
        return None;
    }
    Some(match status {
        StatusCode::NOT_FOUND | StatusCode::GONE => Error::NotFound(path.to_string()),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            Error::Auth(format!("{status} for {path}"))
        }
        StatusCode::METHOD_NOT_ALLOWED | StatusCode::NOT_IMPLEMENTED => {
            Error::UnsupportedFeature(format!("server rejected request for {path}: {status}"))
        }
        _ => Error::Network(format!("{status} for {path}")),
    })
}

/// Parse an HTTP `Last-Modified` value
fn parse_http_date(value: &str) -> Option<Timestamp> {
    jiff::fmt::rfc2822::parse(value).ok().map(|z| z.timestamp())
}

fn header_str<'a>(headers: &'a HeaderMap, name: header::HeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

#[async_trait]
impl StorageClient for HttpClient {
    fn kind(&self) -> BackendKind {
        BackendKind::Http
    }

    async fn list_folder(&self, path: &str, _recursive: bool) -> Result<Vec<MetadataRecord>> {
        Err(Error::UnsupportedFeature(format!(
            "cannot list '{path}': http remotes have no folder listing"
        )))
    }

    async fn file_metadata(&self, path: &str) -> Result<MetadataRecord> {
        let url = self.url_for(path)?;
        let response = self.send(self.inner.head(url), path).await?;
        let headers = response.headers();

        let size = header_str(headers, header::CONTENT_LENGTH)
            .and_then(|v| v.parse::<u64>().ok())
            .or_else(|| response.content_length())
            .unwrap_or(0);

        let mut record = MetadataRecord::file(self.base.as_str(), path.trim_matches('/'), size);
        if let Some(ct) = header_str(headers, header::CONTENT_TYPE) {
            let essence = ct.split(';').next().unwrap_or(ct).trim();
            record = record.with_mime_type(essence);
        }
        if let Some(ts) = header_str(headers, header::LAST_MODIFIED).and_then(parse_http_date) {
            record = record.with_last_modified(ts);
        }

        Ok(record)
    }

    async fn folder_metadata(&self, path: &str) -> Result<MetadataRecord> {
        Err(Error::UnsupportedFeature(format!(
            "cannot inspect folder '{path}': http remotes have no folder listing"
        )))
    }

    async fn upload(&self, local: &Path, remote: &str, content_type: Option<&str>) -> Result<()> {
        let body = tokio::fs::read(local).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Error::NotFound(local.display().to_string())
            } else {
                Error::Io(e)
            }
        })?;

        let url = self.url_for(remote)?;
        let mut request = self.inner.put(url).body(body);
        if let Some(ct) = content_type {
            request = request.header(header::CONTENT_TYPE, ct);
        }

        self.send(request, remote).await?;
        tracing::debug!(path = remote, "Uploaded over http");
        Ok(())
    }

    async fn download(&self, remote: &str, local: &Path) -> Result<()> {
        let url = self.url_for(remote)?;
        let response = self.send(self.inner.get(url), remote).await?;
        let data = response.bytes().await.map_err(map_reqwest_error)?;

        if let Some(parent) = local.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(local, &data).await?;

        tracing::debug!(path = remote, bytes = data.len(), "Downloaded over http");
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let url = self.url_for(path)?;
        self.send(self.inner.delete(url), path).await?;
        Ok(())
    }

    async fn delete_folder(&self, path: &str) -> Result<()> {
        Err(Error::UnsupportedFeature(format!(
            "cannot delete folder '{path}': http remotes have no folder listing"
        )))
    }
}
