//! Backend selection
//!
//! Builds the storage client for a configured remote, or a local client for
//! filesystem locations.

use std::path::Path;

use omni_core::{
    BackendConfig, Error, LocalClient, Location, Remote, RemoteManager, RemotePath, Result,
    StorageClient,
};
use omni_http::HttpClient;
use omni_s3::S3Client;

/// A client together with the path it should be asked about
pub struct Target {
    pub client: Box<dyn StorageClient>,
    pub path: String,
}

/// Build the client for a remote
pub async fn connect(remote: &Remote) -> Result<Box<dyn StorageClient>> {
    tracing::debug!(remote = %remote.name, backend = %remote.kind(), "Connecting");
    match &remote.backend {
        BackendConfig::S3 { .. } => Ok(Box::new(S3Client::new(remote).await?)),
        BackendConfig::Http { .. } => Ok(Box::new(HttpClient::new(remote)?)),
        BackendConfig::Local { root } => Ok(Box::new(LocalClient::new(root))),
        BackendConfig::GoogleDrive { .. } | BackendConfig::Sftp { .. } => {
            Err(Error::UnsupportedFeature(format!(
                "remote '{}' uses the {} backend, which this build cannot connect to",
                remote.name,
                remote.kind()
            )))
        }
    }
}

/// Look up a remote by name and connect to it
pub async fn open_remote(path: &RemotePath) -> Result<Box<dyn StorageClient>> {
    let remote = RemoteManager::new()?.get(&path.remote)?;
    connect(&remote).await
}

/// Client for a folder location; local folders become the client root
pub async fn open_folder(location: &Location) -> Result<Target> {
    match location {
        Location::Remote(path) => Ok(Target {
            client: open_remote(path).await?,
            path: path.path.clone(),
        }),
        Location::Local(dir) => Ok(Target {
            client: Box::new(LocalClient::new(dir)),
            path: String::new(),
        }),
    }
}

/// Client for a file location; local files are addressed from their parent
pub async fn open_file(location: &Location) -> Result<Target> {
    match location {
        Location::Remote(path) => Ok(Target {
            client: open_remote(path).await?,
            path: path.path.clone(),
        }),
        Location::Local(file) => {
            let (parent, name) = split_local(file)?;
            Ok(Target {
                client: Box::new(LocalClient::new(parent)),
                path: name,
            })
        }
    }
}

fn split_local(file: &Path) -> Result<(&Path, String)> {
    let name = file
        .file_name()
        .ok_or_else(|| Error::InvalidPath(format!("{} does not name a file", file.display())))?
        .to_string_lossy()
        .into_owned();
    let parent = match file.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    };
    Ok((parent, name))
}
