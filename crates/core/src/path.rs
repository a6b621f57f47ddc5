//! Location parsing
//!
//! Locations are either `REMOTE:PATH` or a local filesystem path:
//! - `media:photos/2024` - remote `media`, path `photos/2024`
//! - `media:` - root of remote `media`
//! - `./photos`, `/tmp/photos`, `C:\photos` - local paths

use std::fmt;
use std::path::PathBuf;

use crate::error::{Error, Result};

/// A path on a configured remote
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemotePath {
    pub remote: String,

    /// `/`-separated path below the remote root, without leading separator
    pub path: String,
}

impl RemotePath {
    pub fn new(remote: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            remote: remote.into(),
            path: path.into().trim_start_matches('/').to_string(),
        }
    }

    pub fn is_root(&self) -> bool {
        self.path.trim_matches('/').is_empty()
    }
}

impl fmt::Display for RemotePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.remote, self.path)
    }
}

/// Either side of a transfer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Location {
    Remote(RemotePath),
    Local(PathBuf),
}

impl Location {
    pub fn is_remote(&self) -> bool {
        matches!(self, Location::Remote(_))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Location::Remote(remote) => remote.fmt(f),
            Location::Local(path) => write!(f, "{}", path.display()),
        }
    }
}

/// Parse a command line location
pub fn parse_location(input: &str) -> Result<Location> {
    if input.is_empty() {
        return Err(Error::InvalidPath("location cannot be empty".to_string()));
    }

    if input.starts_with(['/', '.', '~', '\\']) || is_drive_path(input) {
        return Ok(Location::Local(PathBuf::from(input)));
    }

    match input.split_once(':') {
        Some((remote, path)) if is_remote_name(remote) => {
            Ok(Location::Remote(RemotePath::new(remote, path)))
        }
        _ => Ok(Location::Local(PathBuf::from(input))),
    }
}

/// Parse a location that must name a remote
pub fn parse_remote(input: &str) -> Result<RemotePath> {
    match parse_location(input)? {
        Location::Remote(remote) => Ok(remote),
        Location::Local(_) => Err(Error::InvalidPath(format!(
            "'{input}' is not a remote location, expected REMOTE:PATH"
        ))),
    }
}

fn is_remote_name(name: &str) -> bool {
    name.len() > 1
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

/// `C:`, `C:\...` or `C:/...`
fn is_drive_path(input: &str) -> bool {
    let bytes = input.as_bytes();
    bytes.len() >= 2
        && bytes[0].is_ascii_alphabetic()
        && bytes[1] == b':'
        && (bytes.len() == 2 || bytes[2] == b'\\' || bytes[2] == b'/')
}
