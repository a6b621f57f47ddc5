//! Error types for omni-core
//!
//! Query and sort validation failures carry the diagnostic fields needed to
//! tell the user what was wrong and what would have been accepted.

use thiserror::Error;

/// Result alias used throughout omni-core
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced while parsing or validating a search expression
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// A clause had a delimiter that is not a supported operator
    #[error("invalid search '{query}': unsupported operator '{operator}'")]
    Syntax { query: String, operator: String },

    /// A clause named a field the active registry does not know
    #[error(
        "invalid search '{query}': unsupported field '{original}' (normalized to '{normalized}'); supported fields are {}",
        .valid.join(", ")
    )]
    UnknownField {
        query: String,
        original: String,
        normalized: String,
        valid: Vec<String>,
    },

    /// The requested sort key is not a registered field
    #[error(
        "invalid sort field '{original}' (normalized to '{normalized}'); supported fields are {}",
        .valid.join(", ")
    )]
    SortField {
        original: String,
        normalized: String,
        valid: Vec<String>,
    },

    /// A comparison literal could not be parsed for the field's type
    #[error("cannot parse '{literal}': expected {expected}")]
    ValueParse {
        literal: String,
        expected: &'static str,
    },
}

/// Main error type for omni operations
#[derive(Debug, Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Remote not found: {0}")]
    RemoteNotFound(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unsupported feature: {0}")]
    UnsupportedFeature(String),

    #[error(transparent)]
    Query(#[from] QueryError),

    /// A single upload, download or delete failed during sync execution
    #[error("Transfer failed for '{path}': {source}")]
    Transfer {
        path: String,
        #[source]
        source: Box<Error>,
    },

    #[error("{0}")]
    General(String),
}

impl Error {
    /// Wrap an error as a transfer failure for the given relative path
    pub fn transfer(path: impl Into<String>, source: Error) -> Self {
        Error::Transfer {
            path: path.into(),
            source: Box::new(source),
        }
    }

    /// Process exit code associated with this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Config(_) | Error::InvalidPath(_) | Error::Query(_) => 2,
            Error::Network(_) | Error::Io(_) => 3,
            Error::Auth(_) => 4,
            Error::NotFound(_) | Error::RemoteNotFound(_) => 5,
            Error::UnsupportedFeature(_) => 6,
            Error::Transfer { source, .. } => source.exit_code(),
            Error::General(_) => 1,
        }
    }
}

impl From<toml::de::Error> for Error {
    fn from(err: toml::de::Error) -> Self {
        Error::Config(err.to_string())
    }
}

impl From<toml::ser::Error> for Error {
    fn from(err: toml::ser::Error) -> Self {
        Error::Config(err.to_string())
    }
}
