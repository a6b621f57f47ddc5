//! omni-core: Core library for the omni storage CLI
//!
//! This crate provides the core functionality for omni, including:
//! - Normalized metadata records and per-backend field registries
//! - Search expressions, filtering, sorting and limiting of records
//! - The StorageClient trait implemented by every backend adapter
//! - A local filesystem backend
//! - Directory copy and sync between local and remote folders
//! - Configuration and remote management
//!
//! This crate is independent of any storage SDK; adapters live in their
//! own crates.

pub mod client;
pub mod config;
pub mod error;
pub mod local;
pub mod path;
pub mod query;
pub mod record;
pub mod remote;
pub mod sync;

pub use client::{BackendKind, StorageClient, join_remote};
pub use config::{Config, ConfigManager, Defaults};
pub use error::{Error, QueryError, Result};
pub use local::LocalClient;
pub use path::{Location, RemotePath, parse_location, parse_remote};
pub use query::{FieldRegistry, Predicate, QueryParser, RecordFilter, filter_records};
pub use record::MetadataRecord;
pub use remote::{BackendConfig, Remote, RemoteManager};
pub use sync::{DirSync, Direction, SyncMode, SyncOptions, SyncPlan, SyncReport};
