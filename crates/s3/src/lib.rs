//! omni-s3: S3 backend for omni
//!
//! Implements the `StorageClient` trait from omni-core on top of
//! aws-sdk-s3. Paths are `bucket/key`; the empty path lists buckets.

mod client;

pub use client::S3Client;
