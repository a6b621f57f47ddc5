//! omni-http: plain HTTP backend for omni
//!
//! Treats an HTTP server as a flat key space: uploads are `PUT`, downloads
//! are `GET`, deletes are `DELETE` and file metadata comes from `HEAD`.
//! HTTP has no listing primitive, so folder operations are unsupported.

mod client;

pub use client::HttpClient;
