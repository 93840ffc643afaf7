//! Storage module for uploaded blobs
//!
//! Defines the [`BlobStorage`] capability and its MinIO/S3-compatible
//! implementation.

mod blob_storage;
mod minio_client;
mod sigv4;

pub use blob_storage::BlobStorage;
pub use minio_client::MinIOClient;
