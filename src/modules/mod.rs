//! Modules layer - Infrastructure components for external integrations
//!
//! Blob storage and the lifecycle message queue live here; features only see
//! them through the `BlobStorage`, `EventPublisher`, `DelayedScheduler` and
//! `MessageSource` traits.

pub mod messaging;
pub mod storage;
