//! Lifecycle messaging
//!
//! Event schema, the publish/schedule/consume capabilities, and their
//! PostgreSQL and HTTP implementations.

mod event;
mod http_publisher;
mod pg_queue;
mod queue;

pub use event::{FileEvent, FileEventKind};
pub use http_publisher::HttpEventPublisher;
pub use pg_queue::PgMessageQueue;
pub use queue::{
    retry_delay, DelayedScheduler, Delivery, EventPublisher, MessageSource, ReleaseOutcome,
};
