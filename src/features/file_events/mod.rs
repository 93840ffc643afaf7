//! Lifecycle events: ingress for reference producers, the producer-side
//! client and the consumers that act on queued events

pub mod consumers;
pub mod dtos;
pub mod handlers;
pub mod routes;
pub mod services;
pub mod workers;


pub use consumers::{
    ConsumerOutcome, DeletionConsumer, FileEventHandler, GarbageCollectorConsumer, UsageConsumer,
};
pub use routes::routes;
pub use services::FileReferencePublisher;
pub use workers::{spawn_consumers, ConsumerWorker};
