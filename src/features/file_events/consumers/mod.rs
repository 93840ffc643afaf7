mod deletion_consumer;
mod garbage_collector;
mod handler;
mod usage_consumer;

pub use deletion_consumer::DeletionConsumer;
pub use garbage_collector::GarbageCollectorConsumer;
pub use handler::{ConsumerOutcome, FileEventHandler};
pub use usage_consumer::UsageConsumer;
