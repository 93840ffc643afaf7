mod consumer_worker;

pub use consumer_worker::{spawn_consumers, ConsumerWorker, Settlement};
