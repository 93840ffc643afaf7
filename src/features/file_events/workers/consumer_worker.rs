use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::core::config::LifecycleConfig;
use crate::core::error::Result;
use crate::features::file_events::consumers::FileEventHandler;
use crate::modules::messaging::{Delivery, MessageSource, ReleaseOutcome};

/// How one delivery was settled with the queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Settlement {
    Acked,
    Released,
    DeadLettered,
    /// The settle call itself failed; the lease expiry will redeliver
    Unsettled,
}

/// Background worker draining one event kind into one handler
///
/// Several workers may serve the same kind; the queue leases each message to
/// one of them at a time. A message is never abandoned mid-handler: shutdown is
/// only observed between batches.
pub struct ConsumerWorker {
    handler: Arc<dyn FileEventHandler>,
    source: Arc<dyn MessageSource>,
    batch_size: i64,
    visibility_timeout: Duration,
    poll_interval: Duration,
    worker_index: usize,
}

impl ConsumerWorker {
    pub fn new(
        handler: Arc<dyn FileEventHandler>,
        source: Arc<dyn MessageSource>,
        config: &LifecycleConfig,
        worker_index: usize,
    ) -> Self {
        Self {
            handler,
            source,
            batch_size: config.batch_size,
            visibility_timeout: config.visibility_timeout,
            poll_interval: config.poll_interval,
            worker_index,
        }
    }

    /// Run until `shutdown` flips to true
    pub async fn run(&self, mut shutdown: watch::Receiver<bool>) {
        tracing::info!(
            "Starting {} consumer worker #{} for {} events",
            self.handler.name(),
            self.worker_index,
            self.handler.kind()
        );

        loop {
            if *shutdown.borrow() {
                break;
            }

            let processed = match self.process_batch().await {
                Ok(n) => n,
                Err(e) => {
                    tracing::error!(
                        "Error polling {} events for {} consumer: {:?}",
                        self.handler.kind(),
                        self.handler.name(),
                        e
                    );
                    0
                }
            };

            // Keep draining while there is work; back off when the queue is idle
            if processed == 0 {
                tokio::select! {
                    _ = tokio::time::sleep(self.poll_interval) => {}
                    _ = shutdown.changed() => {}
                }
            }
        }

        tracing::info!(
            "{} consumer worker #{} stopped",
            self.handler.name(),
            self.worker_index
        );
    }

    /// Lease and process one batch; returns how many messages were leased
    pub async fn process_batch(&self) -> Result<usize> {
        let deliveries = self
            .source
            .receive(self.handler.kind(), self.batch_size, self.visibility_timeout)
            .await?;

        if deliveries.is_empty() {
            return Ok(0);
        }

        tracing::debug!(
            "{} consumer leased {} messages",
            self.handler.name(),
            deliveries.len()
        );

        for delivery in &deliveries {
            self.process_delivery(delivery).await;
        }

        Ok(deliveries.len())
    }

    async fn process_delivery(&self, delivery: &Delivery) -> Settlement {
        let file_id = delivery.event.file_id();

        match self.handler.handle(delivery).await {
            Ok(outcome) => {
                tracing::info!(
                    "{} consumer: file {} -> {} (message {}, attempt {})",
                    self.handler.name(),
                    file_id,
                    outcome,
                    delivery.id,
                    delivery.attempts
                );
                self.ack(delivery).await
            }
            Err(e) if e.is_transient() => {
                tracing::warn!(
                    "{} consumer failed on file {} (message {}, attempt {}): {}",
                    self.handler.name(),
                    file_id,
                    delivery.id,
                    delivery.attempts,
                    e
                );
                match self.source.release(delivery, &e.to_string()).await {
                    Ok(ReleaseOutcome::Retrying { after }) => {
                        tracing::debug!("Message {} retrying in {:?}", delivery.id, after);
                        Settlement::Released
                    }
                    Ok(ReleaseOutcome::DeadLettered) => {
                        tracing::error!(
                            "Message {} for file {} dead-lettered after {} attempts: {}",
                            delivery.id,
                            file_id,
                            delivery.attempts,
                            e
                        );
                        Settlement::DeadLettered
                    }
                    Err(release_err) => {
                        tracing::error!(
                            "Failed to release message {}: {:?}",
                            delivery.id,
                            release_err
                        );
                        Settlement::Unsettled
                    }
                }
            }
            Err(e) => {
                // Retrying cannot change the answer
                tracing::warn!(
                    "{} consumer dropping message {} for file {}: {}",
                    self.handler.name(),
                    delivery.id,
                    file_id,
                    e
                );
                self.ack(delivery).await
            }
        }
    }

    async fn ack(&self, delivery: &Delivery) -> Settlement {
        match self.source.ack(delivery).await {
            Ok(()) => Settlement::Acked,
            Err(e) => {
                // Harmless: the handler is idempotent and will see it again
                tracing::warn!("Failed to acknowledge message {}: {:?}", delivery.id, e);
                Settlement::Unsettled
            }
        }
    }
}

/// Spawn `workers_per_consumer` workers for every handler
pub fn spawn_consumers(
    handlers: Vec<Arc<dyn FileEventHandler>>,
    source: Arc<dyn MessageSource>,
    config: &LifecycleConfig,
    shutdown: watch::Receiver<bool>,
) -> Vec<JoinHandle<()>> {
    let mut tasks = Vec::with_capacity(handlers.len() * config.workers_per_consumer);

    for handler in handlers {
        for worker_index in 0..config.workers_per_consumer {
            let worker =
                ConsumerWorker::new(Arc::clone(&handler), Arc::clone(&source), config, worker_index);
            let shutdown = shutdown.clone();
            tasks.push(tokio::spawn(async move {
                worker.run(shutdown).await;
            }));
        }
    }

    tasks
}
