use async_trait::async_trait;
use std::sync::Arc;

use super::{ConsumerOutcome, FileEventHandler};
use crate::core::error::Result;
use crate::features::files::repositories::{DeleteUnconditionally, FileRepository};
use crate::modules::messaging::{Delivery, FileEventKind};
use crate::modules::storage::BlobStorage;

/// Handles `referencing_entity_deleted`: reclaims the file whatever its `used` flag
///
/// The blob goes first. If the record delete then fails, the redelivered
/// message finds the record again and the blob delete is a no-op.
pub struct DeletionConsumer {
    repository: Arc<dyn FileRepository>,
    storage: Arc<dyn BlobStorage>,
}

impl DeletionConsumer {
    pub fn new(repository: Arc<dyn FileRepository>, storage: Arc<dyn BlobStorage>) -> Self {
        Self {
            repository,
            storage,
        }
    }
}

#[async_trait]
impl FileEventHandler for DeletionConsumer {
    fn kind(&self) -> FileEventKind {
        FileEventKind::ReferencingEntityDeleted
    }

    fn name(&self) -> &'static str {
        "deletion"
    }

    async fn handle(&self, delivery: &Delivery) -> Result<ConsumerOutcome> {
        let file_id = delivery.event.file_id();

        let Some(record) = self.repository.get(file_id).await? else {
            return Ok(ConsumerOutcome::AlreadyGone);
        };

        // On failure the record stays so the redelivery can find the key again
        self.storage.delete(&record.storage_key).await?;

        match self.repository.delete_unconditionally(file_id).await? {
            DeleteUnconditionally::Deleted => {
                tracing::info!(
                    "File {} reclaimed after its referencing entity was deleted (used={})",
                    file_id,
                    record.used
                );
                Ok(ConsumerOutcome::Reclaimed)
            }
            // A competing consumer finished first
            DeleteUnconditionally::NotFound => Ok(ConsumerOutcome::AlreadyGone),
        }
    }
}
