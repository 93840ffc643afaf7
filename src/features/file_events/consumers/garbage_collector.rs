use async_trait::async_trait;
use std::sync::Arc;

use super::{ConsumerOutcome, FileEventHandler};
use crate::core::error::Result;
use crate::features::files::models::BlobKeyScheme;
use crate::features::files::repositories::{DeleteIfUnused, FileRepository};
use crate::modules::messaging::{Delivery, FileEventKind};
use crate::modules::storage::BlobStorage;

/// Handles `scheduled_deletion_check`: reclaims a file nobody referenced
///
/// Acts only on the record's current state. The conditional delete is what
/// establishes "never referenced", so it commits before the blob is touched.
pub struct GarbageCollectorConsumer {
    repository: Arc<dyn FileRepository>,
    storage: Arc<dyn BlobStorage>,
    keys: BlobKeyScheme,
}

impl GarbageCollectorConsumer {
    pub fn new(
        repository: Arc<dyn FileRepository>,
        storage: Arc<dyn BlobStorage>,
        keys: BlobKeyScheme,
    ) -> Self {
        Self {
            repository,
            storage,
            keys,
        }
    }
}

#[async_trait]
impl FileEventHandler for GarbageCollectorConsumer {
    fn kind(&self) -> FileEventKind {
        FileEventKind::ScheduledDeletionCheck
    }

    fn name(&self) -> &'static str {
        "garbage_collector"
    }

    async fn handle(&self, delivery: &Delivery) -> Result<ConsumerOutcome> {
        let file_id = delivery.event.file_id();

        match self.repository.delete_if_unused(file_id).await? {
            DeleteIfUnused::Deleted(record) => {
                // If this fails the redelivery lands in the NotFound arm below
                self.storage.delete(&record.storage_key).await?;
                tracing::info!(
                    "Unreferenced file {} collected (kind={}, uploaded={})",
                    file_id,
                    record.kind,
                    record.created_at
                );
                Ok(ConsumerOutcome::Reclaimed)
            }
            DeleteIfUnused::StillUsed => Ok(ConsumerOutcome::Protected),
            DeleteIfUnused::NotFound if delivery.attempts > 1 => {
                // An earlier attempt may have committed the record delete and
                // then failed on the blob
                self.storage.delete(&self.keys.key_for(file_id)).await?;
                Ok(ConsumerOutcome::BlobSwept)
            }
            DeleteIfUnused::NotFound => Ok(ConsumerOutcome::AlreadyGone),
        }
    }
}
