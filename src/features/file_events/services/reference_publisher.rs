use std::sync::Arc;
use uuid::Uuid;

use crate::core::error::Result;
use crate::modules::messaging::{EventPublisher, FileEvent};

/// What a service holding file ids on its own entities calls into.
///
/// Each method must be retried by the caller until it succeeds; duplicates are
/// harmless on the consuming side.
pub struct FileReferencePublisher {
    publisher: Arc<dyn EventPublisher>,
}

impl FileReferencePublisher {
    pub fn new(publisher: Arc<dyn EventPublisher>) -> Self {
        Self { publisher }
    }

    /// An entity capturing `file_id` was persisted
    pub async fn entity_created(&self, file_id: Uuid) -> Result<()> {
        self.publisher
            .publish(FileEvent::FileReferenced { file_id })
            .await
    }

    /// An entity capturing `file_id` was deleted
    pub async fn entity_deleted(&self, file_id: Uuid) -> Result<()> {
        self.publisher
            .publish(FileEvent::ReferencingEntityDeleted { file_id })
            .await
    }

    /// An entity's file was swapped for another one
    ///
    /// The new file is referenced before the old one is released, so a failure
    /// in between leaves an extra file rather than a dangling id.
    pub async fn entity_file_replaced(&self, old: Option<Uuid>, new: Option<Uuid>) -> Result<()> {
        if old == new {
            return Ok(());
        }

        if let Some(file_id) = new {
            self.entity_created(file_id).await?;
        }
        if let Some(file_id) = old {
            self.entity_deleted(file_id).await?;
        }

        Ok(())
    }

    /// Forward an event received at the ingress
    pub async fn forward(&self, event: FileEvent) -> Result<()> {
        self.publisher.publish(event).await
    }
}
