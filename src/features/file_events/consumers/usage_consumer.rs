use async_trait::async_trait;
use std::sync::Arc;

use super::{ConsumerOutcome, FileEventHandler};
use crate::core::error::Result;
use crate::features::files::repositories::{FileRepository, MarkUsed};
use crate::modules::messaging::{Delivery, FileEventKind};

/// Handles `file_referenced`: protects the file from collection
pub struct UsageConsumer {
    repository: Arc<dyn FileRepository>,
}

impl UsageConsumer {
    pub fn new(repository: Arc<dyn FileRepository>) -> Self {
        Self { repository }
    }
}

#[async_trait]
impl FileEventHandler for UsageConsumer {
    fn kind(&self) -> FileEventKind {
        FileEventKind::FileReferenced
    }

    fn name(&self) -> &'static str {
        "usage"
    }

    async fn handle(&self, delivery: &Delivery) -> Result<ConsumerOutcome> {
        let file_id = delivery.event.file_id();

        match self.repository.mark_used(file_id).await? {
            MarkUsed::Marked => Ok(ConsumerOutcome::MarkedUsed),
            // Reclaimed before the reference arrived, or a stale duplicate
            MarkUsed::NotFound => {
                tracing::debug!("Reference to missing file {} ignored", file_id);
                Ok(ConsumerOutcome::AlreadyGone)
            }
        }
    }
}
