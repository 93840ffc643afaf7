use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::modules::messaging::FileEvent;

/// Maximum number of events per batch request
pub const MAX_BATCH_EVENTS: u64 = 100;

/// Event a reference producer may publish
///
/// `scheduled_deletion_check` is internal to the upload path and is not
/// accepted here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PublishFileEventDto {
    /// An entity capturing the file was persisted
    FileReferenced { file_id: Uuid },
    /// An entity capturing the file was deleted
    ReferencingEntityDeleted { file_id: Uuid },
}

impl From<PublishFileEventDto> for FileEvent {
    fn from(dto: PublishFileEventDto) -> Self {
        match dto {
            PublishFileEventDto::FileReferenced { file_id } => FileEvent::FileReferenced { file_id },
            PublishFileEventDto::ReferencingEntityDeleted { file_id } => {
                FileEvent::ReferencingEntityDeleted { file_id }
            }
        }
    }
}

/// Request DTO for publishing several events at once
#[derive(Debug, Serialize, Deserialize, Validate, ToSchema)]
pub struct PublishFileEventsBatchDto {
    #[validate(length(min = 1, max = MAX_BATCH_EVENTS, message = "A batch carries 1-100 events"))]
    pub events: Vec<PublishFileEventDto>,
}

/// Response DTO for accepted events
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AcceptedEventsDto {
    /// Number of events enqueued
    pub accepted: usize,
}
