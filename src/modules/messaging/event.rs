use serde::{Deserialize, Serialize};
use sqlx::Type;
use uuid::Uuid;

/// Discriminant of a lifecycle event, stored alongside each queued message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[sqlx(type_name = "file_event_kind", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FileEventKind {
    FileReferenced,
    ReferencingEntityDeleted,
    ScheduledDeletionCheck,
}

impl FileEventKind {
    pub const ALL: [FileEventKind; 3] = [
        FileEventKind::FileReferenced,
        FileEventKind::ReferencingEntityDeleted,
        FileEventKind::ScheduledDeletionCheck,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FileEventKind::FileReferenced => "file_referenced",
            FileEventKind::ReferencingEntityDeleted => "referencing_entity_deleted",
            FileEventKind::ScheduledDeletionCheck => "scheduled_deletion_check",
        }
    }
}

impl std::fmt::Display for FileEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A file lifecycle event
///
/// Wire form: `{"event": "<kind>", "file_id": "<uuid>"}`.
/// `FileReferenced` and `ReferencingEntityDeleted` come from reference
/// producers; `ScheduledDeletionCheck` is only ever scheduled by the upload path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum FileEvent {
    FileReferenced { file_id: Uuid },
    ReferencingEntityDeleted { file_id: Uuid },
    ScheduledDeletionCheck { file_id: Uuid },
}

impl FileEvent {
    pub fn new(kind: FileEventKind, file_id: Uuid) -> Self {
        match kind {
            FileEventKind::FileReferenced => FileEvent::FileReferenced { file_id },
            FileEventKind::ReferencingEntityDeleted => {
                FileEvent::ReferencingEntityDeleted { file_id }
            }
            FileEventKind::ScheduledDeletionCheck => FileEvent::ScheduledDeletionCheck { file_id },
        }
    }

    pub fn kind(&self) -> FileEventKind {
        match self {
            FileEvent::FileReferenced { .. } => FileEventKind::FileReferenced,
            FileEvent::ReferencingEntityDeleted { .. } => FileEventKind::ReferencingEntityDeleted,
            FileEvent::ScheduledDeletionCheck { .. } => FileEventKind::ScheduledDeletionCheck,
        }
    }

    pub fn file_id(&self) -> Uuid {
        match *self {
            FileEvent::FileReferenced { file_id }
            | FileEvent::ReferencingEntityDeleted { file_id }
            | FileEvent::ScheduledDeletionCheck { file_id } => file_id,
        }
    }
}
