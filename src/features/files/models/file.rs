use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use super::FileKind;

/// Database model for a file record
///
/// A row exists only while its blob exists. `used` goes false -> true at most
/// once and is never reset; the row is removed either by the deletion consumer
/// (any state) or by the garbage collector (only while unused).
#[derive(Debug, Clone, PartialEq, Eq, FromRow)]
pub struct FileRecord {
    pub id: Uuid,
    pub kind: FileKind,
    pub storage_key: String,
    pub url: String,
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

/// Data for inserting a new (unused) file record
#[derive(Debug, Clone)]
pub struct CreateFileRecord {
    pub id: Uuid,
    pub kind: FileKind,
    pub storage_key: String,
    pub url: String,
}
