use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::features::files::models::{FileKind, FileRecord};

/// Upload file request DTO for OpenAPI documentation
/// Note: This struct is for Swagger UI documentation only.
/// The actual handler uses axum's Multipart extractor directly.
#[derive(Debug, ToSchema)]
#[allow(dead_code)]
pub struct UploadFileDto {
    /// The file to upload
    #[schema(format = Binary, content_media_type = "application/octet-stream")]
    pub file: String,
    /// Declared extension; defaults to the extension of the uploaded file name
    #[schema(example = "png")]
    pub extension: Option<String>,
}

/// Response DTO for file operations
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct FileResponseDto {
    /// Opaque file id; reference producers pass it around in their events
    pub id: Uuid,
    pub kind: FileKind,
    /// URL to access the file
    pub url: String,
    /// Whether some entity references the file
    pub used: bool,
    pub created_at: DateTime<Utc>,
}

impl From<FileRecord> for FileResponseDto {
    fn from(record: FileRecord) -> Self {
        Self {
            id: record.id,
            kind: record.kind,
            url: record.url,
            used: record.used,
            created_at: record.created_at,
        }
    }
}
