use utoipa::{Modify, OpenApi};

use crate::features::file_events::{dtos as file_events_dtos, handlers as file_events_handlers};
use crate::features::files::models::FileKind;
use crate::features::files::{dtos as files_dtos, handlers as files_handlers};
use crate::shared::types::ApiResponse;

#[derive(OpenApi)]
#[openapi(
    paths(
        // Files
        files_handlers::upload_file,
        files_handlers::get_file,
        // File events (reference producers)
        file_events_handlers::publish_event,
        file_events_handlers::publish_events_batch,
    ),
    components(
        schemas(
            // Files
            FileKind,
            files_dtos::UploadFileDto,
            files_dtos::FileResponseDto,
            ApiResponse<files_dtos::FileResponseDto>,
            // File events
            file_events_dtos::PublishFileEventDto,
            file_events_dtos::PublishFileEventsBatchDto,
            file_events_dtos::AcceptedEventsDto,
            ApiResponse<file_events_dtos::AcceptedEventsDto>,
        )
    ),
    tags(
        (name = "files", description = "File upload and lookup"),
        (name = "file-events", description = "Reference events published by services that hold file ids"),
    ),
    info(
        title = "File Lifecycle API",
        version = "0.1.0",
        description = "Uploads start unused and are reclaimed unless referenced",
    )
)]
pub struct ApiDoc;

/// Modifier to override OpenAPI info from config
pub struct SwaggerInfoModifier {
    pub title: String,
    pub version: String,
    pub description: String,
}

impl Modify for SwaggerInfoModifier {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        openapi.info.title = self.title.clone();
        openapi.info.version = self.version.clone();
        openapi.info.description = Some(self.description.clone());
    }
}
