use axum::{
    extract::{Multipart, Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tracing::debug;
use uuid::Uuid;

use crate::core::error::AppError;
use crate::features::files::dtos::{FileResponseDto, UploadFileDto};
use crate::features::files::services::FileService;
use crate::shared::types::ApiResponse;
use crate::shared::validation::extension_from_filename;

/// Upload a file
///
/// Accepts multipart/form-data with:
/// - `file`: The file to upload (required)
/// - `extension`: Declared extension (optional, defaults to the file name's extension)
///
/// The file starts out unused and is reclaimed after the expiration delay
/// unless some service publishes a `file_referenced` event for it.
#[utoipa::path(
    post,
    path = "/api/files/upload",
    tag = "files",
    request_body(
        content = UploadFileDto,
        content_type = "multipart/form-data",
        description = "File upload form with an optional declared extension",
    ),
    responses(
        (status = 201, description = "File uploaded successfully", body = ApiResponse<FileResponseDto>),
        (status = 400, description = "Unsupported extension or invalid upload"),
        (status = 413, description = "File too large"),
        (status = 502, description = "Blob storage unavailable")
    )
)]
pub async fn upload_file(
    State(service): State<Arc<FileService>>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<ApiResponse<FileResponseDto>>), AppError> {
    let mut file_data: Option<Vec<u8>> = None;
    let mut file_name: Option<String> = None;
    let mut declared_extension: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(|e| {
        debug!("Failed to read multipart field: {}", e);
        AppError::BadRequest(format!("Failed to read multipart data: {}", e))
    })? {
        let field_name = field.name().unwrap_or("").to_string();

        match field_name.as_str() {
            "file" => {
                file_name = field.file_name().map(|s| s.to_string());

                let data = field.bytes().await.map_err(|e| {
                    debug!("Failed to read file bytes: {}", e);
                    AppError::BadRequest(format!("Failed to read file data: {}", e))
                })?;
                file_data = Some(data.to_vec());
            }
            "extension" => {
                let text = field.text().await.map_err(|e| {
                    AppError::BadRequest(format!("Failed to read extension field: {}", e))
                })?;
                if !text.trim().is_empty() {
                    declared_extension = Some(text);
                }
            }
            _ => {
                debug!("Ignoring unknown field: {}", field_name);
            }
        }
    }

    let file_data =
        file_data.ok_or_else(|| AppError::BadRequest("File is required".to_string()))?;

    let extension = declared_extension
        .or_else(|| {
            file_name
                .as_deref()
                .and_then(extension_from_filename)
                .map(str::to_string)
        })
        .ok_or_else(|| {
            AppError::Validation(
                "File extension is required (extension field or file name)".to_string(),
            )
        })?;

    let record = service.upload(file_data, &extension).await?;

    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(Some(record.into()), None)),
    ))
}

/// Get a file record
#[utoipa::path(
    get,
    path = "/api/files/{id}",
    tag = "files",
    params(
        ("id" = Uuid, Path, description = "File id")
    ),
    responses(
        (status = 200, description = "File found", body = ApiResponse<FileResponseDto>),
        (status = 404, description = "File not found or already reclaimed")
    )
)]
pub async fn get_file(
    State(service): State<Arc<FileService>>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<FileResponseDto>>, AppError> {
    let record = service.get(id).await?;
    Ok(Json(ApiResponse::success(Some(record.into()), None)))
}
