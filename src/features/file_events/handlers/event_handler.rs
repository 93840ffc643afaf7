use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use validator::Validate;

use crate::core::error::{AppError, Result};
use crate::core::extractor::AppJson;
use crate::features::file_events::dtos::{
    AcceptedEventsDto, PublishFileEventDto, PublishFileEventsBatchDto,
};
use crate::features::file_events::services::FileReferencePublisher;
use crate::shared::types::ApiResponse;

/// Publish a file lifecycle event
///
/// Reference producers call this when they persist or delete an entity that
/// carries a file id. Delivery is at-least-once, so retrying after an error
/// is always safe.
#[utoipa::path(
    post,
    path = "/api/file-events",
    tag = "file-events",
    request_body = PublishFileEventDto,
    responses(
        (status = 202, description = "Event enqueued", body = ApiResponse<AcceptedEventsDto>),
        (status = 400, description = "Unknown or internal event type, or malformed payload"),
        (status = 500, description = "Queue unavailable; retry")
    )
)]
pub async fn publish_event(
    State(publisher): State<Arc<FileReferencePublisher>>,
    AppJson(dto): AppJson<PublishFileEventDto>,
) -> Result<(StatusCode, Json<ApiResponse<AcceptedEventsDto>>)> {
    publisher.forward(dto.into()).await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse::success(
            Some(AcceptedEventsDto { accepted: 1 }),
            None,
        )),
    ))
}

/// Publish a batch of file lifecycle events
///
/// Events are enqueued in order. On failure the earlier events stay enqueued;
/// resending the whole batch is safe.
#[utoipa::path(
    post,
    path = "/api/file-events/batch",
    tag = "file-events",
    request_body = PublishFileEventsBatchDto,
    responses(
        (status = 202, description = "All events enqueued", body = ApiResponse<AcceptedEventsDto>),
        (status = 400, description = "Validation error"),
        (status = 500, description = "Queue unavailable; retry")
    )
)]
pub async fn publish_events_batch(
    State(publisher): State<Arc<FileReferencePublisher>>,
    AppJson(dto): AppJson<PublishFileEventsBatchDto>,
) -> Result<(StatusCode, Json<ApiResponse<AcceptedEventsDto>>)> {
    dto.validate()
        .map_err(|e| AppError::Validation(e.to_string()))?;

    for event in &dto.events {
        publisher.forward((*event).into()).await?;
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(ApiResponse::success(
            Some(AcceptedEventsDto {
                accepted: dto.events.len(),
            }),
            None,
        )),
    ))
}
