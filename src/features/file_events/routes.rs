use axum::{routing::post, Router};
use std::sync::Arc;

use crate::features::file_events::handlers::{publish_event, publish_events_batch};
use crate::features::file_events::services::FileReferencePublisher;

/// Create routes for the event ingress
pub fn routes(publisher: Arc<FileReferencePublisher>) -> Router {
    Router::new()
        .route("/api/file-events", post(publish_event))
        .route("/api/file-events/batch", post(publish_events_batch))
        .with_state(publisher)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::modules::messaging::FileEventKind;
    use crate::shared::test_helpers::InMemoryQueue;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use serde_json::json;
    use tower::ServiceExt;
    use uuid::Uuid;

    fn router() -> (Arc<InMemoryQueue>, Router) {
        let queue = Arc::new(InMemoryQueue::new());
        let publisher = Arc::new(FileReferencePublisher::new(queue.clone()));
        (queue, routes(publisher))
    }

    fn post_json(uri: &str, body: serde_json::Value) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[tokio::test]
    async fn test_accepts_file_referenced() {
        let (queue, app) = router();
        let file_id = Uuid::new_v4();

        let response = app
            .oneshot(post_json(
                "/api/file-events",
                json!({"event": "file_referenced", "file_id": file_id}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let queued = queue.messages(FileEventKind::FileReferenced);
        assert_eq!(queued.len(), 1);
        assert_eq!(queued[0].event.file_id(), file_id);
    }

    #[tokio::test]
    async fn test_rejects_scheduled_deletion_check() {
        let (queue, app) = router();

        let response = app
            .oneshot(post_json(
                "/api/file-events",
                json!({"event": "scheduled_deletion_check", "file_id": Uuid::new_v4()}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(queue
            .messages(FileEventKind::ScheduledDeletionCheck)
            .is_empty());
    }

    #[tokio::test]
    async fn test_rejects_malformed_file_id() {
        let (_queue, app) = router();

        let response = app
            .oneshot(post_json(
                "/api/file-events",
                json!({"event": "file_referenced", "file_id": "not-a-uuid"}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_queue_outage_is_an_error() {
        let (queue, app) = router();
        queue.fail_writes(true);

        let response = app
            .oneshot(post_json(
                "/api/file-events",
                json!({"event": "file_referenced", "file_id": Uuid::new_v4()}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }

    #[tokio::test]
    async fn test_batch_enqueues_every_event() {
        let (queue, app) = router();

        let response = app
            .oneshot(post_json(
                "/api/file-events/batch",
                json!({"events": [
                    {"event": "file_referenced", "file_id": Uuid::new_v4()},
                    {"event": "file_referenced", "file_id": Uuid::new_v4()},
                    {"event": "referencing_entity_deleted", "file_id": Uuid::new_v4()},
                ]}),
            ))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body["data"]["accepted"], 3);
        assert_eq!(queue.messages(FileEventKind::FileReferenced).len(), 2);
        assert_eq!(
            queue.messages(FileEventKind::ReferencingEntityDeleted).len(),
            1
        );
    }

    #[tokio::test]
    async fn test_empty_batch_is_rejected() {
        let (_queue, app) = router();

        let response = app
            .oneshot(post_json("/api/file-events/batch", json!({"events": []})))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
