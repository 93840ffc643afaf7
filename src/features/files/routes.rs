use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::features::files::handlers::{get_file, upload_file};
use crate::features::files::services::FileService;

/// Create routes for the files feature
pub fn routes(file_service: Arc<FileService>, max_upload_size: usize) -> Router {
    Router::new()
        .route(
            "/api/files/upload",
            // Leave room for multipart overhead; the service enforces the exact limit
            post(upload_file).layer(DefaultBodyLimit::max(max_upload_size + 1024 * 1024)),
        )
        .route("/api/files/{id}", get(get_file))
        .with_state(file_service)
}
