use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use std::time::Duration;

use super::{EventPublisher, FileEvent};
use crate::core::error::{AppError, Result};

const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Publishes lifecycle events to a remote file service's ingress endpoint.
///
/// Used by reference producers that do not share the file service's database.
/// A failed publish must be retried by the caller; the ingress tolerates
/// duplicates.
pub struct HttpEventPublisher {
    http_client: Client,
    events_url: String,
}

impl HttpEventPublisher {
    /// `base_url` is the file service root, e.g. `http://files.internal:3000`
    pub fn new(base_url: &str) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| AppError::Internal(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            http_client,
            events_url: format!("{}/api/file-events", base_url.trim_end_matches('/')),
        })
    }

    pub fn events_url(&self) -> &str {
        &self.events_url
    }
}

#[async_trait]
impl EventPublisher for HttpEventPublisher {
    async fn publish(&self, event: FileEvent) -> Result<()> {
        let response = self
            .http_client
            .post(&self.events_url)
            .json(&event)
            .send()
            .await
            .map_err(|e| {
                AppError::ExternalServiceError(format!(
                    "Failed to publish {} for file {}: {}",
                    event.kind(),
                    event.file_id(),
                    e
                ))
            })?;

        let status = response.status();
        if status.is_success() {
            tracing::debug!("Published {} for file {}", event.kind(), event.file_id());
            return Ok(());
        }

        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "Unknown error".to_string());

        // A rejected payload will be rejected again; anything else may recover
        if status == StatusCode::BAD_REQUEST {
            Err(AppError::Validation(format!(
                "File service rejected {} for file {}: {}",
                event.kind(),
                event.file_id(),
                body
            )))
        } else {
            Err(AppError::ExternalServiceError(format!(
                "File service answered {} to {} for file {}: {}",
                status,
                event.kind(),
                event.file_id(),
                body
            )))
        }
    }
}
