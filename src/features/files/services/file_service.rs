use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::files::models::{
    lookup_extension, supported_extensions_list, BlobKeyScheme, CreateFileRecord, FileRecord,
};
use crate::features::files::repositories::FileRepository;
use crate::modules::messaging::{DelayedScheduler, FileEvent};
use crate::modules::storage::BlobStorage;
use crate::shared::validation::{normalize_extension, EXTENSION_REGEX};

/// Service for the upload path and record lookups
pub struct FileService {
    repository: Arc<dyn FileRepository>,
    storage: Arc<dyn BlobStorage>,
    scheduler: Arc<dyn DelayedScheduler>,
    keys: BlobKeyScheme,
    expiration_delay: Duration,
    max_upload_size: usize,
}

impl FileService {
    pub fn new(
        repository: Arc<dyn FileRepository>,
        storage: Arc<dyn BlobStorage>,
        scheduler: Arc<dyn DelayedScheduler>,
        keys: BlobKeyScheme,
        expiration_delay: Duration,
        max_upload_size: usize,
    ) -> Self {
        Self {
            repository,
            storage,
            scheduler,
            keys,
            expiration_delay,
            max_upload_size,
        }
    }

    /// Upload a file and register it as unused
    ///
    /// Order matters: blob, then record, then the deletion check. A failure at
    /// any step leaves nothing behind that the caller could hold an id for.
    ///
    /// # Arguments
    /// * `data` - The file content as bytes
    /// * `declared_extension` - Extension as declared by the client (".PNG", "mp3", ...)
    ///
    /// # Returns
    /// The created record, `used = false`
    pub async fn upload(&self, data: Vec<u8>, declared_extension: &str) -> Result<FileRecord> {
        let extension = normalize_extension(declared_extension);
        let supported = EXTENSION_REGEX
            .is_match(&extension)
            .then(|| lookup_extension(&extension))
            .flatten()
            .ok_or_else(|| {
                AppError::Validation(format!(
                    "File extension '{}' is not supported. Supported extensions: {}",
                    declared_extension,
                    supported_extensions_list()
                ))
            })?;

        if data.is_empty() {
            return Err(AppError::Validation("File is empty".to_string()));
        }
        if data.len() > self.max_upload_size {
            return Err(AppError::Validation(format!(
                "File too large. Maximum size is {} bytes ({} MB)",
                self.max_upload_size,
                self.max_upload_size / 1024 / 1024
            )));
        }

        // Resolved before anything is written
        let deliver_at = chrono::Duration::from_std(self.expiration_delay)
            .ok()
            .and_then(|delay| Utc::now().checked_add_signed(delay))
            .ok_or_else(|| {
                AppError::Internal(format!(
                    "Expiration delay {:?} is out of range",
                    self.expiration_delay
                ))
            })?;

        let file_id = Uuid::new_v4();
        let storage_key = self.keys.key_for(file_id);
        let size = data.len();

        let url = self
            .storage
            .put(&storage_key, data, supported.content_type)
            .await?;
        debug!("Blob stored: key={}, size={}", storage_key, size);

        let record = match self
            .repository
            .create(&CreateFileRecord {
                id: file_id,
                kind: supported.kind,
                storage_key: storage_key.clone(),
                url,
            })
            .await
        {
            Ok(record) => record,
            Err(e) => {
                self.discard_blob(&storage_key).await;
                return Err(e);
            }
        };

        let check = FileEvent::ScheduledDeletionCheck { file_id };
        if let Err(e) = self.scheduler.schedule(check, deliver_at).await {
            warn!(
                "Failed to schedule deletion check for file {}, rolling back upload: {}",
                file_id, e
            );
            // A record must never point at a missing blob
            if self.discard_record(file_id).await {
                self.discard_blob(&storage_key).await;
            } else {
                error!(
                    "Orphaned upload: record {} and blob '{}' kept without a deletion check",
                    file_id, storage_key
                );
            }
            return Err(e);
        }

        info!(
            "File uploaded: id={}, kind={}, key={}, size={}, check_at={}",
            record.id, record.kind, record.storage_key, size, deliver_at
        );

        Ok(record)
    }

    /// Get a file record by id
    pub async fn get(&self, file_id: Uuid) -> Result<FileRecord> {
        self.repository
            .get(file_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("File {} not found", file_id)))
    }

    /// Returns true once the record is gone
    async fn discard_record(&self, file_id: Uuid) -> bool {
        match self.repository.delete_unconditionally(file_id).await {
            Ok(_) => true,
            Err(e) => {
                warn!("Failed to remove record of aborted upload {}: {}", file_id, e);
                false
            }
        }
    }

    async fn discard_blob(&self, storage_key: &str) {
        if let Err(e) = self.storage.delete(storage_key).await {
            warn!("Failed to remove blob of aborted upload '{}': {}", storage_key, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::files::models::FileKind;
    use crate::modules::messaging::FileEventKind;
    use crate::shared::test_helpers::{InMemoryBlobStorage, InMemoryFileRepository, InMemoryQueue};

    const MAX: usize = 1024;

    struct Fixture {
        repository: Arc<InMemoryFileRepository>,
        storage: Arc<InMemoryBlobStorage>,
        queue: Arc<InMemoryQueue>,
        service: FileService,
    }

    fn fixture() -> Fixture {
        let repository = Arc::new(InMemoryFileRepository::new());
        let storage = Arc::new(InMemoryBlobStorage::new());
        let queue = Arc::new(InMemoryQueue::new());
        let service = FileService::new(
            repository.clone(),
            storage.clone(),
            queue.clone(),
            BlobKeyScheme::new("uploads"),
            Duration::from_secs(86_400),
            MAX,
        );
        Fixture {
            repository,
            storage,
            queue,
            service,
        }
    }

    #[tokio::test]
    async fn test_upload_creates_unused_record_blob_and_check() {
        let f = fixture();
        let before = Utc::now();

        let record = f.service.upload(b"png-bytes".to_vec(), ".PNG").await.unwrap();

        assert_eq!(record.kind, FileKind::Image);
        assert!(!record.used);
        assert_eq!(record.storage_key, format!("uploads/{}", record.id));
        assert_eq!(f.storage.blob(&record.storage_key).unwrap(), b"png-bytes");
        assert_eq!(f.storage.content_type(&record.storage_key).unwrap(), "image/png");
        assert_eq!(f.repository.get(record.id).await.unwrap(), Some(record.clone()));

        let scheduled = f.queue.messages(FileEventKind::ScheduledDeletionCheck);
        assert_eq!(scheduled.len(), 1);
        assert_eq!(scheduled[0].event.file_id(), record.id);
        assert!(scheduled[0].deliver_at >= before + chrono::Duration::seconds(86_400));
    }

    #[tokio::test]
    async fn test_audio_extension_maps_to_audio_kind() {
        let f = fixture();
        let record = f.service.upload(vec![1, 2, 3], "mp3").await.unwrap();
        assert_eq!(record.kind, FileKind::Audio);
        assert_eq!(f.storage.content_type(&record.storage_key).unwrap(), "audio/mpeg");
    }

    #[tokio::test]
    async fn test_unsupported_extension_creates_nothing() {
        let f = fixture();

        for ext in ["exe", "pdf", "", "tar.gz", "png "] {
            let result = f.service.upload(vec![1, 2, 3], ext).await;
            // "png " normalizes to "png" and is accepted
            if ext == "png " {
                assert!(result.is_ok());
                continue;
            }
            assert!(
                matches!(result, Err(AppError::Validation(_))),
                "extension {:?} should be rejected",
                ext
            );
        }

        assert_eq!(f.storage.put_count(), 1);
        assert_eq!(f.repository.len(), 1);
        assert_eq!(f.queue.messages(FileEventKind::ScheduledDeletionCheck).len(), 1);
    }

    #[tokio::test]
    async fn test_oversized_and_empty_uploads_are_rejected() {
        let f = fixture();

        let too_big = f.service.upload(vec![0; MAX + 1], "png").await;
        assert!(matches!(too_big, Err(AppError::Validation(_))));

        let empty = f.service.upload(Vec::new(), "png").await;
        assert!(matches!(empty, Err(AppError::Validation(_))));

        assert_eq!(f.storage.put_count(), 0);
        assert_eq!(f.repository.len(), 0);
    }

    #[tokio::test]
    async fn test_blob_write_failure_creates_no_record() {
        let f = fixture();
        f.storage.fail_puts(true);

        let result = f.service.upload(b"bytes".to_vec(), "jpg").await;

        assert!(matches!(result, Err(AppError::ExternalServiceError(_))));
        assert_eq!(f.repository.len(), 0);
        assert!(f.queue.messages(FileEventKind::ScheduledDeletionCheck).is_empty());
    }

    #[tokio::test]
    async fn test_record_failure_discards_blob() {
        let f = fixture();
        f.repository.fail_writes(true);

        let result = f.service.upload(b"bytes".to_vec(), "jpg").await;

        assert!(result.is_err());
        assert_eq!(f.storage.blob_count(), 0);
        assert!(f.queue.messages(FileEventKind::ScheduledDeletionCheck).is_empty());
    }

    #[tokio::test]
    async fn test_schedule_failure_rolls_back_record_and_blob() {
        let f = fixture();
        f.queue.fail_writes(true);

        let result = f.service.upload(b"bytes".to_vec(), "wav").await;

        assert!(result.is_err());
        assert_eq!(f.repository.len(), 0);
        assert_eq!(f.storage.blob_count(), 0);
    }

    #[tokio::test]
    async fn test_failed_rollback_keeps_blob_with_record() {
        let f = fixture();
        f.queue.fail_writes(true);
        f.repository.fail_deletes(true);

        let result = f.service.upload(b"bytes".to_vec(), "png").await;

        assert!(result.is_err());
        assert_eq!(f.repository.len(), 1);
        assert_eq!(f.storage.blob_count(), 1);
        assert_eq!(f.storage.total_delete_count(), 0);
    }

    #[tokio::test]
    async fn test_out_of_range_expiration_writes_nothing() {
        let f = fixture();
        let service = FileService::new(
            f.repository.clone(),
            f.storage.clone(),
            f.queue.clone(),
            BlobKeyScheme::new("uploads"),
            Duration::from_secs(10_000_000_000_000),
            MAX,
        );

        let result = service.upload(b"bytes".to_vec(), "png").await;

        assert!(matches!(result, Err(AppError::Internal(_))));
        assert_eq!(f.storage.put_count(), 0);
        assert_eq!(f.repository.len(), 0);
        assert!(f.queue.messages(FileEventKind::ScheduledDeletionCheck).is_empty());
    }

    #[tokio::test]
    async fn test_get_missing_file_is_not_found() {
        let f = fixture();
        let result = f.service.get(Uuid::new_v4()).await;
        assert!(matches!(result, Err(AppError::NotFound(_))));
    }
}
