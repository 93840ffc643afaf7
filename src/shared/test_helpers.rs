//! In-memory doubles for the repository, blob storage and queue ports

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::files::models::{CreateFileRecord, FileKind, FileRecord};
use crate::features::files::repositories::{
    DeleteIfUnused, DeleteUnconditionally, FileRepository, MarkUsed,
};
use crate::modules::messaging::{
    retry_delay, DelayedScheduler, Delivery, EventPublisher, FileEvent, FileEventKind,
    MessageSource, ReleaseOutcome,
};
use crate::modules::storage::BlobStorage;

fn unavailable_database() -> AppError {
    AppError::Database(sqlx::Error::PoolTimedOut)
}

/// File records behind one mutex, so every operation is atomic like the
/// single-statement Postgres queries
#[derive(Default)]
pub struct InMemoryFileRepository {
    records: Mutex<HashMap<Uuid, FileRecord>>,
    fail_writes: AtomicBool,
    fail_deletes: AtomicBool,
}

impl InMemoryFileRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.lock().unwrap().len()
    }

    /// Make every write fail with a transient database error
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Make only the two delete operations fail
    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }

    fn check_deletes(&self) -> Result<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(unavailable_database());
        }
        self.check_writes()
    }

    fn check_writes(&self) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(unavailable_database());
        }
        Ok(())
    }
}

#[async_trait]
impl FileRepository for InMemoryFileRepository {
    async fn create(&self, data: &CreateFileRecord) -> Result<FileRecord> {
        self.check_writes()?;

        let record = FileRecord {
            id: data.id,
            kind: data.kind,
            storage_key: data.storage_key.clone(),
            url: data.url.clone(),
            used: false,
            created_at: Utc::now(),
        };

        let mut records = self.records.lock().unwrap();
        if records.contains_key(&data.id) {
            return Err(AppError::Internal(format!("duplicate file id {}", data.id)));
        }
        records.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get(&self, id: Uuid) -> Result<Option<FileRecord>> {
        Ok(self.records.lock().unwrap().get(&id).cloned())
    }

    async fn mark_used(&self, id: Uuid) -> Result<MarkUsed> {
        self.check_writes()?;

        match self.records.lock().unwrap().get_mut(&id) {
            Some(record) => {
                record.used = true;
                Ok(MarkUsed::Marked)
            }
            None => Ok(MarkUsed::NotFound),
        }
    }

    async fn delete_if_unused(&self, id: Uuid) -> Result<DeleteIfUnused> {
        self.check_deletes()?;

        let mut records = self.records.lock().unwrap();
        match records.get(&id) {
            None => Ok(DeleteIfUnused::NotFound),
            Some(record) if record.used => Ok(DeleteIfUnused::StillUsed),
            Some(_) => Ok(records
                .remove(&id)
                .map(DeleteIfUnused::Deleted)
                .unwrap_or(DeleteIfUnused::NotFound)),
        }
    }

    async fn delete_unconditionally(&self, id: Uuid) -> Result<DeleteUnconditionally> {
        self.check_deletes()?;

        match self.records.lock().unwrap().remove(&id) {
            Some(_) => Ok(DeleteUnconditionally::Deleted),
            None => Ok(DeleteUnconditionally::NotFound),
        }
    }
}

/// Blob store keeping bytes and content types in memory
#[derive(Default)]
pub struct InMemoryBlobStorage {
    blobs: Mutex<HashMap<String, (Vec<u8>, String)>>,
    deletes: Mutex<HashMap<String, usize>>,
    puts: AtomicUsize,
    fail_puts: AtomicBool,
    fail_deletes: AtomicBool,
}

impl InMemoryBlobStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn blob(&self, key: &str) -> Option<Vec<u8>> {
        self.blobs.lock().unwrap().get(key).map(|(data, _)| data.clone())
    }

    pub fn content_type(&self, key: &str) -> Option<String> {
        self.blobs
            .lock()
            .unwrap()
            .get(key)
            .map(|(_, content_type)| content_type.clone())
    }

    /// Successful puts so far
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn blob_count(&self) -> usize {
        self.blobs.lock().unwrap().len()
    }

    /// Successful delete calls for `key`, including ones on an absent key
    pub fn delete_count(&self, key: &str) -> usize {
        self.deletes.lock().unwrap().get(key).copied().unwrap_or(0)
    }

    pub fn total_delete_count(&self) -> usize {
        self.deletes.lock().unwrap().values().sum()
    }

    pub fn fail_puts(&self, fail: bool) {
        self.fail_puts.store(fail, Ordering::SeqCst);
    }

    pub fn fail_deletes(&self, fail: bool) {
        self.fail_deletes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl BlobStorage for InMemoryBlobStorage {
    async fn put(&self, key: &str, data: Vec<u8>, content_type: &str) -> Result<String> {
        if self.fail_puts.load(Ordering::SeqCst) {
            return Err(AppError::ExternalServiceError(
                "blob storage unavailable".to_string(),
            ));
        }

        self.blobs
            .lock()
            .unwrap()
            .insert(key.to_string(), (data, content_type.to_string()));
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(format!("http://storage.test/{}", key))
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.blob(key))
    }

    async fn delete(&self, key: &str) -> Result<()> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(AppError::ExternalServiceError(
                "blob storage unavailable".to_string(),
            ));
        }

        self.blobs.lock().unwrap().remove(key);
        *self
            .deletes
            .lock()
            .unwrap()
            .entry(key.to_string())
            .or_insert(0) += 1;
        Ok(())
    }
}

/// A message as the in-memory queue holds it
#[derive(Debug, Clone)]
pub struct QueuedMessage {
    pub id: Uuid,
    pub event: FileEvent,
    pub deliver_at: DateTime<Utc>,
    pub attempts: i32,
    pub last_error: Option<String>,
    pub dead: bool,
}

/// Queue with the same lease, retry and dead-letter rules as the Postgres one.
/// Retries become visible immediately.
pub struct InMemoryQueue {
    messages: Mutex<Vec<QueuedMessage>>,
    max_attempts: i32,
    fail_writes: AtomicBool,
}

impl Default for InMemoryQueue {
    fn default() -> Self {
        Self::with_max_attempts(10)
    }
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_attempts(max_attempts: i32) -> Self {
        Self {
            messages: Mutex::new(Vec::new()),
            max_attempts,
            fail_writes: AtomicBool::new(false),
        }
    }

    /// Every message of `kind` still in the queue, dead ones included
    pub fn messages(&self, kind: FileEventKind) -> Vec<QueuedMessage> {
        self.messages
            .lock()
            .unwrap()
            .iter()
            .filter(|m| m.event.kind() == kind)
            .cloned()
            .collect()
    }

    /// Make publish and schedule fail
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn push(&self, event: FileEvent, deliver_at: DateTime<Utc>) -> Result<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(unavailable_database());
        }

        self.messages.lock().unwrap().push(QueuedMessage {
            id: Uuid::now_v7(),
            event,
            deliver_at,
            attempts: 0,
            last_error: None,
            dead: false,
        });
        Ok(())
    }
}

#[async_trait]
impl EventPublisher for InMemoryQueue {
    async fn publish(&self, event: FileEvent) -> Result<()> {
        self.push(event, Utc::now())
    }
}

#[async_trait]
impl DelayedScheduler for InMemoryQueue {
    async fn schedule(&self, event: FileEvent, deliver_at: DateTime<Utc>) -> Result<()> {
        self.push(event, deliver_at)
    }
}

#[async_trait]
impl MessageSource for InMemoryQueue {
    async fn receive(
        &self,
        kind: FileEventKind,
        batch_size: i64,
        visibility_timeout: Duration,
    ) -> Result<Vec<Delivery>> {
        let now = Utc::now();
        let lease_until = now
            + chrono::Duration::from_std(visibility_timeout)
                .unwrap_or_else(|_| chrono::Duration::seconds(60));

        let mut messages = self.messages.lock().unwrap();
        let mut due: Vec<&mut QueuedMessage> = messages
            .iter_mut()
            .filter(|m| m.event.kind() == kind && !m.dead && m.deliver_at <= now)
            .collect();
        due.sort_by_key(|m| m.deliver_at);

        Ok(due
            .into_iter()
            .take(batch_size.max(0) as usize)
            .map(|m| {
                m.deliver_at = lease_until;
                m.attempts += 1;
                Delivery {
                    id: m.id,
                    event: m.event,
                    attempts: m.attempts,
                }
            })
            .collect())
    }

    async fn ack(&self, delivery: &Delivery) -> Result<()> {
        self.messages.lock().unwrap().retain(|m| m.id != delivery.id);
        Ok(())
    }

    async fn release(&self, delivery: &Delivery, error: &str) -> Result<ReleaseOutcome> {
        let mut messages = self.messages.lock().unwrap();
        let Some(message) = messages.iter_mut().find(|m| m.id == delivery.id) else {
            return Ok(ReleaseOutcome::Retrying {
                after: Duration::ZERO,
            });
        };

        message.last_error = Some(error.to_string());
        if message.attempts >= self.max_attempts {
            message.dead = true;
            return Ok(ReleaseOutcome::DeadLettered);
        }

        let after = retry_delay(Duration::ZERO, message.attempts);
        message.deliver_at = Utc::now();
        Ok(ReleaseOutcome::Retrying { after })
    }
}

/// A leased delivery of `event` on its `attempts`-th delivery
pub fn delivery(event: FileEvent, attempts: i32) -> Delivery {
    Delivery {
        id: Uuid::now_v7(),
        event,
        attempts,
    }
}

/// Store an unused image record and its blob under `uploads/{id}`
pub async fn seed_file(
    repository: &InMemoryFileRepository,
    storage: &InMemoryBlobStorage,
) -> FileRecord {
    let id = Uuid::now_v7();
    let storage_key = format!("uploads/{}", id);
    let url = storage
        .put(&storage_key, b"seed".to_vec(), "image/png")
        .await
        .unwrap();

    repository
        .create(&CreateFileRecord {
            id,
            kind: FileKind::Image,
            storage_key,
            url,
        })
        .await
        .unwrap()
}
