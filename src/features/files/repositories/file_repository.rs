use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::core::error::{AppError, Result};
use crate::features::files::models::{CreateFileRecord, FileKind, FileRecord};

/// Result of marking a record as referenced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkUsed {
    /// The record is now (or already was) used
    Marked,
    NotFound,
}

/// Result of the garbage collector's conditional delete
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteIfUnused {
    /// The row was removed; carries the removed record so its blob can follow
    Deleted(FileRecord),
    /// The row exists and is protected by a reference
    StillUsed,
    NotFound,
}

/// Result of the deletion consumer's unconditional delete
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteUnconditionally {
    Deleted,
    NotFound,
}

/// Persistence port for file records.
///
/// Every state-changing method is a single atomic statement against the
/// backing store; callers never combine a read with a later write to decide
/// whether a record may be removed.
#[async_trait]
pub trait FileRepository: Send + Sync {
    async fn create(&self, data: &CreateFileRecord) -> Result<FileRecord>;

    async fn get(&self, id: Uuid) -> Result<Option<FileRecord>>;

    /// Idempotent: marking an already-used record reports `Marked`
    async fn mark_used(&self, id: Uuid) -> Result<MarkUsed>;

    /// Delete the record only if `used` is still false at commit time
    async fn delete_if_unused(&self, id: Uuid) -> Result<DeleteIfUnused>;

    async fn delete_unconditionally(&self, id: Uuid) -> Result<DeleteUnconditionally>;
}

/// One-row answer of the conditional delete statement
#[derive(Debug, FromRow)]
struct ConditionalDeleteRow {
    found: bool,
    id: Option<Uuid>,
    kind: Option<FileKind>,
    storage_key: Option<String>,
    url: Option<String>,
    used: Option<bool>,
    created_at: Option<DateTime<Utc>>,
}

impl ConditionalDeleteRow {
    fn into_outcome(self) -> DeleteIfUnused {
        match (
            self.id,
            self.kind,
            self.storage_key,
            self.url,
            self.used,
            self.created_at,
        ) {
            (Some(id), Some(kind), Some(storage_key), Some(url), Some(used), Some(created_at)) => {
                DeleteIfUnused::Deleted(FileRecord {
                    id,
                    kind,
                    storage_key,
                    url,
                    used,
                    created_at,
                })
            }
            _ if self.found => DeleteIfUnused::StillUsed,
            _ => DeleteIfUnused::NotFound,
        }
    }
}

/// Classify a row the conditional delete kept, from a fresh read of it
fn classify_survivor(current: Option<bool>) -> DeleteIfUnused {
    match current {
        Some(_) => DeleteIfUnused::StillUsed,
        None => DeleteIfUnused::NotFound,
    }
}

/// PostgreSQL implementation of [`FileRepository`]
pub struct PgFileRepository {
    pool: PgPool,
}

impl PgFileRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl FileRepository for PgFileRepository {
    async fn create(&self, data: &CreateFileRecord) -> Result<FileRecord> {
        let record = sqlx::query_as::<_, FileRecord>(
            r#"
            INSERT INTO files (id, kind, storage_key, url)
            VALUES ($1, $2, $3, $4)
            RETURNING id, kind, storage_key, url, used, created_at
            "#,
        )
        .bind(data.id)
        .bind(data.kind)
        .bind(&data.storage_key)
        .bind(&data.url)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to create file record {}: {:?}", data.id, e);
            AppError::Database(e)
        })?;

        tracing::debug!(
            "File record created: id={}, kind={}, key={}",
            record.id,
            record.kind,
            record.storage_key
        );
        Ok(record)
    }

    async fn get(&self, id: Uuid) -> Result<Option<FileRecord>> {
        sqlx::query_as::<_, FileRecord>(
            r#"
            SELECT id, kind, storage_key, url, used, created_at
            FROM files
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to get file record {}: {:?}", id, e);
            AppError::Database(e)
        })
    }

    async fn mark_used(&self, id: Uuid) -> Result<MarkUsed> {
        // Sets the flag unconditionally so a repeat still matches the row
        let result = sqlx::query(
            r#"
            UPDATE files
            SET used = TRUE
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to mark file {} as used: {:?}", id, e);
            AppError::Database(e)
        })?;

        if result.rows_affected() == 0 {
            Ok(MarkUsed::NotFound)
        } else {
            Ok(MarkUsed::Marked)
        }
    }

    async fn delete_if_unused(&self, id: Uuid) -> Result<DeleteIfUnused> {
        // The DELETE re-evaluates `used = FALSE` against the row version it
        // locks, so a concurrent mark_used that commits first always wins.
        // `target` reads the statement snapshot, which still shows a row that
        // a concurrent unconditional delete removed before our DELETE ran.
        let row = sqlx::query_as::<_, ConditionalDeleteRow>(
            r#"
            WITH target AS (
                SELECT id FROM files WHERE id = $1
            ),
            removed AS (
                DELETE FROM files
                WHERE id = $1 AND used = FALSE
                RETURNING id, kind, storage_key, url, used, created_at
            )
            SELECT
                EXISTS (SELECT 1 FROM target) AS found,
                removed.id,
                removed.kind,
                removed.storage_key,
                removed.url,
                removed.used,
                removed.created_at
            FROM (SELECT 1) AS single
            LEFT JOIN removed ON TRUE
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to conditionally delete file {}: {:?}", id, e);
            AppError::Database(e)
        })?;

        match row.into_outcome() {
            DeleteIfUnused::StillUsed => {
                let current = sqlx::query_scalar::<_, bool>(
                    r#"
                    SELECT used FROM files WHERE id = $1
                    "#,
                )
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| {
                    tracing::error!("Failed to re-read kept file {}: {:?}", id, e);
                    AppError::Database(e)
                })?;

                Ok(classify_survivor(current))
            }
            outcome => Ok(outcome),
        }
    }

    async fn delete_unconditionally(&self, id: Uuid) -> Result<DeleteUnconditionally> {
        let result = sqlx::query(
            r#"
            DELETE FROM files
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to delete file record {}: {:?}", id, e);
            AppError::Database(e)
        })?;

        if result.rows_affected() == 0 {
            Ok(DeleteUnconditionally::NotFound)
        } else {
            Ok(DeleteUnconditionally::Deleted)
        }
    }
}
