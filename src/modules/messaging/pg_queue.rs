//! PostgreSQL-backed lifecycle queue
//!
//! Delayed delivery and redelivery are both expressed through one column,
//! `deliver_at`: a message is due once `deliver_at <= NOW()`. Receiving a
//! message pushes `deliver_at` forward by the visibility timeout (the lease), so
//! an unacknowledged message naturally becomes due again.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool, Type};
use std::time::Duration;
use uuid::Uuid;

use super::queue::retry_delay;
use super::{
    DelayedScheduler, Delivery, EventPublisher, FileEvent, FileEventKind, MessageSource,
    ReleaseOutcome,
};
use crate::core::error::{AppError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Type)]
#[sqlx(type_name = "file_message_status", rename_all = "snake_case")]
enum FileMessageStatus {
    Pending,
    Dead,
}

#[derive(Debug, FromRow)]
struct LeasedMessage {
    id: Uuid,
    kind: FileEventKind,
    file_id: Uuid,
    attempts: i32,
}

#[derive(Debug, FromRow)]
struct ReleasedMessage {
    status: FileMessageStatus,
}

pub struct PgMessageQueue {
    pool: PgPool,
    max_attempts: i32,
    retry_backoff: Duration,
}

impl PgMessageQueue {
    pub fn new(pool: PgPool, max_attempts: i32, retry_backoff: Duration) -> Self {
        Self {
            pool,
            max_attempts,
            retry_backoff,
        }
    }

    async fn insert(&self, event: FileEvent, deliver_at: Option<DateTime<Utc>>) -> Result<Uuid> {
        let id = Uuid::now_v7();

        sqlx::query(
            r#"
            INSERT INTO file_messages (id, kind, file_id, deliver_at)
            VALUES ($1, $2, $3, COALESCE($4, NOW()))
            "#,
        )
        .bind(id)
        .bind(event.kind())
        .bind(event.file_id())
        .bind(deliver_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to enqueue {} for file {}: {:?}", event.kind(), event.file_id(), e);
            AppError::Database(e)
        })?;

        Ok(id)
    }
}

#[async_trait]
impl EventPublisher for PgMessageQueue {
    async fn publish(&self, event: FileEvent) -> Result<()> {
        let id = self.insert(event, None).await?;
        tracing::debug!(
            "Published {} for file {} (message {})",
            event.kind(),
            event.file_id(),
            id
        );
        Ok(())
    }
}

#[async_trait]
impl DelayedScheduler for PgMessageQueue {
    async fn schedule(&self, event: FileEvent, deliver_at: DateTime<Utc>) -> Result<()> {
        let id = self.insert(event, Some(deliver_at)).await?;
        tracing::debug!(
            "Scheduled {} for file {} at {} (message {})",
            event.kind(),
            event.file_id(),
            deliver_at,
            id
        );
        Ok(())
    }
}

#[async_trait]
impl MessageSource for PgMessageQueue {
    async fn receive(
        &self,
        kind: FileEventKind,
        batch_size: i64,
        visibility_timeout: Duration,
    ) -> Result<Vec<Delivery>> {
        // SKIP LOCKED lets competing consumers lease disjoint batches
        let leased = sqlx::query_as::<_, LeasedMessage>(
            r#"
            UPDATE file_messages
            SET deliver_at = NOW() + make_interval(secs => $3),
                attempts = attempts + 1
            WHERE id IN (
                SELECT id
                FROM file_messages
                WHERE kind = $1
                AND status = 'pending'
                AND deliver_at <= NOW()
                ORDER BY deliver_at ASC
                LIMIT $2
                FOR UPDATE SKIP LOCKED
            )
            RETURNING id, kind, file_id, attempts
            "#,
        )
        .bind(kind)
        .bind(batch_size)
        .bind(visibility_timeout.as_secs_f64())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to lease {} messages: {:?}", kind, e);
            AppError::Database(e)
        })?;

        Ok(leased
            .into_iter()
            .map(|m| Delivery {
                id: m.id,
                event: FileEvent::new(m.kind, m.file_id),
                attempts: m.attempts,
            })
            .collect())
    }

    async fn ack(&self, delivery: &Delivery) -> Result<()> {
        sqlx::query(
            r#"
            DELETE FROM file_messages
            WHERE id = $1
            "#,
        )
        .bind(delivery.id)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to acknowledge message {}: {:?}", delivery.id, e);
            AppError::Database(e)
        })?;

        Ok(())
    }

    async fn release(&self, delivery: &Delivery, error: &str) -> Result<ReleaseOutcome> {
        let delay = retry_delay(self.retry_backoff, delivery.attempts);

        let released = sqlx::query_as::<_, ReleasedMessage>(
            r#"
            UPDATE file_messages
            SET status = CASE
                    WHEN attempts >= $2 THEN 'dead'::file_message_status
                    ELSE 'pending'::file_message_status
                END,
                deliver_at = NOW() + make_interval(secs => $3),
                last_error = $4
            WHERE id = $1
            RETURNING status
            "#,
        )
        .bind(delivery.id)
        .bind(self.max_attempts)
        .bind(delay.as_secs_f64())
        .bind(error)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to release message {}: {:?}", delivery.id, e);
            AppError::Database(e)
        })?;

        match released.map(|r| r.status) {
            Some(FileMessageStatus::Dead) => Ok(ReleaseOutcome::DeadLettered),
            // A vanished row was acknowledged by a competing lease holder
            Some(FileMessageStatus::Pending) | None => Ok(ReleaseOutcome::Retrying { after: delay }),
        }
    }
}
