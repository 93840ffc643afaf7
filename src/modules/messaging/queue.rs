use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::time::Duration;
use uuid::Uuid;

use super::{FileEvent, FileEventKind};
use crate::core::error::Result;

/// Upper bound on the redelivery backoff
const MAX_RETRY_DELAY: Duration = Duration::from_secs(60 * 60);

/// Publish an event for at-least-once delivery as soon as possible.
///
/// This is the whole contract a reference producer needs.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: FileEvent) -> Result<()>;
}

/// Schedule an event for delivery no earlier than `deliver_at`
#[async_trait]
pub trait DelayedScheduler: Send + Sync {
    async fn schedule(&self, event: FileEvent, deliver_at: DateTime<Utc>) -> Result<()>;
}

/// A leased message handed to a consumer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub id: Uuid,
    pub event: FileEvent,
    /// Delivery count including this one
    pub attempts: i32,
}

/// What happened to a message handed back with [`MessageSource::release`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReleaseOutcome {
    /// Visible again after the given delay
    Retrying { after: Duration },
    /// Attempts exhausted; parked for an operator
    DeadLettered,
}

/// Consumer side of the queue.
///
/// A received message stays invisible to other consumers for the visibility
/// timeout. If it is neither acknowledged nor released in time it is delivered
/// again, which is the recovery path for a consumer that crashed mid-message.
#[async_trait]
pub trait MessageSource: Send + Sync {
    async fn receive(
        &self,
        kind: FileEventKind,
        batch_size: i64,
        visibility_timeout: Duration,
    ) -> Result<Vec<Delivery>>;

    /// Remove a processed message
    async fn ack(&self, delivery: &Delivery) -> Result<()>;

    /// Hand a failed message back for redelivery
    async fn release(&self, delivery: &Delivery, error: &str) -> Result<ReleaseOutcome>;
}

/// Exponential redelivery backoff: `base * 2^(attempts - 1)`, capped at one hour
pub fn retry_delay(base: Duration, attempts: i32) -> Duration {
    let exponent = attempts.saturating_sub(1).clamp(0, 16) as u32;
    base.saturating_mul(1u32 << exponent).min(MAX_RETRY_DELAY)
}
