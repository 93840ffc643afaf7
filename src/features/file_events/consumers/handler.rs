use async_trait::async_trait;

use crate::core::error::Result;
use crate::modules::messaging::{Delivery, FileEventKind};

/// What a consumer did with one message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumerOutcome {
    /// Usage consumer flipped (or re-confirmed) the `used` flag
    MarkedUsed,
    /// Record and blob were removed
    Reclaimed,
    /// Nothing to do: the record no longer exists
    AlreadyGone,
    /// Garbage collector left a referenced file alone
    Protected,
    /// Redelivered check found the record gone and re-issued its blob delete
    BlobSwept,
}

impl ConsumerOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsumerOutcome::MarkedUsed => "marked_used",
            ConsumerOutcome::Reclaimed => "reclaimed",
            ConsumerOutcome::AlreadyGone => "already_gone",
            ConsumerOutcome::Protected => "protected",
            ConsumerOutcome::BlobSwept => "blob_swept",
        }
    }
}

impl std::fmt::Display for ConsumerOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One lifecycle consumer
///
/// Handlers must be safe to repeat: the queue delivers at least once, and a
/// message whose handler returns a transient error is delivered again.
#[async_trait]
pub trait FileEventHandler: Send + Sync {
    /// Event kind this handler consumes
    fn kind(&self) -> FileEventKind;

    fn name(&self) -> &'static str;

    async fn handle(&self, delivery: &Delivery) -> Result<ConsumerOutcome>;
}
