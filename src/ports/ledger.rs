use crate::domain::content_id::ContentId;
use crate::error::BoxError;
use async_trait::async_trait;

/// Record of content identifiers whose runs reached `Committed`.
///
/// The single source of truth for idempotent reruns. Implementations are not
/// expected to lock; two runs sharing one ledger are not supported.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProcessedLedger: Send + Sync {
    /// Whether the id was committed by any earlier run
    async fn contains(&self, id: &ContentId) -> Result<bool, BoxError>;

    /// Append the id. Only called once a run fully succeeded.
    async fn commit(&self, id: &ContentId) -> Result<(), BoxError>;
}
