//! Run-level error taxonomy.
//!
//! Per-cue problems have their own types (`CueError` in captions,
//! `SegmentError` in segments) and never escalate into a `PipelineError`.

use crate::domain::content_id::ContentId;
use thiserror::Error;

/// Boxed error returned by port implementations.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("no content identifier found in locator: {0}")]
    MissingIdentifier(String),

    #[error("source unavailable for {content_id}: {reason}")]
    SourceUnavailable {
        content_id: ContentId,
        reason: String,
    },

    #[error("ledger unavailable: {0}")]
    Ledger(#[source] BoxError),

    #[error("cannot prepare output directory {path}: {source}")]
    OutputDirectory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("no clips retained for {0}")]
    EmptyRun(ContentId),

    #[error("finalization failed for {content_id}: {reason}")]
    Finalization {
        content_id: ContentId,
        reason: String,
    },
}

impl PipelineError {
    pub fn source_unavailable(content_id: &ContentId, reason: impl ToString) -> Self {
        PipelineError::SourceUnavailable {
            content_id: content_id.clone(),
            reason: reason.to_string(),
        }
    }

    pub fn finalization(content_id: &ContentId, reason: impl ToString) -> Self {
        PipelineError::Finalization {
            content_id: content_id.clone(),
            reason: reason.to_string(),
        }
    }
}
