//! Adapter-layer error taxonomy

use crate::graph::PlaitError;
use thiserror::Error;

/// Errors surfaced by adapters and the ingest pipeline.
///
/// `ContextNotFound` and `NoMatchingAdapter` are caller errors and nothing
/// is committed. `ValidationFailed` and `InternalCommitFailure` are local
/// to one producer; siblings in the same ingest call still commit.
#[derive(Debug, Error)]
pub enum AdapterError {
    #[error("context not found: {0}")]
    ContextNotFound(String),

    #[error("no adapter registered for input kind '{0}'")]
    NoMatchingAdapter(String),

    #[error("validation failed for '{producer_id}': {reason}")]
    ValidationFailed { producer_id: String, reason: String },

    #[error("invalid input: expected different data type")]
    InvalidInput,

    #[error("commit failed for '{producer_id}': {reason}")]
    InternalCommitFailure { producer_id: String, reason: String },

    #[error("adapter error: {0}")]
    Internal(String),
}

impl AdapterError {
    /// Map an engine error raised while committing `producer_id`'s emission
    pub fn from_commit(producer_id: &str, err: PlaitError) -> Self {
        match err {
            PlaitError::ContextNotFound(id) => Self::ContextNotFound(id),
            PlaitError::InvalidEmission { producer_id, reason } => {
                Self::ValidationFailed { producer_id, reason }
            }
            other => Self::InternalCommitFailure {
                producer_id: producer_id.to_string(),
                reason: other.to_string(),
            },
        }
    }

    /// True for failures that are isolated to one producer
    pub fn is_producer_local(&self) -> bool {
        matches!(
            self,
            Self::ValidationFailed { .. } | Self::InvalidInput | Self::InternalCommitFailure { .. }
        )
    }
}

impl From<PlaitError> for AdapterError {
    fn from(err: PlaitError) -> Self {
        match err {
            PlaitError::ContextNotFound(id) => Self::ContextNotFound(id),
            other => Self::Internal(other.to_string()),
        }
    }
}
