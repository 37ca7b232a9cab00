//! Error types for the row-state engine.

use crate::RecordKey;
use thiserror::Error;

/// All possible errors from the row-state engine.
///
/// Missing keys are not in this list: lookups that miss
/// degrade to no-ops (`None` / `false`) instead of failing.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("merge failed: {0}")]
    MergeFailed(String),

    #[error("record already exists: {0}")]
    RecordAlreadyExists(RecordKey),

    #[error("invalid payload: {0}")]
    InvalidPayload(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;
