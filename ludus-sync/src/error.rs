//! Error types for the replication layer.

use thiserror::Error;

/// Result type for replication operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while replicating notices.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A replica received a notice out of sequence and must resync.
    #[error("notice out of sequence: expected {expected}, got {got}")]
    Sequence { expected: u64, got: u64 },

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
