//! Error types for grant operations.

use thiserror::Error;

/// Result type for grant operations.
pub type GrantResult<T> = Result<T, GrantError>;

#[derive(Debug, Error)]
pub enum GrantError {
    /// A method argument was missing or had the wrong shape.
    #[error("invalid argument '{name}': {reason}")]
    InvalidArgument { name: String, reason: String },
}

impl GrantError {
    pub(crate) fn missing(name: &str) -> Self {
        Self::InvalidArgument {
            name: name.to_string(),
            reason: "missing".to_string(),
        }
    }
}
