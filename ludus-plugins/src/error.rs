//! Error types for the stock plugins.

use serde::de::DeserializeOwned;
use thiserror::Error;

/// Result type for stock plugin operations.
pub type PluginResult<T> = Result<T, PluginError>;

#[derive(Debug, Error)]
pub enum PluginError {
    /// Turn order needs at least one seated player.
    #[error("no players seated")]
    NoPlayers,

    #[error("invalid argument '{name}': {reason}")]
    InvalidArgument { name: String, reason: String },

    #[error("position {position} out of range for a pile of {len}")]
    OutOfRange { position: usize, len: usize },

    #[error("order is not a permutation of {len} positions")]
    NotAPermutation { len: usize },

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Reads a required method argument.
pub(crate) fn arg<T: DeserializeOwned>(args: &ludus_types::Args, name: &str) -> PluginResult<T> {
    let value = args.get(name).ok_or_else(|| PluginError::InvalidArgument {
        name: name.to_string(),
        reason: "missing".to_string(),
    })?;
    serde_json::from_value(value.clone()).map_err(|e| PluginError::InvalidArgument {
        name: name.to_string(),
        reason: e.to_string(),
    })
}

/// Reads an optional method argument. `null` counts as absent.
pub(crate) fn opt_arg<T: DeserializeOwned>(args: &ludus_types::Args, name: &str) -> PluginResult<Option<T>> {
    match args.get(name) {
        None | Some(serde_json::Value::Null) => Ok(None),
        Some(_) => arg(args, name).map(Some),
    }
}
