//! Error types for the engine.

use crate::action::Phase;
use ludus_sync::SyncError;
use thiserror::Error;

/// Boxed error carried as the source of handler failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that can occur in engine operations.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Plugin registration or snapshot layout problem. Fatal to startup.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// No plugin contributes handlers to the action.
    #[error("unknown action '{0}'")]
    UnknownAction(String),

    /// No plugin contributes the engine method.
    #[error("unknown method '{0}'")]
    UnknownMethod(String),

    #[error("plugin not registered: {0}")]
    PluginNotFound(String),

    /// The plugin is currently executing a handler further up the stack.
    #[error("plugin '{0}' is busy executing a handler")]
    PluginBusy(String),

    /// Replication failure; a sequence error means the replica must resync.
    #[error(transparent)]
    Sequence(#[from] SyncError),

    /// A before/action/after (or init) handler faulted.
    #[error("action '{action}' failed in {phase} phase: {source}")]
    Phase {
        action: String,
        phase: Phase,
        source: BoxError,
    },

    /// A plugin method, listener, initializer or state hook faulted.
    #[error("plugin '{plugin}' failed in {during}: {source}")]
    Plugin {
        plugin: String,
        during: String,
        source: BoxError,
    },

    /// The engine core is already mutably borrowed on this thread.
    #[error("engine re-entered while its core is borrowed")]
    Reentrant,

    /// Another caller is already draining the work queue.
    #[error("work queue already has a consumer")]
    ConsumerBusy,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

impl EngineError {
    /// True for a replica sequence gap.
    pub fn is_sequence(&self) -> bool {
        matches!(self, Self::Sequence(SyncError::Sequence { .. }))
    }

    /// Wraps a plugin fault, unwrapping engine errors raised further down.
    pub(crate) fn from_plugin(plugin: &str, during: &str, err: anyhow::Error) -> Self {
        match err.downcast::<EngineError>() {
            Ok(engine) => engine,
            Err(other) => Self::Plugin {
                plugin: plugin.to_string(),
                during: during.to_string(),
                source: other.into(),
            },
        }
    }
}
