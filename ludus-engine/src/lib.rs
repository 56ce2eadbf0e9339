//! Session engine for ludus.
//!
//! An [`Engine`] composes [`Plugin`]s into one action namespace and runs
//! every action through a phased pipeline:
//!
//! 1. **check**: read-only gates; any rejection ends the call with `false`
//! 2. **init**: read-only preparation into a journaled stash
//! 3. **commit**: the call is appended to the [`Journal`]
//! 4. **before / action / after**: the only phases that mutate state
//! 5. **notify**: per-player CALL notices, censored by plugin hooks
//! 6. **keep** or **error**: best-effort follow-up
//!
//! A server engine delivers notices to observers with per-registration
//! sequence numbers. A client engine observes a server through
//! [`Engine::replica_observer`], replays what it receives and resyncs from
//! a [`Snapshot`] when it detects a gap.
//!
//! ## Example
//!
//! ```ignore
//! let engine = Engine::new(Mode::Server);
//! engine.register_plugin(Board::default())?;
//! engine.initialize(None)?;
//! engine.schedule("place", args)?;
//! engine.process_queue()?;
//! ```

mod action;
mod config;
mod engine;
mod error;
mod journal;
mod listener;
mod pipeline;
mod plugin;
mod queue;
mod registry;
mod session;
mod snapshot;
mod state;

pub use action::{ActionSet, Disclosure, Phase};
pub use config::{EngineConfig, RollbackPolicy};
pub use engine::{Engine, Mode};
pub use error::{BoxError, EngineError, EngineResult};
pub use journal::{Journal, JournalEntry};
pub use listener::Listeners;
pub use plugin::Plugin;
pub use registry::{PluginRegistry, RESERVED_METHODS};
pub use session::{Session, View};
pub use snapshot::{InitData, PluginState, Snapshot};

pub use ludus_types::{Args, Notice, NoticeType, PlayerId, Viewer};
