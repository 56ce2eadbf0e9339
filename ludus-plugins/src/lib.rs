//! Stock plugins for ludus sessions.
//!
//! - [`ObjectStore`]: shared and per-player [`Item`] storage, replicated
//!   through STORE_SET / STORE_DEL notices (methods under `stor_`)
//! - [`Turns`]: turn, round and current-player counters (methods under
//!   `turn_`), in standard or switchback order
//! - [`Pile`]: an ordered, filterable stack of items, storable as an
//!   [`Item`]
//!
//! The plugins come with extension traits for typed access from an
//! [`Engine`] or from another plugin's [`Session`].
//!
//! [`Engine`]: ludus_engine::Engine
//! [`Session`]: ludus_engine::Session

mod error;
mod ext;
mod pile;
mod store;
mod turns;

pub use error::{PluginError, PluginResult};
pub use ext::{EngineStore, EngineTurns, SessionStore, SessionTurns};
pub use pile::{stashed_positions, Pile};
pub use store::{Item, ObjectStore, STORE_NAME};
pub use turns::{Round, TurnOrder, Turns, TURNS_NAME};
