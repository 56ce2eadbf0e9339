//! Capability grants for ludus sessions.
//!
//! A [`Grant`] authorizes one player to run one action, with some
//! arguments forced and others defaulted. The [`GrantManager`] plugin keeps
//! grants per player, triggers them through the engine's schedule path and
//! expires them afterwards:
//!
//! ```ignore
//! engine.register_plugin(GrantManager::new())?;
//! let place = Grant::new("place").with_kwarg("player", json!(0));
//! engine.grant(&[PlayerId::new(0)], vec![place.clone()])?;
//! engine.trigger(PlayerId::new(0), place.id(), args)?;
//! ```
//!
//! Grant changes replicate as GRANT and EXPIRE notices.

mod error;
mod ext;
mod grant;
mod manager;

pub use error::{GrantError, GrantResult};
pub use ext::{EngineGrants, SessionGrants};
pub use grant::{Call, Expiry, Grant};
pub use manager::{GrantManager, PLUGIN_NAME};
