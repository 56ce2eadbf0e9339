//! Core type definitions for ludus.
//!
//! This crate defines the fundamental, game-agnostic types used throughout
//! the session engine:
//! - [`Entity`] and the [`Filterable`] view every filterable record exposes
//! - Player identifiers and snapshot [`Viewer`]s
//! - [`Notice`]s, their [`NoticeType`] tokens and the [`NoticeTypes`] registry
//! - [`Args`] / [`Stash`], the JSON maps actions are called with
//!
//! Game-specific types (boards, decks, turn counters) belong in plugins.

mod entity;
mod ids;
mod notice;

pub use entity::{Entity, Filterable};
pub use ids::{new_id, PlayerId, Viewer};
pub use notice::{CORE_OWNER, Notice, NoticeType, NoticeTypes};

/// Keyword arguments an action is called with.
pub type Args = serde_json::Map<String, serde_json::Value>;

/// Call-scoped private data written by init handlers and journaled with the call.
pub type Stash = serde_json::Map<String, serde_json::Value>;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("notice identifier must be an upper-case identifier, got '{0}'")]
    InvalidIdentifier(String),

    #[error("notice type '{ident}' already registered by '{owner}' with token '{token}'")]
    IdentifierTaken {
        owner: String,
        ident: String,
        token: String,
    },

    #[error("notice token '{token}' already used by '{owner}.{ident}'")]
    TokenTaken {
        token: String,
        owner: String,
        ident: String,
    },
}
