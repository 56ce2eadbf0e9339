//! Identifier types used throughout ludus.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Generates a fresh globally-unique entity id.
///
/// Uses UUID v7 so ids generated by one engine sort by creation time.
#[must_use]
pub fn new_id() -> String {
    Uuid::now_v7().to_string()
}

/// Seat number of a participant in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(u32);

impl PlayerId {
    #[must_use]
    pub const fn new(seat: u32) -> Self {
        Self(seat)
    }

    /// Returns the seat number.
    #[must_use]
    pub const fn seat(&self) -> u32 {
        self.0
    }
}

impl From<u32> for PlayerId {
    fn from(seat: u32) -> Self {
        Self(seat)
    }
}

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for PlayerId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(s.parse()?))
    }
}

/// Who a state snapshot is being produced for.
///
/// Visibility is three-tier: the admin sees every private partition, a
/// player sees their own partition plus shared data, and an anonymous
/// observer sees shared data only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Viewer {
    Admin,
    Player(PlayerId),
    Anonymous,
}

impl Viewer {
    /// True when `player`'s private partition is visible to this viewer.
    #[must_use]
    pub fn can_see(&self, player: PlayerId) -> bool {
        match self {
            Self::Admin => true,
            Self::Player(p) => *p == player,
            Self::Anonymous => false,
        }
    }
}

impl From<PlayerId> for Viewer {
    fn from(player: PlayerId) -> Self {
        Self::Player(player)
    }
}
