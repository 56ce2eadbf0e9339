use crate::error::SyncResult;
use ludus_types::{Notice, PlayerId};
use serde::{Deserialize, Serialize};

/// A sequenced notice as carried between processes.
///
/// Wire shape: `{ "seq": 3, "player": 0, "notice": { .. } }`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub seq: u64,
    pub player: PlayerId,
    pub notice: Notice,
}

impl Envelope {
    #[must_use]
    pub fn new(seq: u64, player: PlayerId, notice: Notice) -> Self {
        Self { seq, player, notice }
    }

    pub fn to_json(&self) -> SyncResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> SyncResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
