use crate::error::{SyncError, SyncResult};
use serde::{Deserialize, Serialize};

/// The replica side of a sequenced stream.
///
/// Tracks the last sequence number accepted. Every incoming notice advances
/// the cursor by one; the notice must carry exactly the new value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplicaCursor {
    position: u64,
}

impl ReplicaCursor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accepts `seq` if it is the next expected value.
    ///
    /// The cursor moves forward even on a mismatch; the replica is expected
    /// to [`reset`](Self::reset) after resyncing.
    pub fn advance(&mut self, seq: u64) -> SyncResult<()> {
        self.position += 1;
        if seq == self.position {
            Ok(())
        } else {
            Err(SyncError::Sequence {
                expected: self.position,
                got: seq,
            })
        }
    }

    /// Repositions after a snapshot taken at sequence `seq`.
    pub fn reset(&mut self, seq: u64) {
        self.position = seq;
    }

    /// Last sequence accepted.
    pub fn position(&self) -> u64 {
        self.position
    }
}
