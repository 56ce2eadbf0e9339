//! Units of work drained by the engine's single consumer.

use ludus_sync::Recipients;
use ludus_types::{Args, Notice, PlayerId, Stash};

/// One queued item. Everything that mutates state or mints sequence numbers
/// travels through the queue in FIFO order.
#[derive(Debug, Clone)]
pub(crate) enum Work {
    /// Execute an action. A stash skips the init phase.
    Call {
        action: String,
        args: Args,
        stash: Option<Stash>,
    },
    /// Mint sequence numbers and deliver to observers.
    Notify { to: Recipients, notice: Notice },
    /// Apply a notice received from the authoritative engine.
    Dispatch {
        seq: u64,
        player: PlayerId,
        notice: Notice,
    },
    /// Stop the consumer once everything before it has run.
    Exit,
}

impl Work {
    pub(crate) fn label(&self) -> &'static str {
        match self {
            Self::Call { .. } => "call",
            Self::Notify { .. } => "notify",
            Self::Dispatch { .. } => "dispatch",
            Self::Exit => "exit",
        }
    }
}
