//! Observers: the receiving end of sequenced notice delivery.

use crate::envelope::Envelope;
use ludus_types::{Notice, PlayerId};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::mpsc::{Sender, UnboundedSender};
use tracing::warn;
use uuid::Uuid;

/// Receives notices addressed to one player.
///
/// `seq` is the per-registration sequence number; it starts at 1 and grows
/// by exactly 1 for every notice delivered to this registration.
pub trait Observer: Send + Sync {
    fn on_notice(&self, seq: u64, player: PlayerId, notice: &Notice);
}

impl<F> Observer for F
where
    F: Fn(u64, PlayerId, &Notice) + Send + Sync,
{
    fn on_notice(&self, seq: u64, player: PlayerId, notice: &Notice) {
        self(seq, player, notice)
    }
}

/// Forwards envelopes to a transport task.
impl Observer for UnboundedSender<Envelope> {
    fn on_notice(&self, seq: u64, player: PlayerId, notice: &Notice) {
        if self.send(Envelope::new(seq, player, notice.clone())).is_err() {
            warn!(%player, seq, "envelope receiver dropped");
        }
    }
}

/// Forwards envelopes to a bounded transport queue without blocking.
impl Observer for Sender<Envelope> {
    fn on_notice(&self, seq: u64, player: PlayerId, notice: &Notice) {
        if let Err(e) = self.try_send(Envelope::new(seq, player, notice.clone())) {
            warn!(%player, seq, error = %e, "envelope dropped");
        }
    }
}

/// Handle identifying one observer registration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObserverId(Uuid);

impl ObserverId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for ObserverId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ObserverId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Observer that keeps every envelope it receives.
#[derive(Debug, Default)]
pub struct Recorder {
    log: Mutex<Vec<Envelope>>,
}

impl Recorder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Removes and returns everything recorded so far.
    pub fn take(&self) -> Vec<Envelope> {
        std::mem::take(&mut *self.log.lock())
    }

    /// Copies of the recorded envelopes.
    pub fn envelopes(&self) -> Vec<Envelope> {
        self.log.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.log.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.log.lock().is_empty()
    }
}

impl Observer for Recorder {
    fn on_notice(&self, seq: u64, player: PlayerId, notice: &Notice) {
        self.log.lock().push(Envelope::new(seq, player, notice.clone()));
    }
}
