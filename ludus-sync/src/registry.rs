//! Observer registrations and sequence minting.

use crate::observer::{Observer, ObserverId};
use ludus_types::{Notice, PlayerId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Who a notice is addressed to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recipients {
    /// Every currently observed player.
    #[default]
    All,
    Players(Vec<PlayerId>),
}

impl Recipients {
    #[must_use]
    pub fn player(player: PlayerId) -> Self {
        Self::Players(vec![player])
    }
}

impl From<PlayerId> for Recipients {
    fn from(player: PlayerId) -> Self {
        Self::player(player)
    }
}

impl From<Vec<PlayerId>> for Recipients {
    fn from(players: Vec<PlayerId>) -> Self {
        Self::Players(players)
    }
}

struct Registration {
    id: ObserverId,
    seq: u64,
    observer: Arc<dyn Observer>,
}

/// A minted (sequence, player, observer) triple ready to be delivered.
///
/// Minting and delivery are split so the caller can release its own locks
/// before running observer code.
pub struct Delivery {
    pub seq: u64,
    pub player: PlayerId,
    pub observer_id: ObserverId,
    observer: Arc<dyn Observer>,
}

impl Delivery {
    pub fn deliver(&self, notice: &Notice) {
        self.observer.on_notice(self.seq, self.player, notice);
    }
}

impl fmt::Debug for Delivery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Delivery")
            .field("seq", &self.seq)
            .field("player", &self.player)
            .field("observer_id", &self.observer_id)
            .finish_non_exhaustive()
    }
}

/// Per-player observer lists with independent sequence counters.
#[derive(Default)]
pub struct ObserverRegistry {
    players: BTreeMap<PlayerId, Vec<Registration>>,
}

impl ObserverRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `observer` for `player` with its counter at 0.
    pub fn observe(&mut self, player: PlayerId, observer: Arc<dyn Observer>) -> ObserverId {
        let id = ObserverId::new();
        self.players.entry(player).or_default().push(Registration {
            id,
            seq: 0,
            observer,
        });
        debug!(%player, observer = %id, "observer registered");
        id
    }

    /// Removes exactly the registration `id`. Returns false if unknown.
    pub fn unobserve(&mut self, player: PlayerId, id: ObserverId) -> bool {
        let Some(list) = self.players.get_mut(&player) else {
            return false;
        };
        let before = list.len();
        list.retain(|r| r.id != id);
        let removed = list.len() != before;
        if list.is_empty() {
            self.players.remove(&player);
        }
        if removed {
            debug!(%player, observer = %id, "observer removed");
        }
        removed
    }

    /// Current counter of a registration.
    pub fn sequence(&self, player: PlayerId, id: ObserverId) -> Option<u64> {
        self.players
            .get(&player)?
            .iter()
            .find(|r| r.id == id)
            .map(|r| r.seq)
    }

    /// Players with at least one observer, ascending.
    pub fn players(&self) -> Vec<PlayerId> {
        self.players.keys().copied().collect()
    }

    pub fn is_observed(&self, player: PlayerId) -> bool {
        self.players.contains_key(&player)
    }

    /// Total number of registrations.
    pub fn len(&self) -> usize {
        self.players.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Mints one delivery per (player, observer) among `recipients`.
    ///
    /// Every addressed registration's counter is incremented by exactly one.
    /// Players are visited in the order given (ascending for `All`) and
    /// observers of one player in registration order. Unobserved players
    /// are skipped; a player listed twice is addressed once.
    pub fn address(&mut self, recipients: &Recipients) -> Vec<Delivery> {
        let players = match recipients {
            Recipients::All => self.players(),
            Recipients::Players(list) => {
                let mut seen = Vec::with_capacity(list.len());
                for p in list {
                    if !seen.contains(p) {
                        seen.push(*p);
                    }
                }
                seen
            }
        };

        let mut out = Vec::new();
        for player in players {
            let Some(list) = self.players.get_mut(&player) else {
                continue;
            };
            for reg in list.iter_mut() {
                reg.seq += 1;
                out.push(Delivery {
                    seq: reg.seq,
                    player,
                    observer_id: reg.id,
                    observer: Arc::clone(&reg.observer),
                });
            }
        }
        out
    }

    /// Mints and immediately delivers.
    pub fn notify(&mut self, recipients: &Recipients, notice: &Notice) -> usize {
        let deliveries = self.address(recipients);
        for d in &deliveries {
            d.deliver(notice);
        }
        deliveries.len()
    }
}

impl fmt::Debug for ObserverRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let counters: BTreeMap<_, Vec<_>> = self
            .players
            .iter()
            .map(|(p, list)| (*p, list.iter().map(|r| (r.id, r.seq)).collect()))
            .collect();
        f.debug_struct("ObserverRegistry")
            .field("players", &counters)
            .finish()
    }
}
