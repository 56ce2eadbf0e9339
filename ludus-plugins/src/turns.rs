//! Turn order: a turn counter, a round and the current player.
//!
//! Turn state changes only inside action handlers, so replicas replaying
//! the same calls reach the same turn without notices of their own.

use crate::error::{opt_arg, PluginError, PluginResult};
use ludus_engine::{Plugin, Session};
use ludus_types::{Args, PlayerId, Viewer};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;
use tracing::debug;

pub const TURNS_NAME: &str = "turns";

/// A round: numbered from 0, or one of the setup rounds played before
/// round 0. Setup rounds travel as `"setup-N"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "RoundRepr", try_from = "RoundRepr")]
pub enum Round {
    Number(i64),
    Setup(u8),
}

impl Default for Round {
    fn default() -> Self {
        Self::Number(-1)
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Setup(n) => write!(f, "setup-{n}"),
        }
    }
}

#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RoundRepr {
    Number(i64),
    Named(String),
}

impl From<Round> for RoundRepr {
    fn from(round: Round) -> Self {
        match round {
            Round::Number(n) => Self::Number(n),
            setup => Self::Named(setup.to_string()),
        }
    }
}

impl TryFrom<RoundRepr> for Round {
    type Error = String;

    fn try_from(repr: RoundRepr) -> Result<Self, Self::Error> {
        match repr {
            RoundRepr::Number(n) => Ok(Self::Number(n)),
            RoundRepr::Named(name) => name
                .strip_prefix("setup-")
                .and_then(|n| n.parse().ok())
                .map(Self::Setup)
                .ok_or_else(|| format!("unknown round '{name}'")),
        }
    }
}

/// How plain advances move through the seating.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnOrder {
    /// 0, 1, ... N every round.
    #[default]
    Standard,
    /// Two setup rounds first, the second one reversed:
    ///
    /// ```text
    /// setup-1: 0, 1, ... N
    /// setup-2: N, ... 1, 0
    /// 0:       0, 1, ... N
    /// ```
    Switchback,
}

/// Counters start at -1: nothing has started yet.
///
/// The order is configuration and is not part of the state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turns {
    #[serde(skip)]
    order: TurnOrder,
    current_turn: i64,
    current_round: Round,
    current_player: i64,
}

impl Default for Turns {
    fn default() -> Self {
        Self {
            order: TurnOrder::Standard,
            current_turn: -1,
            current_round: Round::default(),
            current_player: -1,
        }
    }
}

impl Turns {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn switchback() -> Self {
        Self::with_order(TurnOrder::Switchback)
    }

    #[must_use]
    pub fn with_order(order: TurnOrder) -> Self {
        Self {
            order,
            ..Self::default()
        }
    }

    pub fn order(&self) -> TurnOrder {
        self.order
    }

    /// Starts the next player's turn among `seats` players.
    pub fn advance(&mut self, seats: usize) -> PluginResult<()> {
        self.start(seats, None, None, 1)
    }

    /// Starts a turn.
    ///
    /// `player` defaults to the current player plus `step`, taken modulo the
    /// number of seats. `round` defaults to the current round. A numbered
    /// round is incremented when the step wraps past either end of the
    /// seating or no turn has started yet.
    ///
    /// In switchback order a plain advance (no player, no round, step 1)
    /// runs the setup rounds first.
    pub fn start(&mut self, seats: usize, player: Option<i64>, round: Option<Round>, step: i64) -> PluginResult<()> {
        if seats == 0 {
            return Err(PluginError::NoPlayers);
        }
        let seats = seats as i64;
        let (round, step) = match (self.order, player, round, step) {
            (TurnOrder::Switchback, None, None, 1) => self.switchback_step(seats),
            _ => (round, step),
        };

        let next = self.current_player + step;
        let player = player.unwrap_or(next);
        let round = round.unwrap_or(match self.current_round {
            Round::Number(n) if self.current_player < 0 || next < 0 || next >= seats => Round::Number(n + 1),
            current => current,
        });

        self.current_turn += 1;
        self.current_round = round;
        self.current_player = player.rem_euclid(seats);
        debug!(
            turn = self.current_turn,
            round = %self.current_round,
            player = self.current_player,
            "turn started"
        );
        Ok(())
    }

    /// Round and step for the next plain advance in switchback order.
    fn switchback_step(&self, seats: i64) -> (Option<Round>, i64) {
        match self.current_round {
            Round::Number(-1) => (Some(Round::Setup(1)), 1),
            Round::Setup(1) if self.current_player == seats - 1 => (Some(Round::Setup(2)), 0),
            Round::Setup(2) if self.current_player == 0 => (Some(Round::Number(0)), 0),
            Round::Setup(2) => (None, -1),
            _ => (None, 1),
        }
    }

    /// Seat of the player whose turn it is, once a turn has started.
    pub fn player(&self) -> Option<PlayerId> {
        u32::try_from(self.current_player).ok().map(PlayerId::new)
    }

    /// Name of the current player among the seated `players`.
    pub fn player_name<'a>(&self, players: &'a [String]) -> Option<&'a str> {
        let seat = usize::try_from(self.current_player).ok()?;
        players.get(seat).map(String::as_str)
    }

    pub fn number(&self) -> i64 {
        self.current_turn
    }

    pub fn round(&self) -> Round {
        self.current_round
    }

    /// Flag marking things that belong to `turn` (default: the current turn).
    pub fn flag(&self, turn: Option<i64>) -> String {
        format!("turn:turn-{}", turn.unwrap_or(self.current_turn))
    }

    pub fn round_flag(&self, round: Option<Round>) -> String {
        format!("turn:round-{}", round.unwrap_or(self.current_round))
    }

    pub fn player_flag(&self, player: Option<i64>) -> String {
        format!("turn:player-{}", player.unwrap_or(self.current_player))
    }
}

impl Plugin for Turns {
    fn name(&self) -> &str {
        TURNS_NAME
    }

    fn compat(&self) -> u32 {
        1
    }

    fn methods(&self) -> Vec<String> {
        ["player", "player_num", "number", "round", "start", "flag", "roundflag", "playerflag"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    fn method_prefix(&self) -> &str {
        "turn_"
    }

    fn invoke(&mut self, session: &mut Session<'_>, method: &str, args: &Args) -> anyhow::Result<Value> {
        let value = match method {
            "player" => json!(self.player_name(session.players())),
            "player_num" => json!(self.current_player),
            "number" => json!(self.current_turn),
            "round" => json!(self.current_round),
            "start" => {
                let step: i64 = opt_arg(args, "step")?.unwrap_or(1);
                self.start(
                    session.players().len(),
                    opt_arg(args, "player")?,
                    opt_arg(args, "round")?,
                    step,
                )?;
                Value::Null
            }
            "flag" => json!(self.flag(opt_arg(args, "turn")?)),
            "roundflag" => json!(self.round_flag(opt_arg(args, "round")?)),
            "playerflag" => json!(self.player_flag(opt_arg(args, "player")?)),
            other => anyhow::bail!("method '{other}' not implemented"),
        };
        Ok(value)
    }

    fn get_state(&self, _viewer: Viewer) -> anyhow::Result<Value> {
        Ok(serde_json::to_value(self)?)
    }

    fn set_state(&mut self, state: Value) -> anyhow::Result<()> {
        let order = self.order;
        *self = if state.is_null() {
            Self::default()
        } else {
            serde_json::from_value(state)?
        };
        self.order = order;
        Ok(())
    }
}
