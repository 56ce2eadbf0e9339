#![allow(dead_code)]

use ludus_engine::{ActionSet, Engine, Mode, Plugin, Session};
use ludus_grants::{Grant, GrantManager, SessionGrants};
use ludus_plugins::{Item, ObjectStore, SessionStore, SessionTurns, Turns};
use ludus_types::{Args, PlayerId, Viewer};
use serde_json::{json, Value};
use std::sync::Arc;

pub fn args(value: Value) -> Args {
    value.as_object().cloned().unwrap_or_default()
}

pub fn seat(n: u32) -> PlayerId {
    PlayerId::new(n)
}

fn coord(args: &Args, key: &str) -> Option<usize> {
    args.get(key).and_then(Value::as_u64).map(|v| v as usize)
}

/// Tic-tac-toe on a 3x3 board.
///
/// `begin` starts the first turn. Each turn the current player holds a
/// `place` grant; placing swaps it for an `end_turn` grant, and ending the
/// turn hands the next player a `place` grant. Every mark is mirrored into
/// the shared store.
#[derive(Debug)]
pub struct TicTacToe {
    pub board: Vec<Vec<Option<u32>>>,
}

impl TicTacToe {
    pub fn new() -> Self {
        Self {
            board: vec![vec![None; 3]; 3],
        }
    }

    fn free(&self, args: &Args) -> bool {
        match (coord(args, "x"), coord(args, "y")) {
            (Some(x), Some(y)) => self.board.get(y).and_then(|row| row.get(x)).is_some_and(Option::is_none),
            _ => false,
        }
    }

    fn next_turn(session: &mut Session<'_>) -> anyhow::Result<()> {
        session.commit(0);
        session.next_turn()?;
        if let Some(player) = session.turn_player()? {
            session.grant(&[player], vec![Grant::new("place")])?;
        }
        Ok(())
    }
}

impl Plugin for TicTacToe {
    fn name(&self) -> &str {
        "tic_tac_toe"
    }

    fn compat(&self) -> u32 {
        1
    }

    fn depends(&self) -> Vec<String> {
        vec!["turns".into(), "grants".into(), "store".into()]
    }

    fn actions(&self) -> ActionSet<Self> {
        ActionSet::<Self>::new()
            .action("begin", |_, session, _, _| Self::next_turn(session))
            .check("place", |game, _, args| game.free(args))
            .action("place", |game, session, _, args| {
                let (Some(x), Some(y)) = (coord(args, "x"), coord(args, "y")) else {
                    anyhow::bail!("place needs x and y");
                };
                let Some(player) = session.turn_player()? else {
                    anyhow::bail!("no turn in progress");
                };
                game.board[y][x] = Some(player.seat());
                let mark = Item::named("mark")
                    .with_id(format!("cell-{x}-{y}"))
                    .with_flag(format!("turn:player-{}", player.seat()))
                    .with_data(json!({"x": x, "y": y}));
                session.set_shared(mark)?;
                session.grant(&[player], vec![Grant::new("end_turn")])?;
                Ok(())
            })
            .action("end_turn", |_, session, _, _| Self::next_turn(session))
    }

    fn get_state(&self, _viewer: Viewer) -> anyhow::Result<Value> {
        Ok(json!({ "board": self.board }))
    }

    fn set_state(&mut self, state: Value) -> anyhow::Result<()> {
        self.board = serde_json::from_value(state["board"].clone())?;
        Ok(())
    }
}

/// An engine with turns, grants, the store and tic-tac-toe, in that order.
pub fn game(mode: Mode) -> Arc<Engine> {
    let engine = Arc::new(Engine::new(mode));
    engine.register_plugin(Turns::new()).unwrap();
    engine.register_plugin(GrantManager::new()).unwrap();
    engine.register_plugin(ObjectStore::new()).unwrap();
    engine.register_plugin(TicTacToe::new()).unwrap();
    engine
}

/// An engine with just the store.
pub fn store(mode: Mode) -> Arc<Engine> {
    let engine = Arc::new(Engine::new(mode));
    engine.register_plugin(ObjectStore::new()).unwrap();
    engine
}

pub fn board(engine: &Engine) -> Vec<Vec<Option<u32>>> {
    engine.read_plugin::<TicTacToe, _, _>(|g| g.board.clone()).unwrap()
}
