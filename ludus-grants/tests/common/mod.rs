#![allow(dead_code)]

use ludus_engine::{ActionSet, Engine, Mode, Plugin};
use ludus_grants::{Grant, GrantManager, SessionGrants};
use ludus_types::{Args, PlayerId, Viewer};
use serde_json::{json, Value};
use std::sync::Arc;

pub fn args(value: Value) -> Args {
    value.as_object().cloned().unwrap_or_default()
}

pub fn seat(n: u32) -> PlayerId {
    PlayerId::new(n)
}

/// A nine-cell board. `place` marks a free cell for a player; `open`
/// hands player 0 the first placement grant from inside a handler.
#[derive(Debug, Default)]
pub struct Board {
    pub cells: Vec<Option<u64>>,
    pub placed: Vec<Args>,
}

impl Board {
    pub fn new() -> Self {
        Self {
            cells: vec![None; 9],
            placed: Vec::new(),
        }
    }

    fn free(&self, args: &Args) -> bool {
        args.get("cell")
            .and_then(Value::as_u64)
            .and_then(|cell| self.cells.get(cell as usize))
            .is_some_and(Option::is_none)
    }
}

impl Plugin for Board {
    fn name(&self) -> &str {
        "board"
    }

    fn compat(&self) -> u32 {
        1
    }

    fn depends(&self) -> Vec<String> {
        vec!["grants".into()]
    }

    fn actions(&self) -> ActionSet<Self> {
        ActionSet::<Self>::new()
            .check("place", |board, _, args| board.free(args))
            .action("place", |board, _, _, args| {
                let cell = args.get("cell").and_then(Value::as_u64).unwrap_or_default() as usize;
                board.cells[cell] = args.get("player").and_then(Value::as_u64);
                board.placed.push(args.clone());
                Ok(())
            })
            .action("open", |_, session, _, _| {
                let first = Grant::new("place").with_id("first").with_kwarg("player", json!(0));
                session.grant(&[seat(0)], vec![first])?;
                Ok(())
            })
    }

    fn get_state(&self, _viewer: Viewer) -> anyhow::Result<Value> {
        Ok(json!({ "cells": self.cells }))
    }

    fn set_state(&mut self, state: Value) -> anyhow::Result<()> {
        self.cells = serde_json::from_value(state["cells"].clone())?;
        Ok(())
    }
}

pub fn build(mode: Mode) -> Arc<Engine> {
    let engine = Arc::new(Engine::new(mode));
    engine.register_plugin(GrantManager::new()).unwrap();
    engine.register_plugin(Board::new()).unwrap();
    engine
}

pub fn placed(engine: &Engine) -> Vec<Args> {
    engine.read_plugin::<Board, _, _>(|b| b.placed.clone()).unwrap()
}

pub fn cells(engine: &Engine) -> Vec<Option<u64>> {
    engine.read_plugin::<Board, _, _>(|b| b.cells.clone()).unwrap()
}
