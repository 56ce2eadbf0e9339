mod common;

use common::args;
use ludus_engine::{Engine, EngineError, Mode, Viewer};
use ludus_plugins::{EngineTurns, Round, Turns};
use pretty_assertions::assert_eq;
use serde_json::json;

fn seated(players: &[&str]) -> Engine {
    let engine = Engine::new(Mode::Server);
    engine.register_plugin(Turns::new()).unwrap();
    engine
        .set_players(players.iter().map(|p| p.to_string()).collect())
        .unwrap();
    engine
}

#[test]
fn methods_use_turn_prefix() {
    let engine = seated(&["ann", "bob", "cy"]);
    assert_eq!(engine.invoke("turn_player", &args(json!({}))).unwrap(), json!(null));

    engine.invoke("turn_start", &args(json!({}))).unwrap();
    engine.invoke("turn_start", &args(json!({}))).unwrap();
    assert_eq!(engine.invoke("turn_player", &args(json!({}))).unwrap(), json!("bob"));
    assert_eq!(engine.invoke("turn_player_num", &args(json!({}))).unwrap(), json!(1));
    assert_eq!(engine.invoke("turn_number", &args(json!({}))).unwrap(), json!(1));
    assert_eq!(engine.invoke("turn_round", &args(json!({}))).unwrap(), json!(0));
    assert_eq!(engine.invoke("turn_flag", &args(json!({}))).unwrap(), json!("turn:turn-1"));
    assert_eq!(
        engine.invoke("turn_playerflag", &args(json!({"player": 2}))).unwrap(),
        json!("turn:player-2")
    );
    assert_eq!(engine.invoke("turn_roundflag", &args(json!({}))).unwrap(), json!("turn:round-0"));
}

#[test]
fn start_accepts_explicit_player_round_and_step() {
    let engine = seated(&["ann", "bob", "cy"]);
    engine
        .invoke("turn_start", &args(json!({"player": 2, "round": 4})))
        .unwrap();
    assert_eq!(engine.turn_round().unwrap(), Round::Number(4));
    engine.invoke("turn_start", &args(json!({"step": -2}))).unwrap();
    assert_eq!(engine.turn_player().unwrap().map(|p| p.seat()), Some(0));
    assert_eq!(engine.turn_round().unwrap(), Round::Number(4));
}

#[test]
fn next_turn_without_players_fails() {
    let engine = seated(&[]);
    match engine.next_turn().unwrap_err() {
        EngineError::Plugin { plugin, source, .. } => {
            assert_eq!(plugin, "turns");
            assert_eq!(source.to_string(), "no players seated");
        }
        other => panic!("expected plugin error, got {other:?}"),
    }
}

#[test]
fn malformed_start_argument_is_reported() {
    let engine = seated(&["ann", "bob"]);
    let err = engine
        .invoke("turn_start", &args(json!({"player": "first"})))
        .unwrap_err();
    assert!(err.to_string().contains("invalid argument 'player'"), "{err}");
    assert_eq!(engine.turn_number().unwrap(), -1);
}

#[test]
fn turn_state_is_public_and_restorable() {
    let engine = seated(&["ann", "bob"]);
    engine.next_turn().unwrap();
    engine.next_turn().unwrap();
    engine.next_turn().unwrap();

    let anon = engine.get_state(Viewer::Anonymous).unwrap();
    assert_eq!(
        anon.plugin_state[0].state,
        json!({"current_turn": 2, "current_round": 1, "current_player": 0})
    );

    let copy = seated(&[]);
    copy.set_state(engine.get_state(Viewer::Admin).unwrap()).unwrap();
    assert_eq!(copy.turn_number().unwrap(), 2);
    assert_eq!(copy.players().unwrap(), vec!["ann", "bob"]);
}

#[test]
fn switchback_rounds_through_methods() {
    let engine = Engine::new(Mode::Server);
    engine.register_plugin(Turns::switchback()).unwrap();
    engine.set_players(vec!["ann".into(), "bob".into()]).unwrap();

    let mut rounds = Vec::new();
    for _ in 0..5 {
        engine.next_turn().unwrap();
        rounds.push((
            engine.invoke("turn_round", &args(json!({}))).unwrap(),
            engine.invoke("turn_player", &args(json!({}))).unwrap(),
        ));
    }
    assert_eq!(
        rounds,
        vec![
            (json!("setup-1"), json!("ann")),
            (json!("setup-1"), json!("bob")),
            (json!("setup-2"), json!("bob")),
            (json!("setup-2"), json!("ann")),
            (json!(0), json!("ann")),
        ]
    );
    assert_eq!(
        engine.invoke("turn_roundflag", &args(json!({"round": "setup-2"}))).unwrap(),
        json!("turn:round-setup-2")
    );
}

#[test]
fn restored_switchback_keeps_its_order() {
    let engine = Engine::new(Mode::Server);
    engine.register_plugin(Turns::switchback()).unwrap();
    engine.set_players(vec!["ann".into(), "bob".into()]).unwrap();
    engine.next_turn().unwrap();
    engine.next_turn().unwrap();

    let state = engine.get_state(Viewer::Admin).unwrap();
    assert_eq!(state.plugin_state[0].state["current_round"], json!("setup-1"));

    let copy = Engine::new(Mode::Server);
    copy.register_plugin(Turns::switchback()).unwrap();
    copy.set_state(state).unwrap();
    copy.next_turn().unwrap();
    assert_eq!(copy.turn_round().unwrap(), Round::Setup(2));
    assert_eq!(copy.turn_player().unwrap().map(|p| p.seat()), Some(1));
}
