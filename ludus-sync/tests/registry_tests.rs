use ludus_sync::{Envelope, Observer, ObserverRegistry, Recipients, Recorder};
use ludus_types::{Notice, NoticeType, PlayerId};
use parking_lot::Mutex;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

// ── Closure observers ─────────────────────────────────────────────

#[test]
fn closure_observer_receives_player_and_notice() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = seen.clone();
    let mut reg = ObserverRegistry::new();
    reg.observe(
        PlayerId::new(1),
        Arc::new(move |seq: u64, player: PlayerId, notice: &Notice| {
            sink.lock().push((seq, player, notice.data().clone()));
        }),
    );
    reg.notify(&Recipients::All, &Notice::new("s", NoticeType::CALL, json!("hi")));
    assert_eq!(*seen.lock(), vec![(1, PlayerId::new(1), json!("hi"))]);
}

// ── Recipients ────────────────────────────────────────────────────

#[test]
fn players_recipient_only_reaches_listed() {
    let mut reg = ObserverRegistry::new();
    let a = Arc::new(Recorder::new());
    let b = Arc::new(Recorder::new());
    reg.observe(PlayerId::new(0), a.clone());
    reg.observe(PlayerId::new(1), b.clone());
    let sent = reg.notify(
        &Recipients::player(PlayerId::new(1)),
        &Notice::new("s", NoticeType::CALL, json!(null)),
    );
    assert_eq!(sent, 1);
    assert!(a.is_empty());
    assert_eq!(b.len(), 1);
}

#[test]
fn recipients_serde_shape() {
    assert_eq!(serde_json::to_value(Recipients::All).unwrap(), json!("all"));
    assert_eq!(
        serde_json::to_value(Recipients::Players(vec![PlayerId::new(0)])).unwrap(),
        json!({"players": [0]})
    );
}

// ── Envelope ──────────────────────────────────────────────────────

#[test]
fn envelope_json_shape() {
    let env = Envelope::new(
        4,
        PlayerId::new(1),
        Notice::new("server", NoticeType::CALL, json!({"row": 0})).with_name("place"),
    );
    let text = env.to_json().unwrap();
    let value: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(
        value,
        json!({
            "seq": 4,
            "player": 1,
            "notice": {"source": "server", "type": "::call", "name": "place", "data": {"row": 0}}
        })
    );
    assert_eq!(Envelope::from_json(&text).unwrap(), env);
}

#[test]
fn envelope_from_bad_json_fails() {
    assert!(Envelope::from_json("{").is_err());
}

// ── Channel sinks ─────────────────────────────────────────────────

#[tokio::test]
async fn bounded_sender_observer() {
    let (tx, mut rx) = tokio::sync::mpsc::channel::<Envelope>(4);
    let mut reg = ObserverRegistry::new();
    let observer: Arc<dyn Observer> = Arc::new(tx);
    reg.observe(PlayerId::new(0), observer);
    reg.notify(&Recipients::All, &Notice::new("s", NoticeType::INIT, json!({})));
    let env = rx.recv().await.unwrap();
    assert_eq!(env.seq, 1);
    assert_eq!(env.notice.kind(), &NoticeType::INIT);
}
