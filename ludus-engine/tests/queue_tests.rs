mod common;

use common::{args, seat, trace, Audit, Counter};
use ludus_engine::{Engine, EngineConfig, EngineError, Mode};
use ludus_sync::Recorder;
use ludus_types::{Args, Notice, NoticeType};
use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;

fn engine() -> Engine {
    let t = trace();
    let config = EngineConfig {
        poll_interval_ms: 5,
        ..Default::default()
    };
    let engine = Engine::with_config(Mode::Server, config);
    engine.register_plugin(Counter::new(t.clone())).unwrap();
    engine.register_plugin(Audit::new(t)).unwrap();
    engine
}

fn counter(engine: &Engine) -> i64 {
    engine.read_plugin::<Counter, _, _>(|c| c.value).unwrap()
}

// ── process_queue ────────────────────────────────────────────────

#[test]
fn queue_is_fifo() {
    let engine = engine();
    let rec = Arc::new(Recorder::new());
    engine.observe(seat(0), rec.clone()).unwrap();

    engine.notify(seat(0), Notice::new("server", NoticeType::custom("a"), json!(1)));
    engine.schedule("add", args(json!({"amount": 1}))).unwrap();
    engine.notify(seat(0), Notice::new("server", NoticeType::custom("b"), json!(2)));
    assert!(engine.process_queue().unwrap());

    let kinds: Vec<String> = rec
        .envelopes()
        .iter()
        .map(|e| e.notice.kind().to_string())
        .collect();
    // The CALL notice is queued when the call runs, behind `b`.
    assert_eq!(kinds, vec!["a", "b", "::call"]);
}

#[test]
fn shutdown_stops_after_earlier_work() {
    let engine = engine();
    engine.schedule("add", args(json!({"amount": 1}))).unwrap();
    engine.shutdown();
    engine.schedule("add", args(json!({"amount": 10}))).unwrap();

    assert!(!engine.process_queue().unwrap());
    assert_eq!(counter(&engine), 2);

    // Work behind the sentinel stays queued.
    assert!(engine.process_queue().unwrap());
    assert_eq!(counter(&engine), 13);
}

#[test]
fn first_fault_propagates_and_rest_stays_queued() {
    let engine = engine();
    engine
        .schedule("add", args(json!({"fail": "action"})))
        .unwrap();
    engine.schedule("add", args(json!({"amount": 1}))).unwrap();

    assert!(matches!(engine.process_queue(), Err(EngineError::Phase { .. })));
    let before = counter(&engine);
    assert!(engine.process_queue().unwrap());
    assert_eq!(counter(&engine), before + 2);
}

#[test]
fn notify_to_unobserved_player_is_dropped() {
    let engine = engine();
    let rec = Arc::new(Recorder::new());
    engine.observe(seat(0), rec.clone()).unwrap();
    engine.notify(seat(3), Notice::new("server", NoticeType::custom("x"), json!(null)));
    engine.process_queue().unwrap();
    assert!(rec.is_empty());
}

// ── run ──────────────────────────────────────────────────────────

#[tokio::test]
async fn run_drains_until_shutdown() {
    let engine = engine();
    let producer = async {
        for _ in 0..3 {
            engine.schedule("add", args(json!({"amount": 1}))).unwrap();
            tokio::task::yield_now().await;
        }
        engine.shutdown();
    };

    let (ran, ()) = tokio::join!(engine.run(), producer);
    ran.unwrap();
    assert_eq!(counter(&engine), 6);
}

#[tokio::test]
async fn run_logs_faults_and_keeps_going() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();

    let engine = engine();
    engine.schedule("add", args(json!({"fail": "before"}))).unwrap();
    engine.schedule("add", args(json!({"amount": 1}))).unwrap();
    engine.shutdown();

    engine.run().await.unwrap();
    assert_eq!(counter(&engine), 2);
}

#[tokio::test]
async fn second_consumer_is_refused() {
    let engine = engine();
    let other = async {
        tokio::task::yield_now().await;
        let busy = engine.process_queue();
        engine.shutdown();
        busy
    };

    let (ran, busy) = tokio::join!(engine.run(), other);
    ran.unwrap();
    assert!(matches!(busy, Err(EngineError::ConsumerBusy)));
}

#[tokio::test]
async fn run_on_shared_engine_across_tasks() {
    let engine = Arc::new(engine());
    let consumer = {
        let engine = engine.clone();
        tokio::spawn(async move { engine.run().await })
    };

    let producers: Vec<_> = (0..4)
        .map(|_| {
            let engine = engine.clone();
            tokio::spawn(async move {
                engine.schedule("add", Args::new()).unwrap();
            })
        })
        .collect();
    for p in producers {
        p.await.unwrap();
    }
    engine.shutdown();
    consumer.await.unwrap().unwrap();

    // Each call adds only the stashed bonus.
    assert_eq!(counter(&engine), 4);
}
