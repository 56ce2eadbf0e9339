//! Shared test plugins for engine tests.

#![allow(dead_code)]

use ludus_engine::{ActionSet, Disclosure, Listeners, Plugin, Session};
use ludus_types::{Args, NoticeType, PlayerId, Viewer};
use parking_lot::Mutex;
use serde_json::{json, Value};
use std::sync::Arc;

/// Ordered record of handler invocations, shared with the test body.
pub type Trace = Arc<Mutex<Vec<String>>>;

pub fn trace() -> Trace {
    Arc::new(Mutex::new(Vec::new()))
}

pub fn args(value: Value) -> Args {
    match value {
        Value::Object(map) => map,
        _ => Args::new(),
    }
}

fn fails_in(args: &Args, phase: &str) -> bool {
    args.get("fail").and_then(Value::as_str) == Some(phase)
}

pub const PING: NoticeType = NoticeType::from_static("counter:ping");

/// Counter plugin: `add` adds `amount` plus the stashed bonus.
///
/// Argument switches: `reject` fails the check, `fail` names a phase to
/// fault in, `secret` is stripped for seat 1, `hide_from` suppresses one
/// seat and `break_notify_for` makes the notify hook fault for one seat.
pub struct Counter {
    pub value: i64,
    pub secret: String,
    pub seen: Vec<String>,
    trace: Trace,
}

impl Counter {
    pub fn new(trace: Trace) -> Self {
        Self {
            value: 0,
            secret: "hidden".into(),
            seen: Vec::new(),
            trace,
        }
    }

    fn log(&self, entry: &str) {
        self.trace.lock().push(format!("counter.{entry}"));
    }
}

impl Plugin for Counter {
    fn name(&self) -> &str {
        "counter"
    }

    fn compat(&self) -> u32 {
        1
    }

    fn methods(&self) -> Vec<String> {
        vec!["value".into(), "bump".into()]
    }

    fn method_prefix(&self) -> &str {
        "ctr_"
    }

    fn notice_types(&self) -> Vec<(&'static str, NoticeType)> {
        vec![("PING", PING)]
    }

    fn invoke(&mut self, session: &mut Session<'_>, method: &str, args: &Args) -> anyhow::Result<Value> {
        match method {
            "value" => Ok(json!(self.value)),
            "bump" => {
                let scheduled = session.schedule("add", args.clone())?;
                Ok(json!(scheduled))
            }
            other => anyhow::bail!("no method {other}"),
        }
    }

    fn actions(&self) -> ActionSet<Self> {
        ActionSet::<Self>::new()
            .check("add", |_, _, args| args.get("reject") != Some(&json!(true)))
            .init("add", |counter: &Counter, _, stash, args| {
                counter.log("init");
                if fails_in(args, "init") {
                    anyhow::bail!("init fault");
                }
                stash.insert("bonus".into(), json!(1));
                Ok(())
            })
            .before("add", |counter, _, _, args| {
                counter.log("before");
                if fails_in(args, "before") {
                    anyhow::bail!("before fault");
                }
                Ok(())
            })
            .action("add", |counter, _, stash, args| {
                counter.log("action");
                let amount = args.get("amount").and_then(Value::as_i64).unwrap_or(0);
                let bonus = stash.get("bonus").and_then(Value::as_i64).unwrap_or(0);
                counter.value += amount + bonus;
                if fails_in(args, "action") {
                    anyhow::bail!("action fault");
                }
                Ok(())
            })
            .after("add", |counter, _, _, args| {
                counter.log("after");
                if fails_in(args, "after") {
                    anyhow::bail!("after fault");
                }
                Ok(())
            })
            .notify("add", |_, _, _, player, payload| {
                if payload.get("hide_from").and_then(Value::as_u64) == Some(u64::from(player.seat())) {
                    return Ok(Disclosure::Suppress);
                }
                if payload.get("break_notify_for").and_then(Value::as_u64) == Some(u64::from(player.seat())) {
                    anyhow::bail!("notify fault");
                }
                if player.seat() == 1 {
                    payload.remove("secret");
                }
                Ok(Disclosure::Deliver)
            })
            .keep("add", |counter, _, _, args| {
                counter.log("keep");
                if fails_in(args, "keep") {
                    anyhow::bail!("keep fault");
                }
                Ok(())
            })
            .error("add", |counter, _, _, _| {
                counter.log("error");
                anyhow::bail!("error handlers may fault too")
            })
            .action("reset", |counter, _, _, _| {
                counter.value = 0;
                Ok(())
            })
    }

    fn listeners(&self) -> Listeners<Self> {
        Listeners::<Self>::new()
            .on(PING, |counter, _, _, _, _| {
                counter.seen.push("typed".into());
                Ok(())
            })
            .on_any(|counter, _, _, _, notice| {
                counter.seen.push(format!("any:{}", notice.kind()));
                Ok(())
            })
    }

    fn initialize(&mut self, _session: &mut Session<'_>, data: Option<&Value>) -> anyhow::Result<()> {
        self.log("initialize");
        if let Some(start) = data.and_then(|d| d.get("start")).and_then(Value::as_i64) {
            self.value = start;
        }
        Ok(())
    }

    fn initialize_early(&mut self, _session: &mut Session<'_>, _data: Option<&Value>) -> anyhow::Result<()> {
        self.log("initialize_early");
        Ok(())
    }

    fn initialize_late(&mut self, _session: &mut Session<'_>, _data: Option<&Value>) -> anyhow::Result<()> {
        self.log("initialize_late");
        Ok(())
    }

    fn initialization_data(&self) -> Value {
        json!({"start": self.value})
    }

    fn get_state(&self, viewer: Viewer) -> anyhow::Result<Value> {
        Ok(match viewer {
            Viewer::Admin => json!({"value": self.value, "secret": self.secret}),
            _ => json!({"value": self.value}),
        })
    }

    fn set_state(&mut self, state: Value) -> anyhow::Result<()> {
        self.value = state
            .get("value")
            .and_then(Value::as_i64)
            .ok_or_else(|| anyhow::anyhow!("counter state without value"))?;
        if let Some(secret) = state.get("secret").and_then(Value::as_str) {
            self.secret = secret.to_string();
        }
        Ok(())
    }
}

/// Audit plugin: depends on the counter and caps `add` at 100.
pub struct Audit {
    pub calls: usize,
    trace: Trace,
}

impl Audit {
    pub fn new(trace: Trace) -> Self {
        Self { calls: 0, trace }
    }
}

impl Plugin for Audit {
    fn name(&self) -> &str {
        "audit"
    }

    fn compat(&self) -> u32 {
        2
    }

    fn depends(&self) -> Vec<String> {
        vec!["counter".into()]
    }

    fn actions(&self) -> ActionSet<Self> {
        ActionSet::<Self>::new()
            .check("add", |_, _, args| {
                args.get("amount").and_then(Value::as_i64).unwrap_or(0) <= 100
            })
            .action("add", |audit: &mut Audit, session, _, _| {
                audit.calls += 1;
                audit.trace.lock().push("audit.action".into());
                let counter = session.plugin::<Counter>();
                // The counter ran before us and is back in its slot.
                anyhow::ensure!(counter.is_ok(), "counter unavailable");
                Ok(())
            })
            .keep("add", |audit, _, _, _| {
                audit.trace.lock().push("audit.keep".into());
                Ok(())
            })
            .action("nested", |_, session, _, _| {
                session.call("reset", Args::new())?;
                Ok(())
            })
            .action("nested_self", |_, session, _, _| {
                session.call("audit_only", Args::new())?;
                Ok(())
            })
            .action("audit_only", |audit, _, _, _| {
                audit.calls += 100;
                Ok(())
            })
            .action("queue_more", |_, session, _, args| {
                session.schedule("add", args.clone())?;
                Ok(())
            })
    }

    fn initialize(&mut self, _session: &mut Session<'_>, _data: Option<&Value>) -> anyhow::Result<()> {
        self.trace.lock().push("audit.initialize".into());
        Ok(())
    }

    fn initialize_late(&mut self, _session: &mut Session<'_>, _data: Option<&Value>) -> anyhow::Result<()> {
        self.trace.lock().push("audit.initialize_late".into());
        Ok(())
    }

    fn get_state(&self, _viewer: Viewer) -> anyhow::Result<Value> {
        Ok(json!({"calls": self.calls}))
    }

    fn set_state(&mut self, state: Value) -> anyhow::Result<()> {
        self.calls = state.get("calls").and_then(Value::as_u64).unwrap_or(0) as usize;
        Ok(())
    }
}

pub fn seat(n: u32) -> PlayerId {
    PlayerId::new(n)
}
