//! The phased action lifecycle.
//!
//! ```text
//! check ─▶ init ─▶ [commit] ─▶ before ─▶ action ─▶ after ─▶ notify ─▶ keep
//!            │                   └────────┴────────┴──────▶ error
//!            └──────────────────────────────────────────────▶ error
//! ```
//!
//! Every phase runs the contributing plugins in registration order.

use crate::action::{Disclosure, MutateFn, Phase};
use crate::config::RollbackPolicy;
use crate::error::{EngineError, EngineResult};
use crate::journal::JournalEntry;
use crate::queue::Work;
use crate::registry::Contribution;
use crate::session::{Session, View};
use crate::state::Core;
use ludus_sync::Recipients;
use ludus_types::{Args, Notice, NoticeType, Stash, Viewer};
use serde_json::{Map, Value};
use tracing::{debug, warn};

impl Core {
    /// Executes `action` immediately.
    ///
    /// Returns `Ok(false)` when a check rejects the call. A supplied stash
    /// replays a journaled call: the init phase is skipped.
    pub fn call(&mut self, action: &str, args: Args, stash: Option<Stash>) -> EngineResult<bool> {
        let plan = self.plan(action)?;
        for c in &plan {
            if !self.registry.is_available(c.slot) {
                return Err(EngineError::PluginBusy(self.registry.name_of(c.slot).to_string()));
            }
        }

        if !self.check(&plan, &args) {
            debug!(action, "call rejected by check");
            return Ok(false);
        }

        let replay = stash.is_some();
        let stash = match stash {
            Some(stash) => stash,
            None => {
                let mut stash = Stash::new();
                if let Err(e) = self.run_init(&plan, &mut stash, &args) {
                    self.run_best_effort(action, Phase::Error, &plan, &stash, &args);
                    return Err(EngineError::Phase {
                        action: action.to_string(),
                        phase: Phase::Init,
                        source: e.into(),
                    });
                }
                stash
            }
        };

        let restore = self.checkpoint()?;
        self.journal.append(JournalEntry {
            action: action.to_string(),
            args: args.clone(),
            stash: stash.clone(),
        });
        debug!(action, replay, journal = self.journal.len(), "call committed");

        if let Err((phase, e)) = self.run_mutating(&plan, &stash, &args) {
            self.run_best_effort(action, Phase::Error, &plan, &stash, &args);
            if let Some(checkpoint) = restore {
                self.roll_back(action, checkpoint);
            }
            return Err(EngineError::Phase {
                action: action.to_string(),
                phase,
                source: e.into(),
            });
        }

        self.run_notify(action, &plan, &stash, &args);
        self.run_best_effort(action, Phase::Keep, &plan, &stash, &args);

        if self.config.auto_commit {
            self.journal.commit(0);
        }
        Ok(true)
    }

    /// Checks `action` now and queues it for the consumer.
    ///
    /// A check whose plugin is busy further up the stack is left to run when
    /// the queued call executes.
    pub fn schedule(&mut self, action: &str, args: Args) -> EngineResult<bool> {
        let plan = self.plan(action)?;
        let checkable = plan
            .iter()
            .filter(|c| c.handlers.check.is_some())
            .all(|c| self.registry.is_available(c.slot));

        if checkable {
            if !self.check(&plan, &args) {
                debug!(action, "schedule rejected by check");
                return Ok(false);
            }
        } else {
            debug!(action, "check deferred until the queued call runs");
        }

        self.outbox.push(Work::Call {
            action: action.to_string(),
            args,
            stash: None,
        });
        Ok(true)
    }

    fn plan(&self, action: &str) -> EngineResult<Vec<Contribution>> {
        self.registry
            .plan(action)
            .ok_or_else(|| EngineError::UnknownAction(action.to_string()))
    }

    fn check(&self, plan: &[Contribution], args: &Args) -> bool {
        let view = View::new(self);
        plan.iter().all(|c| {
            let Some(check) = c.handlers.check.as_deref() else {
                return true;
            };
            match self.registry.get(c.slot) {
                Ok(plugin) => check(plugin, &view, args),
                Err(_) => false,
            }
        })
    }

    fn run_init(&self, plan: &[Contribution], stash: &mut Stash, args: &Args) -> anyhow::Result<()> {
        let view = View::new(self);
        for c in plan {
            if let Some(init) = c.handlers.init.as_deref() {
                init(self.registry.get(c.slot)?, &view, stash, args)?;
            }
        }
        Ok(())
    }

    fn run_handler(&mut self, slot: usize, f: &MutateFn, stash: &Stash, args: &Args) -> anyhow::Result<()> {
        let mut plugin = self.registry.take(slot)?;
        let result = f(&mut *plugin, &mut Session::new(self), stash, args);
        self.registry.put_back(slot, plugin);
        result
    }

    fn run_mutating(
        &mut self,
        plan: &[Contribution],
        stash: &Stash,
        args: &Args,
    ) -> Result<(), (Phase, anyhow::Error)> {
        for phase in Phase::MUTATING {
            for c in plan {
                if let Some(f) = c.handlers.mutate.get(&phase) {
                    self.run_handler(c.slot, f.as_ref(), stash, args)
                        .map_err(|e| (phase, e))?;
                }
            }
        }
        Ok(())
    }

    /// Keep and error handlers: faults are logged, never returned.
    fn run_best_effort(&mut self, action: &str, phase: Phase, plan: &[Contribution], stash: &Stash, args: &Args) {
        for c in plan {
            if let Some(f) = c.handlers.mutate.get(&phase) {
                if let Err(e) = self.run_handler(c.slot, f.as_ref(), stash, args) {
                    warn!(
                        action,
                        %phase,
                        plugin = %self.registry.name_of(c.slot),
                        error = %e,
                        "handler fault ignored"
                    );
                }
            }
        }
    }

    /// Queues one CALL notice per observed player, each with its own payload.
    fn run_notify(&mut self, action: &str, plan: &[Contribution], stash: &Stash, args: &Args) {
        let mut outgoing = Vec::new();
        {
            let view = View::new(self);
            'players: for player in self.observers.players() {
                let mut payload = args.clone();
                for c in plan {
                    let Some(notify) = c.handlers.notify.as_deref() else {
                        continue;
                    };
                    let verdict = self
                        .registry
                        .get(c.slot)
                        .map_err(anyhow::Error::from)
                        .and_then(|plugin| notify(plugin, &view, stash, player, &mut payload));
                    match verdict {
                        Ok(Disclosure::Deliver) => {}
                        Ok(Disclosure::Suppress) => continue 'players,
                        Err(e) => {
                            warn!(
                                action,
                                %player,
                                plugin = %self.registry.name_of(c.slot),
                                error = %e,
                                "notify hook failed, notice withheld"
                            );
                            continue 'players;
                        }
                    }
                }
                let notice = Notice::new(self.source(), NoticeType::CALL, Value::Object(payload)).with_name(action);
                outgoing.push(Work::Notify {
                    to: Recipients::player(player),
                    notice,
                });
            }
        }
        self.outbox.extend(outgoing);
    }

    /// Captures what a [`RollbackPolicy::Restore`] rollback puts back.
    ///
    /// Plugins out of their slot belong to handlers further up the stack and
    /// are unreachable from this call, so only available plugins are saved.
    fn checkpoint(&self) -> EngineResult<Option<Checkpoint>> {
        if self.config.rollback != RollbackPolicy::Restore {
            return Ok(None);
        }
        let mut plugins = Vec::new();
        for slot in 0..self.registry.len() {
            if !self.registry.is_available(slot) {
                continue;
            }
            let state = self
                .registry
                .get(slot)?
                .get_state(Viewer::Admin)
                .map_err(|e| EngineError::from_plugin(self.registry.name_of(slot), "get_state", e))?;
            plugins.push((slot, state));
        }
        Ok(Some(Checkpoint {
            players: self.players.clone(),
            attrs: self.attrs.clone(),
            journal_len: self.journal.len(),
            undoable: self.journal.undoable(),
            outbox_len: self.outbox.len(),
            plugins,
        }))
    }

    fn roll_back(&mut self, action: &str, checkpoint: Checkpoint) {
        self.journal.truncate(checkpoint.journal_len);
        self.journal.set_undoable(checkpoint.undoable);
        self.outbox.truncate(checkpoint.outbox_len);
        self.players = checkpoint.players;
        self.attrs = checkpoint.attrs;

        let mut restored = true;
        for (slot, state) in checkpoint.plugins {
            let result = self
                .registry
                .get_mut(slot)
                .map_err(anyhow::Error::from)
                .and_then(|plugin| plugin.set_state(state));
            if let Err(e) = result {
                restored = false;
                warn!(action, plugin = %self.registry.name_of(slot), error = %e, "rollback failed");
            }
        }
        if restored {
            debug!(action, "state restored after fault");
        }
    }
}

/// Session state as it stood at a call's commit point.
struct Checkpoint {
    players: Vec<String>,
    attrs: Map<String, Value>,
    journal_len: usize,
    undoable: usize,
    outbox_len: usize,
    plugins: Vec<(usize, Value)>,
}
