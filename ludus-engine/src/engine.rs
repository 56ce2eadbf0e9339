//! The engine handle shared by producers and the single consumer.
//!
//! State lives behind a re-entrant lock; work flows through an unbounded
//! FIFO channel:
//!
//! ```text
//! schedule / notify / dispatch ──▶ [ mpsc queue ] ──▶ run() / process_queue()
//!                                                          │
//!                                  call / deliver / apply ◀┘
//! ```
//!
//! Observers are invoked with the state borrow released, so an observer may
//! call back into the engine that is delivering to it.

use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};
use crate::journal::{Journal, JournalEntry};
use crate::plugin::Plugin;
use crate::queue::Work;
use crate::session::{Session, View};
use crate::snapshot::{InitData, Snapshot};
use crate::state::Core;
use ludus_sync::{Observer, ObserverId, Recipients};
use ludus_types::{Args, Notice, NoticeType, PlayerId, Viewer};
use parking_lot::ReentrantMutex;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cell::RefCell;
use std::sync::Arc;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tracing::{debug, error, info};

/// Whether an engine is the authoritative writer or a replica.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    Server,
    Client,
}

/// A session engine.
///
/// The mode is fixed at construction. Share the engine as `Arc<Engine>`;
/// any thread may enqueue work, one consumer at a time drains it.
pub struct Engine {
    core: ReentrantMutex<RefCell<Core>>,
    tx: UnboundedSender<Work>,
    inbox: tokio::sync::Mutex<UnboundedReceiver<Work>>,
}

impl Engine {
    #[must_use]
    pub fn new(mode: Mode) -> Self {
        Self::with_config(mode, EngineConfig::default())
    }

    #[must_use]
    pub fn with_config(mode: Mode, config: EngineConfig) -> Self {
        let (tx, rx) = mpsc::unbounded_channel();
        Self {
            core: ReentrantMutex::new(RefCell::new(Core::new(mode, config))),
            tx,
            inbox: tokio::sync::Mutex::new(rx),
        }
    }

    /// Runs `f` against the core, then flushes the work it produced.
    fn with_core<R>(&self, f: impl FnOnce(&mut Core) -> EngineResult<R>) -> EngineResult<R> {
        let guard = self.core.lock();
        let mut core = guard.try_borrow_mut().map_err(|_| EngineError::Reentrant)?;
        let result = f(&mut *core);
        let outbox = std::mem::take(&mut core.outbox);
        drop(core);
        for work in outbox {
            self.enqueue(work);
        }
        result
    }

    fn read<R>(&self, f: impl FnOnce(&Core) -> R) -> EngineResult<R> {
        let guard = self.core.lock();
        let core = guard.try_borrow().map_err(|_| EngineError::Reentrant)?;
        Ok(f(&*core))
    }

    fn enqueue(&self, work: Work) {
        let label = work.label();
        if self.tx.send(work).is_err() {
            debug!(work = label, "queue closed, work dropped");
        }
    }

    // ── Identity ────────────────────────────────────────────────────────

    pub fn mode(&self) -> EngineResult<Mode> {
        self.read(|core| core.mode)
    }

    pub fn is_server(&self) -> bool {
        matches!(self.mode(), Ok(Mode::Server))
    }

    pub fn is_client(&self) -> bool {
        matches!(self.mode(), Ok(Mode::Client))
    }

    pub fn config(&self) -> EngineResult<EngineConfig> {
        self.read(|core| core.config.clone())
    }

    // ── Plugins ─────────────────────────────────────────────────────────

    /// Adds a plugin. Registration order fixes handler order.
    pub fn register_plugin<P: Plugin>(&self, plugin: P) -> EngineResult<()> {
        self.with_core(|core| core.register_plugin(plugin))
    }

    pub fn has_plugin(&self, name: &str) -> bool {
        self.read(|core| core.registry.contains(name)).unwrap_or(false)
    }

    /// Plugin names in registration order.
    pub fn plugin_names(&self) -> EngineResult<Vec<String>> {
        self.read(|core| core.registry.names())
    }

    /// Full names of every plugin method.
    pub fn methods(&self) -> EngineResult<Vec<String>> {
        self.read(|core| core.registry.methods())
    }

    /// Runs `f` with a plugin and a session over this engine.
    pub fn with_plugin<P, R, F>(&self, f: F) -> EngineResult<R>
    where
        P: Plugin,
        F: FnOnce(&mut P, &mut Session<'_>) -> anyhow::Result<R>,
    {
        self.with_core(|core| Session::new(core).with_plugin(f))
    }

    /// Reads a plugin's state.
    pub fn read_plugin<P, R, F>(&self, f: F) -> EngineResult<R>
    where
        P: Plugin,
        F: FnOnce(&P) -> R,
    {
        let guard = self.core.lock();
        let core = guard.try_borrow().map_err(|_| EngineError::Reentrant)?;
        let plugin = View::new(&*core).plugin::<P>()?;
        Ok(f(plugin))
    }

    /// Runs `f` with a read-only view of the engine.
    pub fn view<R>(&self, f: impl FnOnce(&View<'_>) -> R) -> EngineResult<R> {
        self.read(|core| f(&View::new(core)))
    }

    // ── Actions ─────────────────────────────────────────────────────────

    /// Executes `action` immediately. `Ok(false)` means a check rejected it.
    pub fn call(&self, action: &str, args: Args) -> EngineResult<bool> {
        self.with_core(|core| core.call(action, args, None))
    }

    /// Checks `action` now and queues it for the consumer.
    pub fn schedule(&self, action: &str, args: Args) -> EngineResult<bool> {
        self.with_core(|core| core.schedule(action, args))
    }

    /// Calls a plugin method by its full name.
    pub fn invoke(&self, method: &str, args: &Args) -> EngineResult<Value> {
        self.with_core(|core| core.invoke(method, args))
    }

    // ── Replication ─────────────────────────────────────────────────────

    /// Queues `notice` for the observers of `to`.
    pub fn notify(&self, to: impl Into<Recipients>, notice: Notice) {
        self.enqueue(Work::Notify { to: to.into(), notice });
    }

    /// Registers an observer for `player`. Its first notice has sequence 1.
    pub fn observe(&self, player: PlayerId, observer: Arc<dyn Observer>) -> EngineResult<ObserverId> {
        self.with_core(|core| Ok(core.observers.observe(player, observer)))
    }

    pub fn unobserve(&self, player: PlayerId, id: ObserverId) -> EngineResult<bool> {
        self.with_core(|core| Ok(core.observers.unobserve(player, id)))
    }

    /// Sequence number of the last notice minted for a registration.
    pub fn observer_sequence(&self, player: PlayerId, id: ObserverId) -> EngineResult<Option<u64>> {
        self.read(|core| core.observers.sequence(player, id))
    }

    /// An observer that queues every notice on this (replica) engine.
    ///
    /// Holds a weak reference: once the engine is dropped the observer
    /// ignores further notices.
    pub fn replica_observer(self: &Arc<Self>) -> Arc<dyn Observer> {
        let weak = Arc::downgrade(self);
        Arc::new(move |seq: u64, player: PlayerId, notice: &Notice| {
            if let Some(engine) = weak.upgrade() {
                engine.dispatch(seq, player, notice.clone());
            }
        })
    }

    /// Queues a sequenced notice from the authoritative engine.
    pub fn dispatch(&self, seq: u64, player: PlayerId, notice: Notice) {
        self.enqueue(Work::Dispatch { seq, player, notice });
    }

    /// Applies a sequenced notice immediately, bypassing the queue.
    pub fn dispatch_now(&self, seq: u64, player: PlayerId, notice: Notice) -> EngineResult<()> {
        self.with_core(|core| core.dispatch(seq, player, notice))
    }

    /// Last sequence this replica accepted.
    pub fn cursor(&self) -> EngineResult<u64> {
        self.read(|core| core.cursor.position())
    }

    /// Replaces replica state from a snapshot taken at sequence `seq`.
    ///
    /// Work queued ahead of a pending shutdown is discarded first; it
    /// predates the snapshot. The shutdown sentinel and whatever follows it
    /// are queued again and keep their relative order.
    pub fn resync(&self, snapshot: Snapshot, seq: u64) -> EngineResult<()> {
        let mut discarded = 0usize;
        if let Ok(mut rx) = self.inbox.try_lock() {
            let mut tail = Vec::new();
            while let Ok(work) = rx.try_recv() {
                if tail.is_empty() && !matches!(work, Work::Exit) {
                    discarded += 1;
                } else {
                    tail.push(work);
                }
            }
            for work in tail {
                self.enqueue(work);
            }
        }
        self.with_core(|core| {
            core.apply_snapshot(snapshot)?;
            core.cursor.reset(seq);
            info!(seq, discarded, "replica resynced");
            Ok(())
        })
    }

    // ── Queue ───────────────────────────────────────────────────────────

    fn execute(&self, work: Work) -> EngineResult<bool> {
        match work {
            Work::Call { action, args, stash } => {
                if !self.with_core(|core| core.call(&action, args, stash))? {
                    debug!(action = %action, "queued call rejected by check");
                }
            }
            Work::Notify { to, notice } => {
                let deliveries = self.with_core(|core| Ok(core.observers.address(&to)))?;
                for delivery in &deliveries {
                    delivery.deliver(&notice);
                }
            }
            Work::Dispatch { seq, player, notice } => {
                self.with_core(|core| core.dispatch(seq, player, notice))?;
            }
            Work::Exit => return Ok(false),
        }
        Ok(true)
    }

    /// Drains what is currently queued.
    ///
    /// Returns `Ok(false)` once the shutdown sentinel has been consumed. The
    /// first fault is returned and the rest of the queue is left in place.
    pub fn process_queue(&self) -> EngineResult<bool> {
        let mut rx = self.inbox.try_lock().map_err(|_| EngineError::ConsumerBusy)?;
        while let Ok(work) = rx.try_recv() {
            if !self.execute(work)? {
                return Ok(false);
            }
        }
        Ok(true)
    }

    /// Consumes the queue until [`shutdown`](Self::shutdown).
    ///
    /// Faults in queued work are logged and the loop keeps going.
    pub async fn run(&self) -> EngineResult<()> {
        let mut rx = self.inbox.try_lock().map_err(|_| EngineError::ConsumerBusy)?;
        let interval = self.read(|core| core.config.poll_interval())?;
        info!(?interval, "engine consumer started");

        loop {
            match tokio::time::timeout(interval, rx.recv()).await {
                Ok(Some(work)) => {
                    let label = work.label();
                    match self.execute(work) {
                        Ok(true) => {}
                        Ok(false) => break,
                        Err(e) => error!(work = label, error = %e, "queued work failed"),
                    }
                }
                Ok(None) => break,
                Err(_) => continue,
            }
        }

        info!("engine consumer stopped");
        Ok(())
    }

    /// Stops the consumer after everything already queued.
    pub fn shutdown(&self) {
        self.enqueue(Work::Exit);
    }

    // ── Journal ─────────────────────────────────────────────────────────

    /// Limits the undo depth to at most `n`.
    pub fn commit(&self, n: usize) -> EngineResult<()> {
        self.with_core(|core| {
            core.journal.commit(n);
            Ok(())
        })
    }

    pub fn journal(&self) -> EngineResult<Journal> {
        self.read(|core| core.journal.clone())
    }

    pub fn undoable(&self) -> EngineResult<usize> {
        self.read(|core| core.journal.undoable())
    }

    /// Removes and returns entries that are no longer revocable.
    pub fn trim_journal(&self) -> EngineResult<Vec<JournalEntry>> {
        self.with_core(|core| Ok(core.journal.trim()))
    }

    /// Re-executes journaled calls in order with their recorded stashes.
    pub fn replay(&self, entries: impl IntoIterator<Item = JournalEntry>) -> EngineResult<()> {
        for entry in entries {
            let JournalEntry { action, args, stash } = entry;
            self.with_core(|core| core.call(&action, args, Some(stash)))?;
        }
        Ok(())
    }

    // ── State ───────────────────────────────────────────────────────────

    pub fn get_state(&self, viewer: Viewer) -> EngineResult<Snapshot> {
        self.read(|core| core.snapshot(viewer))?
    }

    pub fn set_state(&self, snapshot: Snapshot) -> EngineResult<()> {
        self.with_core(|core| core.apply_snapshot(snapshot))
    }

    /// Initializes every plugin. A server then broadcasts the resulting
    /// [`InitData`] as an INIT notice.
    pub fn initialize(&self, data: Option<InitData>) -> EngineResult<()> {
        self.with_core(|core| core.initialize(data))
    }

    pub fn initialization_data(&self) -> EngineResult<InitData> {
        self.read(|core| core.initialization_data())?
    }

    pub fn players(&self) -> EngineResult<Vec<String>> {
        self.read(|core| core.players.clone())
    }

    pub fn set_players(&self, players: Vec<String>) -> EngineResult<()> {
        self.with_core(|core| {
            core.players = players;
            Ok(())
        })
    }

    pub fn attr(&self, key: &str) -> EngineResult<Option<Value>> {
        self.read(|core| core.attrs.get(key).cloned())
    }

    pub fn set_attr(&self, key: impl Into<String>, value: Value) -> EngineResult<()> {
        let key = key.into();
        self.with_core(|core| {
            core.attrs.insert(key, value);
            Ok(())
        })
    }

    /// Registers a notice type for a component that is not a plugin.
    pub fn register_notice_type(&self, owner: &str, ident: &str, token: &str) -> EngineResult<NoticeType> {
        let token = token.to_string();
        self.with_core(|core| {
            core.notice_types
                .register(owner, ident, token)
                .map_err(|e| EngineError::Configuration(e.to_string()))
        })
    }

    pub fn notice_type(&self, owner: &str, ident: &str) -> EngineResult<Option<NoticeType>> {
        self.read(|core| core.notice_types.get(owner, ident).cloned())
    }
}

impl std::fmt::Debug for Engine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Engine").finish_non_exhaustive()
    }
}
