//! Handles given to plugin code: a read-only [`View`] for check, init and
//! notify handlers, and a mutable [`Session`] for everything else.

use crate::action::{downcast_mut, downcast_ref};
use crate::engine::Mode;
use crate::error::{EngineError, EngineResult};
use crate::journal::Journal;
use crate::plugin::Plugin;
use crate::state::Core;
use ludus_sync::Recipients;
use ludus_types::{Args, Notice, NoticeType, NoticeTypes, PlayerId};
use serde_json::{Map, Value};

/// Read-only access to engine state.
pub struct View<'a> {
    core: &'a Core,
}

impl<'a> View<'a> {
    pub(crate) fn new(core: &'a Core) -> Self {
        Self { core }
    }

    pub fn mode(&self) -> Mode {
        self.core.mode
    }

    pub fn is_server(&self) -> bool {
        self.core.mode == Mode::Server
    }

    pub fn is_client(&self) -> bool {
        self.core.mode == Mode::Client
    }

    /// Seated player names, indexed by [`PlayerId::seat`].
    pub fn players(&self) -> &'a [String] {
        &self.core.players
    }

    pub fn attrs(&self) -> &'a Map<String, Value> {
        &self.core.attrs
    }

    pub fn attr(&self, key: &str) -> Option<&'a Value> {
        self.core.attrs.get(key)
    }

    pub fn journal(&self) -> &'a Journal {
        &self.core.journal
    }

    /// Players with at least one observer.
    pub fn observed_players(&self) -> Vec<PlayerId> {
        self.core.observers.players()
    }

    pub fn notice_types(&self) -> &'a NoticeTypes {
        &self.core.notice_types
    }

    /// Another registered plugin, by type.
    ///
    /// Fails with [`EngineError::PluginBusy`] for a plugin whose mutating
    /// handler is running further up the stack.
    pub fn plugin<P: Plugin>(&self) -> EngineResult<&'a P> {
        let slot = self.core.registry.index_of::<P>()?;
        let plugin = self.core.registry.get(slot)?;
        downcast_ref::<P>(plugin).ok_or_else(|| EngineError::PluginNotFound(std::any::type_name::<P>().to_string()))
    }
}

/// Mutable access to engine state, handed to mutating handlers, listeners,
/// initializers and plugin methods.
pub struct Session<'a> {
    core: &'a mut Core,
}

impl<'a> Session<'a> {
    pub(crate) fn new(core: &'a mut Core) -> Self {
        Self { core }
    }

    pub fn view(&self) -> View<'_> {
        View::new(self.core)
    }

    pub fn mode(&self) -> Mode {
        self.core.mode
    }

    pub fn is_server(&self) -> bool {
        self.core.mode == Mode::Server
    }

    pub fn is_client(&self) -> bool {
        self.core.mode == Mode::Client
    }

    pub fn players(&self) -> &[String] {
        &self.core.players
    }

    pub fn set_players(&mut self, players: Vec<String>) {
        self.core.players = players;
    }

    pub fn attr(&self, key: &str) -> Option<&Value> {
        self.core.attrs.get(key)
    }

    pub fn set_attr(&mut self, key: impl Into<String>, value: Value) {
        self.core.attrs.insert(key.into(), value);
    }

    pub fn observed_players(&self) -> Vec<PlayerId> {
        self.core.observers.players()
    }

    /// Source id for notices emitted through this session.
    pub fn source(&self) -> &'static str {
        self.core.source()
    }

    /// Token registered by `owner` under `ident`.
    pub fn notice_type(&self, owner: &str, ident: &str) -> Option<NoticeType> {
        self.core.notice_types.get(owner, ident).cloned()
    }

    pub fn plugin<P: Plugin>(&self) -> EngineResult<&P> {
        let slot = self.core.registry.index_of::<P>()?;
        let plugin = self.core.registry.get(slot)?;
        downcast_ref::<P>(plugin).ok_or_else(|| EngineError::PluginNotFound(std::any::type_name::<P>().to_string()))
    }

    pub fn plugin_mut<P: Plugin>(&mut self) -> EngineResult<&mut P> {
        let slot = self.core.registry.index_of::<P>()?;
        let plugin = self.core.registry.get_mut(slot)?;
        downcast_mut::<P>(plugin).ok_or_else(|| EngineError::PluginNotFound(std::any::type_name::<P>().to_string()))
    }

    /// Runs `f` with another plugin and a session, the way that plugin's own
    /// handlers run. Plugin methods that need to emit notices or schedule
    /// calls are reached this way.
    pub fn with_plugin<P, R, F>(&mut self, f: F) -> EngineResult<R>
    where
        P: Plugin,
        F: FnOnce(&mut P, &mut Session<'_>) -> anyhow::Result<R>,
    {
        let slot = self.core.registry.index_of::<P>()?;
        let name = self.core.registry.name_of(slot).to_string();
        let mut boxed = self.core.registry.take(slot)?;
        let result = match downcast_mut::<P>(&mut *boxed) {
            Some(plugin) => f(plugin, &mut Session::new(self.core)),
            None => Err(EngineError::PluginNotFound(name.clone()).into()),
        };
        self.core.registry.put_back(slot, boxed);
        result.map_err(|e| EngineError::from_plugin(&name, "session", e))
    }

    /// Queues `notice` for delivery once the current operation completes.
    pub fn notify(&mut self, to: impl Into<Recipients>, notice: Notice) {
        self.core.enqueue_notice(to.into(), notice);
    }

    /// Checks `action` and queues it behind the current operation.
    pub fn schedule(&mut self, action: &str, args: Args) -> EngineResult<bool> {
        self.core.schedule(action, args)
    }

    /// Runs `action` now, nested inside the current handler.
    pub fn call(&mut self, action: &str, args: Args) -> EngineResult<bool> {
        self.core.call(action, args, None)
    }

    pub fn invoke(&mut self, method: &str, args: &Args) -> EngineResult<Value> {
        self.core.invoke(method, args)
    }

    /// Limits the undo depth to at most `n`.
    pub fn commit(&mut self, n: usize) {
        self.core.journal.commit(n);
    }
}
