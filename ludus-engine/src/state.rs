//! Engine state behind the write lock.

use crate::config::EngineConfig;
use crate::engine::Mode;
use crate::error::{EngineError, EngineResult};
use crate::journal::Journal;
use crate::plugin::Plugin;
use crate::queue::Work;
use crate::registry::PluginRegistry;
use crate::session::Session;
use crate::snapshot::{InitData, PluginState, Snapshot};
use ludus_sync::{ObserverRegistry, Recipients, ReplicaCursor};
use ludus_types::{Args, Notice, NoticeType, NoticeTypes, PlayerId, Viewer};
use serde_json::{Map, Value};
use tracing::{debug, info};

/// Everything one engine owns. Only reachable through the engine's lock.
pub(crate) struct Core {
    pub mode: Mode,
    pub config: EngineConfig,
    pub players: Vec<String>,
    pub attrs: Map<String, Value>,
    pub journal: Journal,
    pub registry: PluginRegistry,
    pub observers: ObserverRegistry,
    pub notice_types: NoticeTypes,
    /// Work produced while the lock is held, flushed to the queue afterwards.
    pub outbox: Vec<Work>,
    pub cursor: ReplicaCursor,
}

impl Core {
    pub fn new(mode: Mode, config: EngineConfig) -> Self {
        Self {
            mode,
            config,
            players: Vec::new(),
            attrs: Map::new(),
            journal: Journal::new(),
            registry: PluginRegistry::new(),
            observers: ObserverRegistry::new(),
            notice_types: NoticeTypes::with_core_types(),
            outbox: Vec::new(),
            cursor: ReplicaCursor::new(),
        }
    }

    /// Source id stamped on notices this engine emits.
    pub fn source(&self) -> &'static str {
        match self.mode {
            Mode::Server => "server",
            Mode::Client => "client",
        }
    }

    pub fn register_plugin<P: Plugin>(&mut self, plugin: P) -> EngineResult<()> {
        let name = plugin.name().to_string();
        let mut types = self.notice_types.clone();
        for (ident, token) in plugin.notice_types() {
            types
                .register(&name, ident, token.as_str().to_string())
                .map_err(|e| EngineError::Configuration(e.to_string()))?;
        }
        let pinned = self.config.plugin_versions.get(&name).copied();
        self.registry.register(plugin, pinned)?;
        self.notice_types = types;
        Ok(())
    }

    pub fn enqueue_notice(&mut self, to: Recipients, notice: Notice) {
        self.outbox.push(Work::Notify { to, notice });
    }

    /// Runs a plugin's engine method.
    pub fn invoke(&mut self, method: &str, args: &Args) -> EngineResult<Value> {
        let (slot, local) = self
            .registry
            .method(method)
            .ok_or_else(|| EngineError::UnknownMethod(method.to_string()))?;
        let name = self.registry.name_of(slot).to_string();
        debug!(plugin = %name, method, "invoking plugin method");

        let mut plugin = self.registry.take(slot)?;
        let result = plugin.invoke(&mut Session::new(self), &local, args);
        self.registry.put_back(slot, plugin);
        result.map_err(|e| EngineError::from_plugin(&name, &format!("method '{method}'"), e))
    }

    /// Applies one sequenced notice on a replica.
    pub fn dispatch(&mut self, seq: u64, player: PlayerId, notice: Notice) -> EngineResult<()> {
        self.cursor.advance(seq)?;
        debug!(seq, %player, kind = %notice.kind(), "dispatching notice");

        if *notice.kind() == NoticeType::CALL {
            let action = notice
                .name()
                .ok_or_else(|| EngineError::UnknownAction(String::new()))?
                .to_string();
            let args = match notice.data() {
                Value::Object(map) => map.clone(),
                Value::Null => Args::new(),
                other => serde_json::from_value(other.clone())?,
            };
            if !self.call(&action, args, None)? {
                debug!(action = %action, "replayed call rejected by check");
            }
        } else if *notice.kind() == NoticeType::INIT {
            let data: InitData = serde_json::from_value(notice.data().clone())?;
            self.initialize(Some(data))?;
        }

        for listener in self.registry.listeners_for(notice.kind()) {
            let name = self.registry.name_of(listener.slot).to_string();
            let mut plugin = self.registry.take(listener.slot)?;
            let result = (listener.handler)(&mut *plugin, &mut Session::new(self), seq, player, &notice);
            self.registry.put_back(listener.slot, plugin);
            result.map_err(|e| EngineError::from_plugin(&name, "listener", e))?;
        }
        Ok(())
    }

    /// Runs the three initialization passes, then broadcasts INIT from a server.
    pub fn initialize(&mut self, data: Option<InitData>) -> EngineResult<()> {
        let plugin_init = match data {
            Some(data) => {
                self.players = data.players;
                self.attrs.extend(data.attrs);
                data.plugin_init
            }
            None => Vec::new(),
        };
        let count = self.registry.len();

        for slot in 0..count {
            self.init_pass(slot, plugin_init.get(slot), "initialize_early", |p, s, d| {
                p.initialize_early(s, d)
            })?;
        }
        for slot in 0..count {
            self.init_pass(slot, plugin_init.get(slot), "initialize", |p, s, d| p.initialize(s, d))?;
        }
        for slot in (0..count).rev() {
            self.init_pass(slot, plugin_init.get(slot), "initialize_late", |p, s, d| {
                p.initialize_late(s, d)
            })?;
        }

        info!(mode = ?self.mode, plugins = count, players = self.players.len(), "engine initialized");
        if self.mode == Mode::Server {
            let data = serde_json::to_value(self.initialization_data()?)?;
            let notice = Notice::new(self.source(), NoticeType::INIT, data);
            self.enqueue_notice(Recipients::All, notice);
        }
        Ok(())
    }

    fn init_pass<F>(&mut self, slot: usize, data: Option<&Value>, during: &str, f: F) -> EngineResult<()>
    where
        F: FnOnce(&mut dyn Plugin, &mut Session<'_>, Option<&Value>) -> anyhow::Result<()>,
    {
        let name = self.registry.name_of(slot).to_string();
        let mut plugin = self.registry.take(slot)?;
        let result = f(&mut *plugin, &mut Session::new(self), data.filter(|v| !v.is_null()));
        self.registry.put_back(slot, plugin);
        result.map_err(|e| EngineError::from_plugin(&name, during, e))
    }

    pub fn initialization_data(&self) -> EngineResult<InitData> {
        let mut plugin_init = Vec::with_capacity(self.registry.len());
        for slot in 0..self.registry.len() {
            plugin_init.push(self.registry.get(slot)?.initialization_data());
        }
        Ok(InitData {
            players: self.players.clone(),
            attrs: self.attrs.clone(),
            plugin_init,
        })
    }

    pub fn snapshot(&self, viewer: Viewer) -> EngineResult<Snapshot> {
        let mut plugin_state = Vec::with_capacity(self.registry.len());
        for slot in 0..self.registry.len() {
            let name = self.registry.name_of(slot);
            let state = self
                .registry
                .get(slot)?
                .get_state(viewer)
                .map_err(|e| EngineError::from_plugin(name, "get_state", e))?;
            plugin_state.push(PluginState {
                name: name.to_string(),
                compat: self.registry.compat_of(slot),
                state,
            });
        }
        Ok(Snapshot {
            players: self.players.clone(),
            undoable: self.journal.undoable(),
            attrs: self.attrs.clone(),
            plugin_state,
        })
    }

    /// Replaces session and plugin state. The layout is validated before
    /// anything is touched; missing trailing plugin entries are skipped.
    pub fn apply_snapshot(&mut self, snapshot: Snapshot) -> EngineResult<()> {
        if snapshot.plugin_state.len() > self.registry.len() {
            return Err(EngineError::Configuration(format!(
                "snapshot has {} plugin entries, engine has {} plugins",
                snapshot.plugin_state.len(),
                self.registry.len()
            )));
        }
        for (slot, entry) in snapshot.plugin_state.iter().enumerate() {
            let name = self.registry.name_of(slot);
            let compat = self.registry.compat_of(slot);
            if entry.name != name || entry.compat != compat {
                return Err(EngineError::Configuration(format!(
                    "snapshot slot {slot} holds {} v{}, engine has {name} v{compat}",
                    entry.name, entry.compat
                )));
            }
        }

        self.players = snapshot.players;
        self.attrs = snapshot.attrs;
        self.journal.set_undoable(snapshot.undoable);
        for (slot, entry) in snapshot.plugin_state.into_iter().enumerate() {
            self.registry
                .get_mut(slot)?
                .set_state(entry.state)
                .map_err(|e| EngineError::from_plugin(&entry.name, "set_state", e))?;
        }
        Ok(())
    }
}
