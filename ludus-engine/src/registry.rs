//! Plugin registry: slots, method table, action table and listeners.

use crate::action::{Handlers, Phase};
use crate::error::{EngineError, EngineResult};
use crate::listener::ListenerFn;
use crate::plugin::Plugin;
use ludus_types::NoticeType;
use std::any::TypeId;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::info;

/// Method names served by the engine itself.
pub const RESERVED_METHODS: &[&str] = &[
    "call",
    "schedule",
    "notify",
    "observe",
    "unobserve",
    "dispatch",
    "process_queue",
    "run",
    "shutdown",
    "commit",
    "get_state",
    "set_state",
    "initialize",
    "initialization_data",
    "register_plugin",
    "invoke",
    "replay",
    "resync",
];

struct Slot {
    name: String,
    compat: u32,
    type_id: TypeId,
    /// Empty while one of the plugin's handlers is running.
    plugin: Option<Box<dyn Plugin>>,
}

/// One plugin's handlers for an action, tagged with its slot.
#[derive(Clone)]
pub(crate) struct Contribution {
    pub slot: usize,
    pub handlers: Arc<Handlers>,
}

#[derive(Clone)]
pub(crate) struct Listener {
    pub slot: usize,
    pub kind: Option<NoticeType>,
    pub handler: Arc<ListenerFn>,
}

/// Ordered plugin list plus the tables derived from it.
#[derive(Default)]
pub struct PluginRegistry {
    slots: Vec<Slot>,
    /// Full method name to (slot, unprefixed name).
    methods: BTreeMap<String, (usize, String)>,
    actions: BTreeMap<String, Vec<Contribution>>,
    listeners: Vec<Listener>,
}

impl PluginRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `plugin` after validating it against what is already here.
    ///
    /// Nothing is modified when validation fails.
    pub(crate) fn register<P: Plugin>(&mut self, plugin: P, pinned: Option<u32>) -> EngineResult<()> {
        let name = plugin.name().to_string();
        let compat = plugin.compat();

        if compat == 0 {
            return Err(EngineError::Configuration(format!(
                "plugin '{name}' does not define a compat version"
            )));
        }
        if let Some(major) = pinned {
            if major != compat {
                return Err(EngineError::Configuration(format!(
                    "plugin '{name}' is version {compat}, configuration requires {major}"
                )));
            }
        }
        if self.contains(&name) {
            return Err(EngineError::Configuration(format!(
                "plugin '{name}' already registered"
            )));
        }
        for dep in plugin.depends() {
            if !self.contains(&dep) {
                return Err(EngineError::Configuration(format!(
                    "plugin '{name}' requires plugin '{dep}'"
                )));
            }
        }

        let prefix = plugin.method_prefix().to_string();
        let mut methods = Vec::new();
        for method in plugin.methods() {
            let full = format!("{prefix}{method}");
            if RESERVED_METHODS.contains(&full.as_str())
                || self.methods.contains_key(&full)
                || methods.iter().any(|(m, _)| *m == full)
            {
                return Err(EngineError::Configuration(format!(
                    "engine already has a method '{full}' (attempted override by '{name}')"
                )));
            }
            methods.push((full, method));
        }

        let table = plugin.actions().into_table().map_err(|(action, phase)| {
            EngineError::Configuration(format!(
                "plugin '{name}' declares {action}.{phase} more than once"
            ))
        })?;
        let listeners = plugin.listeners().into_entries();

        let slot = self.slots.len();
        let action_count = table.len();
        for (full, method) in methods {
            self.methods.insert(full, (slot, method));
        }
        for (action, handlers) in table {
            self.actions.entry(action).or_default().push(Contribution {
                slot,
                handlers: Arc::new(handlers),
            });
        }
        for (kind, handler) in listeners {
            self.listeners.push(Listener {
                slot,
                kind,
                handler: Arc::from(handler),
            });
        }
        self.slots.push(Slot {
            name: name.clone(),
            compat,
            type_id: TypeId::of::<P>(),
            plugin: Some(Box::new(plugin)),
        });

        info!(plugin = %name, compat, actions = action_count, "plugin registered");
        Ok(())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.slots.iter().any(|s| s.name == name)
    }

    /// Plugin names in registration order.
    pub fn names(&self) -> Vec<String> {
        self.slots.iter().map(|s| s.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Full method names on the engine surface.
    pub fn methods(&self) -> Vec<String> {
        self.methods.keys().cloned().collect()
    }

    /// Action names with at least one contributor.
    pub fn actions(&self) -> Vec<String> {
        self.actions.keys().cloned().collect()
    }

    /// Number of plugins contributing to `action`.
    pub fn contributors(&self, action: &str) -> usize {
        self.actions.get(action).map_or(0, Vec::len)
    }

    /// Whether any plugin handles `phase` of `action`.
    pub fn handles(&self, action: &str, phase: Phase) -> bool {
        self.actions.get(action).is_some_and(|list| {
            list.iter().any(|c| match phase {
                Phase::Check => c.handlers.check.is_some(),
                Phase::Init => c.handlers.init.is_some(),
                Phase::Notify => c.handlers.notify.is_some(),
                other => c.handlers.mutate.contains_key(&other),
            })
        })
    }

    pub(crate) fn plan(&self, action: &str) -> Option<Vec<Contribution>> {
        self.actions.get(action).filter(|l| !l.is_empty()).cloned()
    }

    pub(crate) fn method(&self, full: &str) -> Option<(usize, String)> {
        self.methods.get(full).cloned()
    }

    /// Listeners for `kind`: typed first, then wildcard.
    pub(crate) fn listeners_for(&self, kind: &NoticeType) -> Vec<Listener> {
        let typed = self.listeners.iter().filter(|l| l.kind.as_ref() == Some(kind));
        let wildcard = self.listeners.iter().filter(|l| l.kind.is_none());
        typed.chain(wildcard).cloned().collect()
    }

    pub(crate) fn name_of(&self, slot: usize) -> &str {
        self.slots.get(slot).map_or("?", |s| s.name.as_str())
    }

    pub(crate) fn compat_of(&self, slot: usize) -> u32 {
        self.slots.get(slot).map_or(0, |s| s.compat)
    }

    pub(crate) fn index_of<P: Plugin>(&self) -> EngineResult<usize> {
        let wanted = TypeId::of::<P>();
        self.slots
            .iter()
            .position(|s| s.type_id == wanted)
            .ok_or_else(|| EngineError::PluginNotFound(std::any::type_name::<P>().to_string()))
    }

    pub(crate) fn index_by_name(&self, name: &str) -> EngineResult<usize> {
        self.slots
            .iter()
            .position(|s| s.name == name)
            .ok_or_else(|| EngineError::PluginNotFound(name.to_string()))
    }

    pub(crate) fn get(&self, slot: usize) -> EngineResult<&dyn Plugin> {
        let s = self
            .slots
            .get(slot)
            .ok_or_else(|| EngineError::PluginNotFound(format!("#{slot}")))?;
        s.plugin
            .as_deref()
            .ok_or_else(|| EngineError::PluginBusy(s.name.clone()))
    }

    pub(crate) fn get_mut(&mut self, slot: usize) -> EngineResult<&mut dyn Plugin> {
        let s = self
            .slots
            .get_mut(slot)
            .ok_or_else(|| EngineError::PluginNotFound(format!("#{slot}")))?;
        match s.plugin.as_deref_mut() {
            Some(p) => Ok(p),
            None => Err(EngineError::PluginBusy(s.name.clone())),
        }
    }

    /// Takes a plugin out of its slot for the duration of a handler.
    pub(crate) fn take(&mut self, slot: usize) -> EngineResult<Box<dyn Plugin>> {
        let s = self
            .slots
            .get_mut(slot)
            .ok_or_else(|| EngineError::PluginNotFound(format!("#{slot}")))?;
        s.plugin
            .take()
            .ok_or_else(|| EngineError::PluginBusy(s.name.clone()))
    }

    pub(crate) fn put_back(&mut self, slot: usize, plugin: Box<dyn Plugin>) {
        if let Some(s) = self.slots.get_mut(slot) {
            s.plugin = Some(plugin);
        }
    }

    pub(crate) fn is_available(&self, slot: usize) -> bool {
        self.slots.get(slot).is_some_and(|s| s.plugin.is_some())
    }
}
