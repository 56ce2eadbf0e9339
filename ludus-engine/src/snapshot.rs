//! Full-state snapshots and initialization payloads.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One plugin's entry in a [`Snapshot`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginState {
    pub name: String,
    pub compat: u32,
    #[serde(default)]
    pub state: Value,
}

/// Engine state as seen by one viewer.
///
/// `plugin_state` is in registration order; restoring requires the same
/// plugin layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    #[serde(default)]
    pub players: Vec<String>,
    #[serde(default)]
    pub undoable: usize,
    #[serde(default)]
    pub attrs: Map<String, Value>,
    #[serde(default)]
    pub plugin_state: Vec<PluginState>,
}

/// Startup data shared by the server and every replica.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InitData {
    #[serde(default)]
    pub players: Vec<String>,
    #[serde(default)]
    pub attrs: Map<String, Value>,
    /// Per-plugin initialization data, in registration order.
    #[serde(default)]
    pub plugin_init: Vec<Value>,
}
