//! The plugin contract.

use crate::action::ActionSet;
use crate::listener::Listeners;
use crate::session::Session;
use ludus_types::{Args, NoticeType, Viewer};
use serde_json::Value;
use std::any::Any;

/// A named unit of behavior composed into an engine.
///
/// Plugins are registered once, in an order that fixes handler execution
/// order. Everything a plugin contributes (action handlers, engine methods,
/// notice listeners) is declared here and collected at registration.
pub trait Plugin: Any + Send + 'static {
    /// Unique name within an engine. Notices and snapshots refer to it.
    fn name(&self) -> &str;

    /// Compatibility major version. Zero means undefined and is rejected.
    fn compat(&self) -> u32;

    /// Plugins that must be registered before this one.
    fn depends(&self) -> Vec<String> {
        Vec::new()
    }

    /// Method names this plugin serves through [`Plugin::invoke`].
    fn methods(&self) -> Vec<String> {
        Vec::new()
    }

    /// Prefix prepended to every method name on the engine surface.
    fn method_prefix(&self) -> &str {
        ""
    }

    /// Serves a method declared in [`Plugin::methods`]. `method` is the
    /// unprefixed name.
    fn invoke(&mut self, _session: &mut Session<'_>, method: &str, _args: &Args) -> anyhow::Result<Value> {
        anyhow::bail!("method '{method}' not implemented")
    }

    /// Notice types this plugin emits, as `(IDENTIFIER, token)` pairs.
    /// They are registered under the plugin's name.
    fn notice_types(&self) -> Vec<(&'static str, NoticeType)> {
        Vec::new()
    }

    fn actions(&self) -> ActionSet<Self>
    where
        Self: Sized,
    {
        ActionSet::new()
    }

    fn listeners(&self) -> Listeners<Self>
    where
        Self: Sized,
    {
        Listeners::new()
    }

    /// First initialization pass, in registration order.
    fn initialize_early(&mut self, _session: &mut Session<'_>, _data: Option<&Value>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Main initialization pass, in registration order.
    fn initialize(&mut self, _session: &mut Session<'_>, _data: Option<&Value>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Last initialization pass, in reverse registration order.
    fn initialize_late(&mut self, _session: &mut Session<'_>, _data: Option<&Value>) -> anyhow::Result<()> {
        Ok(())
    }

    /// Data every replica needs to reproduce this plugin's startup state.
    fn initialization_data(&self) -> Value {
        Value::Null
    }

    /// State visible to `viewer`.
    fn get_state(&self, _viewer: Viewer) -> anyhow::Result<Value> {
        Ok(Value::Null)
    }

    fn set_state(&mut self, _state: Value) -> anyhow::Result<()> {
        Ok(())
    }
}
