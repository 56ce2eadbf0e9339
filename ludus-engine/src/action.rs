//! Declarative action handlers.
//!
//! A plugin describes its contribution to each named action with an
//! [`ActionSet`] built at registration time:
//!
//! ```ignore
//! ActionSet::new()
//!     .check("place", |board: &Board, _view, args| board.is_free(args))
//!     .action("place", |board, session, _stash, args| board.place(session, args))
//! ```
//!
//! Handlers are erased to operate on `dyn Plugin` so the registry can keep
//! one table for every plugin type.

use crate::plugin::Plugin;
use crate::session::{Session, View};
use ludus_types::{Args, PlayerId, Stash};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

/// One step of an action's lifecycle, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Check,
    Init,
    Before,
    Action,
    After,
    Notify,
    Keep,
    Error,
}

impl Phase {
    /// The phases allowed to mutate session state, in order.
    pub const MUTATING: [Phase; 3] = [Phase::Before, Phase::Action, Phase::After];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Check => "check",
            Self::Init => "init",
            Self::Before => "before",
            Self::Action => "action",
            Self::After => "after",
            Self::Notify => "notify",
            Self::Keep => "keep",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether a notify handler lets the notice through to one player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disclosure {
    Deliver,
    Suppress,
}

pub(crate) type CheckFn = dyn Fn(&dyn Plugin, &View<'_>, &Args) -> bool + Send + Sync;
pub(crate) type InitFn =
    dyn Fn(&dyn Plugin, &View<'_>, &mut Stash, &Args) -> anyhow::Result<()> + Send + Sync;
pub(crate) type MutateFn =
    dyn Fn(&mut dyn Plugin, &mut Session<'_>, &Stash, &Args) -> anyhow::Result<()> + Send + Sync;
pub(crate) type NotifyFn = dyn Fn(&dyn Plugin, &View<'_>, &Stash, PlayerId, &mut Args) -> anyhow::Result<Disclosure>
    + Send
    + Sync;

/// One plugin's handlers for one action.
#[derive(Default)]
pub(crate) struct Handlers {
    pub check: Option<Box<CheckFn>>,
    pub init: Option<Box<InitFn>>,
    /// Before, action, after, keep and error.
    pub mutate: BTreeMap<Phase, Box<MutateFn>>,
    pub notify: Option<Box<NotifyFn>>,
}

impl Handlers {
    fn has(&self, phase: Phase) -> bool {
        match phase {
            Phase::Check => self.check.is_some(),
            Phase::Init => self.init.is_some(),
            Phase::Notify => self.notify.is_some(),
            other => self.mutate.contains_key(&other),
        }
    }
}

pub(crate) fn downcast_ref<P: Plugin>(plugin: &dyn Plugin) -> Option<&P> {
    let any: &dyn Any = plugin;
    any.downcast_ref::<P>()
}

pub(crate) fn downcast_mut<P: Plugin>(plugin: &mut dyn Plugin) -> Option<&mut P> {
    let any: &mut dyn Any = plugin;
    any.downcast_mut::<P>()
}

fn type_mismatch<P>() -> anyhow::Error {
    anyhow::anyhow!("handler bound to {}", std::any::type_name::<P>())
}

/// Builder for a plugin's action handlers.
///
/// Declaring the same (action, phase) twice makes registration fail.
pub struct ActionSet<P> {
    table: BTreeMap<String, Handlers>,
    duplicate: Option<(String, Phase)>,
    _plugin: PhantomData<fn(P)>,
}

impl<P: Plugin> Default for ActionSet<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Plugin> ActionSet<P> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            table: BTreeMap::new(),
            duplicate: None,
            _plugin: PhantomData,
        }
    }

    fn install(mut self, action: &str, phase: Phase, put: impl FnOnce(&mut Handlers)) -> Self {
        let handlers = self.table.entry(action.to_string()).or_default();
        if handlers.has(phase) {
            self.duplicate.get_or_insert((action.to_string(), phase));
        } else {
            put(handlers);
        }
        self
    }

    /// Read-only gate. Returning false rejects the call.
    #[must_use]
    pub fn check<F>(self, action: &str, f: F) -> Self
    where
        F: Fn(&P, &View<'_>, &Args) -> bool + Send + Sync + 'static,
    {
        let erased: Box<CheckFn> = Box::new(move |plugin: &dyn Plugin, view: &View<'_>, args: &Args| {
            downcast_ref::<P>(plugin).is_some_and(|p| f(p, view, args))
        });
        self.install(action, Phase::Check, |h| h.check = Some(erased))
    }

    /// Read-only preparation. Values written to the stash are journaled, so
    /// randomness belongs here.
    #[must_use]
    pub fn init<F>(self, action: &str, f: F) -> Self
    where
        F: Fn(&P, &View<'_>, &mut Stash, &Args) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let erased: Box<InitFn> = Box::new(
            move |plugin: &dyn Plugin, view: &View<'_>, stash: &mut Stash, args: &Args| match downcast_ref::<P>(plugin) {
                Some(p) => f(p, view, stash, args),
                None => Err(type_mismatch::<P>()),
            },
        );
        self.install(action, Phase::Init, |h| h.init = Some(erased))
    }

    fn mutating<F>(self, action: &str, phase: Phase, f: F) -> Self
    where
        F: Fn(&mut P, &mut Session<'_>, &Stash, &Args) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let erased: Box<MutateFn> = Box::new(
            move |plugin: &mut dyn Plugin, session: &mut Session<'_>, stash: &Stash, args: &Args| {
                match downcast_mut::<P>(plugin) {
                    Some(p) => f(p, session, stash, args),
                    None => Err(type_mismatch::<P>()),
                }
            },
        );
        self.install(action, phase, |h| {
            h.mutate.insert(phase, erased);
        })
    }

    #[must_use]
    pub fn before<F>(self, action: &str, f: F) -> Self
    where
        F: Fn(&mut P, &mut Session<'_>, &Stash, &Args) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.mutating(action, Phase::Before, f)
    }

    #[must_use]
    pub fn action<F>(self, action: &str, f: F) -> Self
    where
        F: Fn(&mut P, &mut Session<'_>, &Stash, &Args) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.mutating(action, Phase::Action, f)
    }

    #[must_use]
    pub fn after<F>(self, action: &str, f: F) -> Self
    where
        F: Fn(&mut P, &mut Session<'_>, &Stash, &Args) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.mutating(action, Phase::After, f)
    }

    /// Runs once every mutating phase succeeded. Faults are only logged.
    #[must_use]
    pub fn keep<F>(self, action: &str, f: F) -> Self
    where
        F: Fn(&mut P, &mut Session<'_>, &Stash, &Args) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.mutating(action, Phase::Keep, f)
    }

    /// Runs when init or a mutating phase faulted. Faults are only logged.
    #[must_use]
    pub fn error<F>(self, action: &str, f: F) -> Self
    where
        F: Fn(&mut P, &mut Session<'_>, &Stash, &Args) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.mutating(action, Phase::Error, f)
    }

    /// Per-player censoring or augmentation of the CALL notice payload.
    #[must_use]
    pub fn notify<F>(self, action: &str, f: F) -> Self
    where
        F: Fn(&P, &View<'_>, &Stash, PlayerId, &mut Args) -> anyhow::Result<Disclosure>
            + Send
            + Sync
            + 'static,
    {
        let erased: Box<NotifyFn> = Box::new(
            move |plugin: &dyn Plugin, view: &View<'_>, stash: &Stash, player: PlayerId, payload: &mut Args| {
                match downcast_ref::<P>(plugin) {
                    Some(p) => f(p, view, stash, player, payload),
                    None => Err(type_mismatch::<P>()),
                }
            },
        );
        self.install(action, Phase::Notify, |h| h.notify = Some(erased))
    }

    /// Action names this set contributes to.
    pub fn actions(&self) -> impl Iterator<Item = &str> {
        self.table.keys().map(String::as_str)
    }

    pub(crate) fn into_table(self) -> Result<BTreeMap<String, Handlers>, (String, Phase)> {
        match self.duplicate {
            Some(dup) => Err(dup),
            None => Ok(self.table),
        }
    }
}
