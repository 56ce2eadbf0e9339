//! Notice listeners: how replicas apply notices addressed to a plugin.

use crate::action::downcast_mut;
use crate::plugin::Plugin;
use crate::session::Session;
use ludus_types::{Notice, NoticeType, PlayerId};
use std::marker::PhantomData;

pub(crate) type ListenerFn =
    dyn Fn(&mut dyn Plugin, &mut Session<'_>, u64, PlayerId, &Notice) -> anyhow::Result<()> + Send + Sync;

/// Builder for a plugin's notice listeners.
///
/// Listeners run when the engine dispatches a notice: typed listeners for
/// the notice's type first, then wildcard listeners, each group in
/// registration order.
pub struct Listeners<P> {
    entries: Vec<(Option<NoticeType>, Box<ListenerFn>)>,
    _plugin: PhantomData<fn(P)>,
}

impl<P: Plugin> Default for Listeners<P> {
    fn default() -> Self {
        Self::new()
    }
}

impl<P: Plugin> Listeners<P> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
            _plugin: PhantomData,
        }
    }

    fn push<F>(mut self, kind: Option<NoticeType>, f: F) -> Self
    where
        F: Fn(&mut P, &mut Session<'_>, u64, PlayerId, &Notice) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        let erased: Box<ListenerFn> = Box::new(
            move |plugin: &mut dyn Plugin, session: &mut Session<'_>, seq: u64, player: PlayerId, notice: &Notice| {
                match downcast_mut::<P>(plugin) {
                    Some(p) => f(p, session, seq, player, notice),
                    None => Err(anyhow::anyhow!(
                        "listener bound to {}",
                        std::any::type_name::<P>()
                    )),
                }
            },
        );
        self.entries.push((kind, erased));
        self
    }

    /// Listens for one notice type.
    #[must_use]
    pub fn on<F>(self, kind: NoticeType, f: F) -> Self
    where
        F: Fn(&mut P, &mut Session<'_>, u64, PlayerId, &Notice) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.push(Some(kind), f)
    }

    /// Listens for every notice.
    #[must_use]
    pub fn on_any<F>(self, f: F) -> Self
    where
        F: Fn(&mut P, &mut Session<'_>, u64, PlayerId, &Notice) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.push(None, f)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub(crate) fn into_entries(self) -> Vec<(Option<NoticeType>, Box<ListenerFn>)> {
        self.entries
    }
}
