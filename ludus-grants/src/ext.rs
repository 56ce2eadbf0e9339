//! Typed grant operations on [`Engine`] and [`Session`].

use crate::grant::{Call, Expiry, Grant};
use crate::manager::GrantManager;
use ludus_engine::{Engine, EngineResult, Session};
use ludus_filter::Filter;
use ludus_types::{Args, PlayerId};

/// Grant operations on an engine with a registered [`GrantManager`].
pub trait EngineGrants {
    fn grant(&self, players: &[PlayerId], grants: Vec<Grant>) -> EngineResult<()>;

    fn trigger(&self, player: PlayerId, grant_id: &str, args: Args) -> EngineResult<bool>;

    fn trigger_call(&self, player: PlayerId, call: Call) -> EngineResult<bool>;

    fn expire(&self, filters: Vec<Expiry>) -> EngineResult<()>;

    fn find_grant(&self, player: PlayerId, grant_id: &str) -> EngineResult<Option<Grant>>;

    fn list_grants(&self, player: PlayerId, filter: &Filter) -> EngineResult<Vec<Grant>>;
}

impl EngineGrants for Engine {
    fn grant(&self, players: &[PlayerId], grants: Vec<Grant>) -> EngineResult<()> {
        self.with_plugin::<GrantManager, _, _>(|m, s| {
            m.grant(s, players, grants);
            Ok(())
        })
    }

    fn trigger(&self, player: PlayerId, grant_id: &str, args: Args) -> EngineResult<bool> {
        self.with_plugin::<GrantManager, _, _>(|m, s| Ok(m.trigger(s, player, grant_id, args)?))
    }

    fn trigger_call(&self, player: PlayerId, call: Call) -> EngineResult<bool> {
        self.with_plugin::<GrantManager, _, _>(|m, s| Ok(m.trigger_call(s, player, call)?))
    }

    fn expire(&self, filters: Vec<Expiry>) -> EngineResult<()> {
        self.with_plugin::<GrantManager, _, _>(|m, s| {
            m.expire(s, filters);
            Ok(())
        })
    }

    fn find_grant(&self, player: PlayerId, grant_id: &str) -> EngineResult<Option<Grant>> {
        self.read_plugin::<GrantManager, _, _>(|m| m.find_grant(player, grant_id).cloned())
    }

    fn list_grants(&self, player: PlayerId, filter: &Filter) -> EngineResult<Vec<Grant>> {
        self.read_plugin::<GrantManager, _, _>(|m| m.list_grants(player, filter).into_iter().cloned().collect())
    }
}

/// Grant operations from inside another plugin's handler.
pub trait SessionGrants {
    fn grant(&mut self, players: &[PlayerId], grants: Vec<Grant>) -> EngineResult<()>;

    fn trigger(&mut self, player: PlayerId, grant_id: &str, args: Args) -> EngineResult<bool>;

    fn expire(&mut self, filters: Vec<Expiry>) -> EngineResult<()>;

    fn list_grants(&self, player: PlayerId, filter: &Filter) -> EngineResult<Vec<Grant>>;
}

impl SessionGrants for Session<'_> {
    fn grant(&mut self, players: &[PlayerId], grants: Vec<Grant>) -> EngineResult<()> {
        self.with_plugin::<GrantManager, _, _>(|m, s| {
            m.grant(s, players, grants);
            Ok(())
        })
    }

    fn trigger(&mut self, player: PlayerId, grant_id: &str, args: Args) -> EngineResult<bool> {
        self.with_plugin::<GrantManager, _, _>(|m, s| Ok(m.trigger(s, player, grant_id, args)?))
    }

    fn expire(&mut self, filters: Vec<Expiry>) -> EngineResult<()> {
        self.with_plugin::<GrantManager, _, _>(|m, s| {
            m.expire(s, filters);
            Ok(())
        })
    }

    fn list_grants(&self, player: PlayerId, filter: &Filter) -> EngineResult<Vec<Grant>> {
        let manager = self.plugin::<GrantManager>()?;
        Ok(manager.list_grants(player, filter).into_iter().cloned().collect())
    }
}
